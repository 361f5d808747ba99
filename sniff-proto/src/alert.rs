/// Plaintext TLS alert record sent to clients we refuse.
///
/// Wire layout:
///   ContentType(1) = 0x15 | Version(2) = 03 01 | Length(2) = 2 | Level(1) | Description(1)
///
/// No record protection is applied; the client has not negotiated any keys.

pub const CONTENT_TYPE_ALERT: u8 = 0x15;
pub const ALERT_VERSION: [u8; 2] = [0x03, 0x01];
pub const ALERT_RECORD_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

/// Subset of RFC 8446 §6 alert descriptions this front end can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertDescription {
    CloseNotify = 0,
    HandshakeFailure = 40,
    UnrecognizedName = 112,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    /// The alert sent to every client that is not handed off: fatal
    /// handshake_failure (description 40 decimal, not 0x40).
    pub const REJECT: Alert = Alert {
        level: AlertLevel::Fatal,
        description: AlertDescription::HandshakeFailure,
    };

    pub fn encode(&self) -> [u8; ALERT_RECORD_LEN] {
        [
            CONTENT_TYPE_ALERT,
            ALERT_VERSION[0],
            ALERT_VERSION[1],
            0x00,
            0x02,
            self.level as u8,
            self.description as u8,
        ]
    }
}

impl Default for Alert {
    fn default() -> Self {
        Self::REJECT
    }
}
