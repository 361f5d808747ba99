use thiserror::Error;

/// Why a greeting was rejected.
///
/// Every variant leads to the same outcome on the wire (a fatal alert, then
/// close). The distinction is only for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("greeting too short: {0} bytes")]
    TooShort(usize),

    #[error("not a TLS handshake record")]
    BadMagic,

    #[error("handshake type {0:#04x} is not ClientHello")]
    NotClientHello(u8),

    #[error("record length {declared} does not match {actual} bytes received")]
    RecordLength { declared: usize, actual: usize },

    #[error("handshake length {declared} does not match record body of {actual} bytes")]
    HandshakeLength { declared: usize, actual: usize },

    #[error("field needs {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("extensions block of {declared} bytes exceeds {remaining} remaining")]
    ExtensionsOverrun { declared: usize, remaining: usize },

    #[error("extensions block of {declared} bytes leaves {remaining} bytes unparsed")]
    TrailingBytes { declared: usize, remaining: usize },

    #[error("extension {ext_type:#06x} declares {declared} bytes, {remaining} remaining")]
    ExtensionOverrun {
        ext_type: u16,
        declared: usize,
        remaining: usize,
    },

    #[error("server_name extension too short: {0} bytes")]
    SniTooShort(usize),

    #[error("server_name lengths disagree (extension {ext_len}, list {list_len}, host {host_len})")]
    SniMismatch {
        ext_len: usize,
        list_len: usize,
        host_len: usize,
    },

    #[error("server_name entry type {0} is not host_name")]
    SniNameType(u8),

    #[error("server_name host is empty or not valid UTF-8")]
    InvalidHostname,

    #[error("more than one server_name extension")]
    DuplicateSni,
}

impl ParseError {
    /// True when the bytes looked like a TLS ClientHello but were malformed,
    /// false when they were not TLS at all.
    pub fn is_tls(&self) -> bool {
        !matches!(
            self,
            ParseError::TooShort(_) | ParseError::BadMagic | ParseError::NotClientHello(_)
        )
    }
}
