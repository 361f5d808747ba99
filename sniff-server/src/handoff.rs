/// Hand-off seam: what happens once a greeting has been parsed.
use sniff_proto::config::Backends;
use std::net::SocketAddr;

/// A successfully parsed greeting, as seen by the routing layer.
#[derive(Debug, Clone, Copy)]
pub struct SessionEvent<'a> {
    pub peer: SocketAddr,
    pub hostname: Option<&'a str>,
    pub version: u16,
}

/// Routing decision for a parsed greeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// The connection leaves this front end without an alert.
    Route,
    /// Answer with a fatal alert and close.
    Reject,
}

pub trait HandoffHandler: Send + Sync {
    fn on_greeting(&self, event: &SessionEvent<'_>, backends: &Backends) -> Handoff;
}

/// Reports every host name and rejects the connection.
#[derive(Debug, Default)]
pub struct LogHandler;

impl HandoffHandler for LogHandler {
    fn on_greeting(&self, event: &SessionEvent<'_>, _backends: &Backends) -> Handoff {
        tracing::info!(
            peer = %event.peer,
            hostname = event.hostname.unwrap_or("-"),
            version = event.version,
            "got hostname"
        );
        Handoff::Reject
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_handler_rejects() {
        let event = SessionEvent {
            peer: "192.0.2.7:50000".parse().unwrap(),
            hostname: Some("example.com"),
            version: 0x0303,
        };
        assert_eq!(
            LogHandler.on_greeting(&event, &Backends::default()),
            Handoff::Reject
        );
    }
}
