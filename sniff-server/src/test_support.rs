/// Helpers shared by the session and listener tests.
use crate::handoff::{Handoff, HandoffHandler, SessionEvent};
use sniff_proto::config::Backends;
use std::net::SocketAddr;
use std::sync::Mutex;

/// Build a ClientHello record carrying `host` as SNI. When `total` is
/// non-zero a padding extension stretches the record to exactly that size.
pub fn client_hello(host: &str, total: usize) -> Vec<u8> {
    let host = host.as_bytes();
    let mut exts = Vec::new();
    exts.extend_from_slice(&[0x00, 0x00]);
    exts.extend_from_slice(&((host.len() + 5) as u16).to_be_bytes());
    exts.extend_from_slice(&((host.len() + 3) as u16).to_be_bytes());
    exts.push(0x00);
    exts.extend_from_slice(&(host.len() as u16).to_be_bytes());
    exts.extend_from_slice(host);

    // version(2) random(32) sid(1) suites(2+2) compression(1) ext len(2)
    let fixed = 5 + 4 + 2 + 32 + 1 + 4 + 1 + 2;
    if total > 0 {
        let pad = total - fixed - exts.len() - 4;
        exts.extend_from_slice(&[0x00, 0x15]);
        exts.extend_from_slice(&(pad as u16).to_be_bytes());
        exts.resize(exts.len() + pad, 0);
    }

    let mut body = vec![0x03, 0x03];
    body.extend_from_slice(&[0x42; 32]);
    body.push(0);
    body.extend_from_slice(&[0x00, 0x02, 0x13, 0x01]);
    body.push(0);
    body.extend_from_slice(&(exts.len() as u16).to_be_bytes());
    body.extend_from_slice(&exts);

    let mut record = vec![0x16, 0x03, 0x01];
    record.extend_from_slice(&((body.len() + 4) as u16).to_be_bytes());
    record.push(0x01);
    record.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    record.extend_from_slice(&body);
    record
}

/// Handler that remembers every greeting and answers with a fixed decision.
pub struct Recorder {
    decision: Handoff,
    seen: Mutex<Vec<(SocketAddr, Option<String>)>>,
}

impl Recorder {
    pub fn new(decision: Handoff) -> Self {
        Self {
            decision,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<(SocketAddr, Option<String>)> {
        self.seen.lock().unwrap().clone()
    }
}

impl HandoffHandler for Recorder {
    fn on_greeting(&self, event: &SessionEvent<'_>, _backends: &Backends) -> Handoff {
        self.seen
            .lock()
            .unwrap()
            .push((event.peer, event.hostname.map(str::to_owned)));
        self.decision
    }
}

#[test]
fn test_client_hello_size() {
    let hello = client_hello("example.com", 300);
    assert_eq!(hello.len(), 300);
    let parsed = sniff_proto::parse_client_hello(&hello).unwrap();
    assert_eq!(parsed.hostname.as_deref(), Some("example.com"));
}
