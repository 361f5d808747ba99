/// Per-connection state machine: read the greeting, parse it, then either hand
/// the connection off or answer with a fatal alert and close.
///
/// ```text
/// Init --readable--> (parse) --Route--> Terminated (handed off)
///                           \--Reject / error--> Alert --writable--> AlertSent --writable--> Terminated
/// any state --I/O error / peer close / timeout--> Terminated
/// ```
///
/// Callbacks never block: reads and writes are `try_*` calls, and the driver
/// only awaits the single readiness the session currently asks for.
use crate::handoff::{Handoff, HandoffHandler, SessionEvent};
use sniff_proto::alert::{Alert, ALERT_RECORD_LEN};
use sniff_proto::config::{Backends, LimitsConfig};
use sniff_proto::greeting::parse_client_hello;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::{Duration, Instant};

// ── Shared context ───────────────────────────────────────────────────

/// Read-only state shared by every session of a listener.
pub struct SessionContext {
    pub backends: Backends,
    pub handler: Arc<dyn HandoffHandler>,
    pub read_buffer: usize,
    pub greeting_timeout: Option<Duration>,
}

impl SessionContext {
    pub fn new(backends: Backends, handler: Arc<dyn HandoffHandler>, limits: &LimitsConfig) -> Self {
        let greeting_timeout = match limits.greeting_timeout_sec {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            backends,
            handler,
            read_buffer: limits.read_buffer,
            greeting_timeout,
        }
    }
}

// ── Non-blocking I/O ─────────────────────────────────────────────────

/// Non-blocking socket operations a session needs. Both return
/// `ErrorKind::WouldBlock` when the socket is not ready.
pub trait SessionIo {
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize>;
    fn try_write(&self, buf: &[u8]) -> io::Result<usize>;
}

impl SessionIo for TcpStream {
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::try_read(self, buf)
    }

    fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        TcpStream::try_write(self, buf)
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    Alert,
    AlertSent,
    Terminated,
}

/// Readiness a session is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Read,
    Write,
}

/// How a session ended.
#[derive(Debug)]
pub enum Outcome<S> {
    Closed,
    Routed { stream: S, hostname: Option<String> },
}

pub struct Session<S: SessionIo> {
    stream: Option<S>,
    peer: SocketAddr,
    state: State,
    hostname: Option<String>,
    handed_off: bool,
    alert: [u8; ALERT_RECORD_LEN],
    written: usize,
    ctx: Arc<SessionContext>,
}

impl<S: SessionIo> Session<S> {
    pub fn new(stream: S, peer: SocketAddr, ctx: Arc<SessionContext>) -> Self {
        Self {
            stream: Some(stream),
            peer,
            state: State::Init,
            hostname: None,
            handed_off: false,
            alert: Alert::REJECT.encode(),
            written: 0,
            ctx,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn stream(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    /// The one readiness registration the session currently needs.
    pub fn interest(&self) -> Option<Interest> {
        match self.state {
            State::Init => Some(Interest::Read),
            State::Alert | State::AlertSent => Some(Interest::Write),
            State::Terminated => None,
        }
    }

    fn transition(&mut self, to: State) {
        tracing::trace!(peer = %self.peer, from = ?self.state, to = ?to, "session transition");
        self.state = to;
    }

    pub fn on_readable(&mut self) {
        if self.state != State::Init {
            return;
        }

        let mut buf = vec![0u8; self.ctx.read_buffer];
        let res = match self.stream.as_ref() {
            Some(stream) => stream.try_read(&mut buf),
            None => return,
        };

        match res {
            Ok(0) => {
                tracing::debug!(peer = %self.peer, "peer closed before greeting");
                self.terminate();
            }
            Ok(n) => self.on_greeting(&buf[..n]),
            Err(e) if is_transient(&e) => {}
            Err(e) => {
                tracing::debug!(peer = %self.peer, "greeting read failed: {}", e);
                self.terminate();
            }
        }
    }

    /// One parse attempt per connection; whatever the outcome, the session
    /// leaves `Init`.
    fn on_greeting(&mut self, buf: &[u8]) {
        let hello = match parse_client_hello(buf) {
            Ok(hello) => hello,
            Err(e) => {
                tracing::debug!(peer = %self.peer, tls = e.is_tls(), "rejecting greeting: {}", e);
                self.transition(State::Alert);
                return;
            }
        };

        debug_assert!(self.hostname.is_none());
        self.hostname = hello.hostname;

        let decision = {
            let event = SessionEvent {
                peer: self.peer,
                hostname: self.hostname.as_deref(),
                version: hello.version,
            };
            self.ctx.handler.on_greeting(&event, &self.ctx.backends)
        };

        match decision {
            Handoff::Route => {
                self.handed_off = true;
                self.transition(State::Terminated);
            }
            Handoff::Reject => self.transition(State::Alert),
        }
    }

    pub fn on_writable(&mut self) {
        match self.state {
            State::Alert => self.write_alert(),
            State::AlertSent => {
                self.terminate();
            }
            State::Init | State::Terminated => {}
        }
    }

    fn write_alert(&mut self) {
        while self.written < self.alert.len() {
            let res = match self.stream.as_ref() {
                Some(stream) => stream.try_write(&self.alert[self.written..]),
                None => return,
            };

            match res {
                Ok(0) => {
                    tracing::debug!(peer = %self.peer, "alert write returned zero");
                    self.terminate();
                    return;
                }
                Ok(n) => self.written += n,
                Err(e) if is_transient(&e) => return,
                Err(e) => {
                    tracing::debug!(peer = %self.peer, "alert write failed: {}", e);
                    self.terminate();
                    return;
                }
            }
        }
        self.transition(State::AlertSent);
    }

    /// Close the connection and drop the host name. Returns false if the
    /// session had already terminated.
    pub fn terminate(&mut self) -> bool {
        if self.state == State::Terminated {
            return false;
        }
        self.stream = None;
        self.hostname = None;
        self.transition(State::Terminated);
        true
    }

    pub fn into_outcome(mut self) -> Outcome<S> {
        match self.stream.take() {
            Some(stream) if self.handed_off => Outcome::Routed {
                stream,
                hostname: self.hostname.take(),
            },
            _ => Outcome::Closed,
        }
    }
}

// ── Driver ───────────────────────────────────────────────────────────

enum Wake {
    Ready,
    TimedOut,
    Failed(io::Error),
}

async fn wait(stream: &TcpStream, interest: Interest, deadline: Option<Instant>) -> Wake {
    let res = match (interest, deadline) {
        (Interest::Read, Some(at)) => match tokio::time::timeout_at(at, stream.readable()).await {
            Ok(res) => res,
            Err(_) => return Wake::TimedOut,
        },
        (Interest::Read, None) => stream.readable().await,
        (Interest::Write, _) => stream.writable().await,
    };
    match res {
        Ok(()) => Wake::Ready,
        Err(e) => Wake::Failed(e),
    }
}

/// Run a session to completion on the current task.
pub async fn drive(mut session: Session<TcpStream>) -> Outcome<TcpStream> {
    let deadline = session.ctx.greeting_timeout.map(|d| Instant::now() + d);

    while let Some(interest) = session.interest() {
        let wake = match session.stream() {
            Some(stream) => wait(stream, interest, deadline).await,
            None => break,
        };

        match wake {
            Wake::Ready => match interest {
                Interest::Read => session.on_readable(),
                Interest::Write => session.on_writable(),
            },
            Wake::TimedOut => {
                tracing::debug!(peer = %session.peer(), "no greeting before timeout");
                session.terminate();
            }
            Wake::Failed(e) => {
                tracing::debug!(peer = %session.peer(), "readiness wait failed: {}", e);
                session.terminate();
            }
        }
    }

    session.into_outcome()
}
