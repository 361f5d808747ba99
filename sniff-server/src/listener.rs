/// Connection acceptor: bind every local address, accept connections, and run
/// one session per connection.
use crate::session::{drive, Outcome, Session, SessionContext};
use sniff_proto::config::ListenConfig;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Duration;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ListenError {
    #[error("no addresses to listen on")]
    NoAddresses,

    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Local addresses for `config`: the explicit list, or the wildcard address
/// of both families.
pub fn listen_addrs(config: &ListenConfig) -> Vec<SocketAddr> {
    if config.listen.is_empty() {
        vec![
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, config.port)),
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port)),
        ]
    } else {
        config
            .listen
            .iter()
            .map(|ip| SocketAddr::new(*ip, config.port))
            .collect()
    }
}

/// Create a non-blocking, close-on-exec listening socket on `addr`.
///
/// IPv6 sockets are v6-only so the IPv4 wildcard can be bound alongside.
pub fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_cloexec(true)?;
    // SO_REUSEADDR so rapid restarts don't fail with "address already in use"
    socket.set_reuse_address(true)?;
    if addr.is_ipv6() {
        socket.set_only_v6(true)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(libc::SOMAXCONN)?;
    TcpListener::from_std(socket.into())
}

/// Bound listeners sharing one session context and connection limit.
pub struct Listeners {
    listeners: Vec<TcpListener>,
    ctx: Arc<SessionContext>,
    limiter: Arc<Semaphore>,
}

/// Bind every address for `config`. Any failure aborts startup.
pub fn start_listen(
    config: &ListenConfig,
    ctx: Arc<SessionContext>,
    max_connections: usize,
) -> Result<Listeners, ListenError> {
    let addrs = listen_addrs(config);
    if addrs.is_empty() {
        return Err(ListenError::NoAddresses);
    }

    let mut listeners = Vec::with_capacity(addrs.len());
    for addr in addrs {
        let listener = bind(addr).map_err(|source| ListenError::Bind { addr, source })?;
        listeners.push(listener);
    }

    Ok(Listeners {
        listeners,
        ctx,
        limiter: Arc::new(Semaphore::new(max_connections)),
    })
}

impl Listeners {
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners
            .iter()
            .filter_map(|l| l.local_addr().ok())
            .collect()
    }

    /// Accept connections on every listener until the future is dropped.
    pub async fn serve(self) {
        let mut loops = JoinSet::new();
        for listener in self.listeners {
            loops.spawn(accept_loop(listener, self.ctx.clone(), self.limiter.clone()));
        }
        while let Some(res) = loops.join_next().await {
            if let Err(e) = res {
                tracing::error!("Accept loop failed: {}", e);
            }
        }
    }
}

/// How long to stop accepting after `e`. Per-connection errors retry at
/// once; persistent ones (EMFILE, ENFILE, ENOBUFS) pause the accept loop.
fn accept_backoff(e: &io::Error) -> Option<Duration> {
    match e.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

async fn accept_loop(listener: TcpListener, ctx: Arc<SessionContext>, limiter: Arc<Semaphore>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("accept failed: {}", e);
                if let Some(pause) = accept_backoff(&e) {
                    tokio::time::sleep(pause).await;
                }
                continue;
            }
        };

        let permit = match limiter.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!("Connection limit reached, rejecting {}", peer);
                continue;
            }
        };

        tracing::debug!(peer = %peer, "accepted");
        let session = Session::new(stream, peer, ctx.clone());

        tokio::spawn(async move {
            let _permit = permit;
            match drive(session).await {
                Outcome::Closed => tracing::debug!(peer = %peer, "session closed"),
                // Moving bytes to the backend happens outside this front end;
                // the routed stream is released here.
                Outcome::Routed { hostname, .. } => {
                    tracing::debug!(peer = %peer, hostname = hostname.as_deref().unwrap_or("-"), "session handed off")
                }
            }
        });
    }
}
