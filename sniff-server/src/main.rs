mod handoff;
mod listener;
mod session;
#[cfg(test)]
mod test_support;

use clap::Parser;
use handoff::LogHandler;
use session::SessionContext;
use sniff_proto::config::load_config;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sniff-server", about = "SNI sniffer — reads the TLS ClientHello and routes by host name")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "/etc/sniff/config.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load config
    let mut config = load_config(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Setup logging
    let log_level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    tracing::info!("SNI sniffer starting");
    if config.backends.is_empty() {
        tracing::warn!("No backends configured");
    }

    let ctx = Arc::new(SessionContext::new(
        config.backends,
        Arc::new(LogHandler),
        &config.limits,
    ));
    let listeners = listener::start_listen(
        &config.server,
        ctx,
        config.limits.max_connections as usize,
    )?;
    for addr in listeners.local_addrs() {
        tracing::info!("Listening on {}", addr);
    }

    tokio::select! {
        _ = listeners.serve() => {}
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("SNI sniffer stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to setup SIGTERM handler");

    tokio::select! {
        _ = ctrl_c => {},
        _ = sigterm.recv() => {},
    }
}
