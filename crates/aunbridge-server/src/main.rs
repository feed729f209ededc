//! AUN bridge server binary
//!
//! Bridges a local Econet bus, reached through a link-layer daemon, to AUN
//! hosts and to other bridges over encrypted trunks.
//!
//! SIGHUP reloads the configuration file. SIGINT and SIGTERM stop the bridge
//! after the transaction in progress finishes.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    process::ExitCode,
};

use aunbridge_app::Bridge;
use aunbridge_server::{ServerError, SystemEnv, TokioTransport, UdpLink, config};
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// AUN bridge server
#[derive(Parser, Debug)]
#[command(name = "aunbridge-server")]
#[command(about = "Econet to AUN bridge with encrypted trunks", long_about = None)]
struct Args {
    /// Configuration file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Local address for the link daemon socket
    #[arg(long, default_value = "127.0.0.1:32000")]
    link_bind: SocketAddr,

    /// Address of the link-layer daemon
    #[arg(long, default_value = "127.0.0.1:32001")]
    link_daemon: SocketAddr,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "bridge failed");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let config = config::load(&args.config)?;

    let (link, reader) = UdpLink::bind(args.link_bind, args.link_daemon).await.map_err(ServerError::Link)?;
    let mut bridge = Bridge::new(SystemEnv, TokioTransport, link);
    let reader = tokio::spawn(reader.run(bridge.link_events()));

    bridge.start(&config).await?;
    info!(config = %args.config.display(), daemon = %args.link_daemon, "bridge server running");

    let mut hangup = signal(SignalKind::hangup()).map_err(ServerError::Signal)?;
    let mut terminate = signal(SignalKind::terminate()).map_err(ServerError::Signal)?;

    loop {
        tokio::select! {
            _ = hangup.recv() => reload(&mut bridge, &args.config).await,
            _ = terminate.recv() => {
                info!("SIGTERM received, stopping");
                break;
            },
            result = tokio::signal::ctrl_c() => {
                result.map_err(ServerError::Signal)?;
                info!("interrupt received, stopping");
                break;
            },
        }
    }

    if bridge.is_running() {
        bridge.stop().await?;
    }
    reader.abort();
    Ok(())
}

/// Reload the configuration file and rebuild the bridge from it.
///
/// A file that fails to load leaves the running bridge untouched.
async fn reload(bridge: &mut Bridge<SystemEnv, TokioTransport, UdpLink>, path: &Path) {
    info!(path = %path.display(), "SIGHUP received, reloading configuration");
    let config = match config::load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "configuration not reloaded");
            return;
        },
    };
    if let Err(e) = bridge.reconfigure(&config).await {
        error!(error = %e, "reconfiguration failed");
    }
}
