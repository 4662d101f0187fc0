//! gwatch-server: gadget session server.
//!
//! Launches diagnostic gadget sessions against cluster workloads and relays
//! their live output to WebSocket viewers over a bounded, lossy stream.

mod api;
mod config;
mod relay;
mod session;
mod transport;

use clap::Parser;
use config::ServerConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::AppState;
use crate::relay::ViewerRegistry;
use crate::session::{SessionRegistry, SessionService, SyntheticRunner};

/// gwatch-server — gadget session server
#[derive(Parser, Debug)]
#[command(name = "gwatch-server", version, about = "Gadget session server")]
struct Cli {
    /// Listen port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file path
    #[arg(long, default_value = "~/.gwatch/config.toml")]
    config: String,

    /// Maximum concurrent sessions
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    use tracing_subscriber::EnvFilter;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting gwatch-server"
    );

    let config_path = PathBuf::from(&cli.config);
    let config = match ServerConfig::load(Some(&config_path), cli.port, cli.max_sessions) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let registry = SessionRegistry::new(config.max_sessions);
    let service = Arc::new(SessionService::new(registry, SyntheticRunner::new()));
    let viewers = Arc::new(ViewerRegistry::new());
    let app = api::router(AppState { service, viewers });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %addr, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(addr = %addr, max_sessions = config.max_sessions, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        std::process::exit(1);
    }

    info!("gwatch-server stopped");
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
