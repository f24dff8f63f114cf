//! peerlinkd entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, warn};
use tracing_subscriber::EnvFilter;

use peerlink_server::{
    DEFAULT_PORT, RendezvousServer, ServerConfig, ServerResult, SignalHandler, port_in_range,
};

/// peerlinkd - rendezvous server for peerlink chat clients
#[derive(Debug, Parser)]
#[command(name = "peerlinkd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on (must be between 1025 and 65534)
    #[arg(long)]
    port: u16,

    /// Enable debug output
    #[arg(long, short = 'v')]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let port = if port_in_range(cli.port) {
        cli.port
    } else {
        warn!(
            requested = cli.port,
            fallback = DEFAULT_PORT,
            "port out of range, using default"
        );
        DEFAULT_PORT
    };

    let signals = SignalHandler::new();
    signals.spawn_listener();

    let server = RendezvousServer::bind(ServerConfig::new(port)).await?;
    server.run_until_shutdown(signals.shutdown()).await
}
