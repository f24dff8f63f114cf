//! Command-line interface definition.

use clap::Parser;

/// peerlink - rendezvous chat client
#[derive(Debug, Parser)]
#[command(name = "peerlink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client identifier announced to the server
    #[arg(long)]
    pub id: String,

    /// Port to listen on for incoming peer connections
    /// (must be between 1025 and 65534)
    #[arg(long)]
    pub port: u16,

    /// Rendezvous server address, e.g. 127.0.0.1:8080
    #[arg(long, env = "PEERLINK_SERVER")]
    pub server: String,

    /// Connection timeout in seconds
    #[arg(long, default_value = "5")]
    pub timeout: u64,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,
}
