//! Command-line arguments

use clap::Parser;

/// Static module server that answers script requests with modulepreload hints
#[derive(Debug, Parser)]
#[command(name = "modpreload", version, about)]
pub struct Cli {
    /// Configuration file path, without extension
    #[arg(short, long, default_value = "config", env = "MODPRELOAD_CONFIG")]
    pub config: String,

    /// Address to bind (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Static root directory, relative to the working directory (overrides static_files.root)
    #[arg(short, long)]
    pub root: Option<String>,
}
