//! Command line interface for the server binary.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "felt-server", about = "Multi-tenant hold'em server for bots")]
pub struct ServerCli {
    /// Path to the TOML configuration; created with defaults when missing.
    #[arg(long, default_value = "felt.toml")]
    pub config: PathBuf,

    /// Override the configured listen port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Master seed for game instance RNGs; random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Attach the colored console monitor in addition to structured logs.
    #[arg(long)]
    pub pretty: bool,

    /// Attach the one-dot-per-hand progress monitor.
    #[arg(long)]
    pub dots: bool,

    /// Append JSONL hand histories to this file.
    #[arg(long)]
    pub history: Option<PathBuf>,
}
