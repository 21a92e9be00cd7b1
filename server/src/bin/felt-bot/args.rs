use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "felt-bot", about = "Reference bot client for the felt server")]
pub struct BotCli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect and play hands until the game completes.
    Play(PlayArgs),
    /// Print server statistics from the HTTP surface.
    Stats(StatsArgs),
    /// Summarize a JSONL hand-history file.
    History(HistoryArgs),
}

#[derive(Debug, Args)]
pub struct PlayArgs {
    /// WebSocket endpoint of the server.
    #[arg(long, default_value = "ws://127.0.0.1:4000/ws")]
    pub url: String,

    /// Display name; also determines the bot id.
    #[arg(long, default_value = "felt-bot")]
    pub name: String,

    /// Game to join; the server default when omitted.
    #[arg(long)]
    pub game: Option<String>,

    /// Strategy: calling-station | pressure.
    #[arg(long, default_value = "calling-station")]
    pub strategy: String,

    /// Seed for seeded strategies.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Auth token presented in the handshake.
    #[arg(long)]
    pub token: Option<String>,

    /// Stop after this many completed hands (play forever when omitted).
    #[arg(long)]
    pub hands: Option<u64>,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// HTTP base URL of the server.
    #[arg(long, default_value = "http://127.0.0.1:4000")]
    pub url: String,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Path to the JSONL file written by the server's `--history` flag.
    #[arg(long)]
    pub input: std::path::PathBuf,
}
