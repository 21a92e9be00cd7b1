//! `felt-bot`: a reference client speaking the felt wire protocol.
//!
//! Plays hands with one of the built-in strategies, or queries the admin
//! surface. Useful for filling tables during development and as a living
//! example of the protocol from the client side.

mod args;
mod client;

use anyhow::Result;
use clap::Parser;

use args::{BotCli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = BotCli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Command::Play(args) => client::play(args).await,
        Command::Stats(args) => client::stats(args).await,
        Command::History(args) => client::history(&args),
    }
}
