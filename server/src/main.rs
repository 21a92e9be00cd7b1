//! Entry point for the felt server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use felt_server::cli::ServerCli;
use felt_server::config::Config;
use felt_server::manager::GameManager;
use felt_server::monitor::{
    ConsoleMonitor, DotsMonitor, HistoryMonitor, MonitorSet, TracingMonitor,
};
use felt_server::server::{run_server, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ServerCli::parse();

    // Config problems are startup failures; nothing gets bound first.
    let cfg = Config::load_or_create(&cli.config)
        .with_context(|| format!("loading config '{}'", cli.config.display()))?;

    init_tracing(&cfg);

    let mut monitors = MonitorSet::new();
    monitors.attach(Arc::new(TracingMonitor));
    if cli.pretty {
        monitors.attach(Arc::new(ConsoleMonitor::new()));
    }
    if cli.dots {
        monitors.attach(Arc::new(DotsMonitor::new()));
    }
    if let Some(path) = &cli.history {
        let history = HistoryMonitor::open(path)
            .with_context(|| format!("opening hand history '{}'", path.display()))?;
        monitors.attach(Arc::new(history));
    }

    let master_seed = cli.seed.unwrap_or_else(rand::random);
    tracing::info!(master_seed, "seeding game instances");
    let manager = GameManager::new(master_seed, monitors, None, cfg.server.auth_fail_open);

    for table in &cfg.tables {
        if !table.auto_start {
            tracing::info!(table = %table.name, "table defined but not auto-started");
            continue;
        }
        manager
            .create_game(&table.name, table.game_config())
            .with_context(|| format!("creating game '{}'", table.name))?;
    }

    let port = cli.port.unwrap_or(cfg.server.port);
    let addr: SocketAddr = format!("{}:{}", cfg.server.address, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.server.address, port))?;

    run_server(addr, AppState { manager }).await
}

fn init_tracing(cfg: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cfg.server.log_level.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    if let Some(path) = &cfg.server.log_file {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.with_writer(Arc::new(file)).with_ansi(false).init();
                return;
            }
            Err(e) => {
                eprintln!("could not open log file '{}': {}", path.display(), e);
            }
        }
    }
    builder.init();
}
