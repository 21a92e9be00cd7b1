//! Server configuration persisted as TOML.
//!
//! A `[server]` block plus zero or more `[[table]]` blocks, each of which
//! becomes a game instance at startup. Invalid configuration is rejected
//! before the server binds anything.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("server port must be 1..=65535")]
    InvalidPort,
    #[error("table '{0}': blinds must satisfy bb > sb > 0")]
    InvalidBlinds(String),
    #[error("table '{0}': max_players must be 2..=10")]
    InvalidMaxPlayers(String),
    #[error("table '{0}': min_players must be 2..=max_players")]
    InvalidMinPlayers(String),
    #[error("table '{0}': buy_in_min must be below buy_in_max")]
    InvalidBuyIns(String),
    #[error("table '{0}': timeout_seconds must be 10..=300")]
    InvalidTimeout(String),
    #[error("duplicate table name '{0}'")]
    DuplicateTable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default, rename = "table")]
    pub tables: Vec<TableConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// When the auth validator is unavailable: `true` lets the session in
    /// with a log line, `false` closes it.
    #[serde(default)]
    pub auth_fail_open: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: default_address(),
            port: default_port(),
            log_level: default_log_level(),
            log_file: None,
            auth_fail_open: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    pub small_blind: u32,
    pub big_blind: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_chips: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_in_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_in_max: Option<u32>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_min_players")]
    pub min_players: usize,
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
    /// Stop the game after this many hands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hands: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_address() -> String {
    "127.0.0.1".to_owned()
}
fn default_port() -> u16 {
    4000
}
fn default_log_level() -> String {
    "info".to_owned()
}
fn default_max_players() -> usize {
    6
}
fn default_min_players() -> usize {
    2
}
fn default_timeout_seconds() -> u64 {
    60
}
fn default_auto_start() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            tables: vec![TableConfig {
                name: "main".to_owned(),
                max_players: default_max_players(),
                small_blind: 5,
                big_blind: 10,
                start_chips: None,
                buy_in_min: None,
                buy_in_max: None,
                timeout_seconds: default_timeout_seconds(),
                min_players: default_min_players(),
                auto_start: default_auto_start(),
                hands: None,
                seed: None,
            }],
        }
    }
}

impl TableConfig {
    pub fn buy_in_min(&self) -> u32 {
        self.buy_in_min.unwrap_or(50 * self.big_blind)
    }

    pub fn buy_in_max(&self) -> u32 {
        self.buy_in_max.unwrap_or(500 * self.big_blind)
    }

    pub fn start_chips(&self) -> u32 {
        self.start_chips.unwrap_or(100 * self.big_blind)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.small_blind == 0 || self.big_blind <= self.small_blind {
            return Err(ConfigError::InvalidBlinds(self.name.clone()));
        }
        if !(2..=10).contains(&self.max_players) {
            return Err(ConfigError::InvalidMaxPlayers(self.name.clone()));
        }
        if self.min_players < 2 || self.min_players > self.max_players {
            return Err(ConfigError::InvalidMinPlayers(self.name.clone()));
        }
        if self.buy_in_min() >= self.buy_in_max() {
            return Err(ConfigError::InvalidBuyIns(self.name.clone()));
        }
        if !(10..=300).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.name.clone()));
        }
        Ok(())
    }

    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            small_blind: self.small_blind,
            big_blind: self.big_blind,
            start_chips: self.start_chips(),
            timeout: Duration::from_secs(self.timeout_seconds),
            min_players: self.min_players,
            max_players: self.max_players,
            seed: self.seed,
            hand_limit: self.hands,
        }
    }
}

/// Per-game-instance parameters; what a pool and its runners work from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub small_blind: u32,
    pub big_blind: u32,
    pub start_chips: u32,
    /// Decision deadline per action request.
    pub timeout: Duration,
    pub min_players: usize,
    pub max_players: usize,
    pub seed: Option<u64>,
    pub hand_limit: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            small_blind: 5,
            big_blind: 10,
            start_chips: 1000,
            timeout: Duration::from_secs(30),
            min_players: 2,
            max_players: 6,
            seed: None,
            hand_limit: None,
        }
    }
}

impl GameConfig {
    /// The per-hand buy-in each seated bot must cover.
    pub fn buy_in(&self) -> u32 {
        self.start_chips
    }
}

impl Config {
    /// Load configuration from `path`, creating the file with defaults when
    /// missing. Validation runs on every load.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let cfg = if path.exists() {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config file '{}'", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("parsing TOML config '{}'", path.display()))?
        } else {
            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("creating config directory '{}'", parent.display())
                    })?;
                }
            }
            let cfg = Config::default();
            let text = toml::to_string_pretty(&cfg)
                .with_context(|| "serializing default config to TOML")?;
            fs::write(path, text)
                .with_context(|| format!("writing default config to '{}'", path.display()))?;
            cfg
        };
        cfg.validate()
            .with_context(|| format!("validating config '{}'", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        let mut names = std::collections::HashSet::new();
        for table in &self.tables {
            if !names.insert(table.name.as_str()) {
                return Err(ConfigError::DuplicateTable(table.name.clone()));
            }
            table.validate()?;
        }
        Ok(())
    }
}
