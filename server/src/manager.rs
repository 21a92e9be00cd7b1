//! Registry of named game instances.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};
use tokio::sync::watch;

use crate::auth::AuthValidator;
use crate::config::GameConfig;
use crate::monitor::MonitorSet;
use crate::pool::{BotPool, PoolStats};

/// Game id used when a `connect` frame names none.
pub const DEFAULT_GAME_ID: &str = "main";

struct GameEntry {
    pool: Arc<BotPool>,
}

/// Owns every pool and the collaborators the dispatcher hands to sessions.
/// Created once at startup and passed around explicitly.
pub struct GameManager {
    games: RwLock<HashMap<String, GameEntry>>,
    master_seed: u64,
    instance_counter: AtomicU64,
    shutdown_tx: watch::Sender<bool>,
    monitors: MonitorSet,
    auth: Option<Arc<dyn AuthValidator>>,
    auth_fail_open: bool,
}

impl GameManager {
    pub fn new(
        master_seed: u64,
        monitors: MonitorSet,
        auth: Option<Arc<dyn AuthValidator>>,
        auth_fail_open: bool,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(GameManager {
            games: RwLock::new(HashMap::new()),
            master_seed,
            instance_counter: AtomicU64::new(0),
            shutdown_tx,
            monitors,
            auth,
            auth_fail_open,
        })
    }

    pub fn auth(&self) -> Option<Arc<dyn AuthValidator>> {
        self.auth.clone()
    }

    pub fn auth_fail_open(&self) -> bool {
        self.auth_fail_open
    }

    /// Create and start a game. Instance seeds derive from the master seed
    /// and an instance counter unless the config pins one, so a given
    /// master seed replays the same games.
    pub fn create_game(&self, id: &str, cfg: GameConfig) -> Result<Arc<BotPool>> {
        if id.is_empty() {
            bail!("game id must not be empty");
        }
        let mut games = self.games.write().unwrap();
        if games.contains_key(id) {
            bail!("game '{}' already exists", id);
        }
        let counter = self.instance_counter.fetch_add(1, Ordering::SeqCst);
        let seed = cfg.seed.unwrap_or_else(|| derive_seed(self.master_seed, counter));
        let monitor = Arc::new(self.monitors.clone());
        let pool = BotPool::new(id, cfg, seed, monitor);
        games.insert(id.to_owned(), GameEntry { pool: Arc::clone(&pool) });
        drop(games);

        tracing::info!(game = %id, seed, "game created");
        tokio::spawn(Arc::clone(&pool).run(self.shutdown_tx.subscribe()));
        Ok(pool)
    }

    /// Stop a game's pool, close its sessions and forget it.
    pub fn delete_game(&self, id: &str) -> Result<()> {
        let entry = self.games.write().unwrap().remove(id);
        match entry {
            Some(entry) => {
                entry.pool.stop("game_deleted");
                tracing::info!(game = %id, "game deleted");
                Ok(())
            }
            None => bail!("no such game '{}'", id),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<BotPool>> {
        self.games
            .read()
            .unwrap()
            .get(id)
            .map(|e| Arc::clone(&e.pool))
    }

    /// Route a new session to the requested game, or the default.
    pub fn route(&self, requested: Option<&str>) -> Option<Arc<BotPool>> {
        self.get(requested.unwrap_or(DEFAULT_GAME_ID))
    }

    pub fn game_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.games.read().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn stats(&self) -> Vec<PoolStats> {
        let games = self.games.read().unwrap();
        let mut stats: Vec<PoolStats> = games.values().map(|e| e.pool.stats()).collect();
        stats.sort_by(|a, b| a.game_id.cmp(&b.game_id));
        stats
    }

    /// Cancel everything: pools exit their loops and close their sessions.
    pub fn shutdown(&self) {
        tracing::info!("shutting down all games");
        let _ = self.shutdown_tx.send(true);
    }
}

/// SplitMix64 step; spreads `master + counter` into unrelated seeds.
fn derive_seed(master: u64, counter: u64) -> u64 {
    let mut z = master.wrapping_add(counter.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
