//! Per-game matchmaking and pacing.
//!
//! One control task per pool: it wakes on a ticker or on registry changes,
//! seats eligible bots into hands, rotates the button, honours the hand
//! limit and applies hand outcomes to bankrolls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;

use felt_shared::ServerMsg;

use crate::bot::Bot;
use crate::config::GameConfig;
use crate::monitor::HandMonitor;
use crate::runner::{HandOutcome, HandRunner};

const SCHEDULER_TICK: Duration = Duration::from_millis(200);

struct PoolInner {
    /// Insertion-ordered so stats and logs stay readable.
    bots: Vec<Arc<Bot>>,
    button: usize,
    first_hand_played: bool,
    completed: bool,
    completed_reason: Option<String>,
    waiting_logged: bool,
}

/// Matchmaker for one game instance.
pub struct BotPool {
    pub game_id: String,
    pub cfg: GameConfig,
    inner: Mutex<PoolInner>,
    /// Pool RNG: seating shuffles, hand seeds and generated bot ids all go
    /// through this lock, which is what makes a pool seed reproducible.
    rng: Mutex<StdRng>,
    hands_started: AtomicU64,
    hands_completed: AtomicU64,
    wake: Notify,
    done_tx: watch::Sender<bool>,
    monitor: Arc<dyn HandMonitor>,
}

/// Snapshot served by the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub game_id: String,
    pub hands_started: u64,
    pub hands_completed: u64,
    pub completed: bool,
    pub hand_limit: Option<u64>,
    pub bots: Vec<BotStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotStats {
    pub id: String,
    pub name: String,
    pub bankroll: u32,
    pub in_hand: bool,
    pub sitting_out: bool,
    pub hands_played: u64,
    pub hands_won: u64,
    pub timeouts: u32,
    pub invalid_actions: u32,
}

impl BotPool {
    pub fn new(
        game_id: impl Into<String>,
        cfg: GameConfig,
        seed: u64,
        monitor: Arc<dyn HandMonitor>,
    ) -> Arc<Self> {
        let (done_tx, _) = watch::channel(false);
        Arc::new(BotPool {
            game_id: game_id.into(),
            cfg,
            inner: Mutex::new(PoolInner {
                bots: Vec::new(),
                button: 0,
                first_hand_played: false,
                completed: false,
                completed_reason: None,
                waiting_logged: false,
            }),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            hands_started: AtomicU64::new(0),
            hands_completed: AtomicU64::new(0),
            wake: Notify::new(),
            done_tx,
            monitor,
        })
    }

    /// Add a session to the pool. Fails once the game has completed.
    pub fn register(&self, bot: Arc<Bot>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.completed {
            let _ = bot.try_send(self.completed_msg(&inner));
            bail!("game '{}' already completed", self.game_id);
        }
        if inner.bots.iter().any(|b| b.id == bot.id) {
            bail!("bot id '{}' already registered in '{}'", bot.id, self.game_id);
        }
        tracing::info!(game = %self.game_id, bot = %bot.id, name = %bot.name, "bot registered");
        inner.bots.push(bot);
        drop(inner);
        self.wake.notify_one();
        Ok(())
    }

    /// Drop a session from the registry; its in-flight hand (if any) folds
    /// it out via the bot's done signal.
    pub fn unregister(&self, bot_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(pos) = inner.bots.iter().position(|b| b.id == bot_id) {
            let bot = inner.bots.remove(pos);
            tracing::info!(game = %self.game_id, bot = %bot.id, "bot unregistered");
        }
        drop(inner);
        self.wake.notify_one();
    }

    pub fn bot(&self, bot_id: &str) -> Option<Arc<Bot>> {
        let inner = self.inner.lock().unwrap();
        inner.bots.iter().find(|b| b.id == bot_id).cloned()
    }

    pub fn bot_count(&self) -> usize {
        self.inner.lock().unwrap().bots.len()
    }

    pub fn hands_completed(&self) -> u64 {
        self.hands_completed.load(Ordering::SeqCst)
    }

    pub fn is_completed(&self) -> bool {
        self.inner.lock().unwrap().completed
    }

    /// Resolves when the pool stops scheduling (hand limit or deletion).
    pub fn done(&self) -> watch::Receiver<bool> {
        self.done_tx.subscribe()
    }

    /// Run a closure under the pool RNG lock. Deterministic consumers (id
    /// generation, seat shuffles, hand seeds) must all come through here.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap();
        f(&mut rng)
    }

    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock().unwrap();
        PoolStats {
            game_id: self.game_id.clone(),
            hands_started: self.hands_started.load(Ordering::SeqCst),
            hands_completed: self.hands_completed(),
            completed: inner.completed,
            hand_limit: self.cfg.hand_limit,
            bots: inner
                .bots
                .iter()
                .map(|b| BotStats {
                    id: b.id.clone(),
                    name: b.name.clone(),
                    bankroll: b.bankroll(),
                    in_hand: b.in_hand(),
                    sitting_out: b.sitting_out(),
                    hands_played: b.hands_played(),
                    hands_won: b.hands_won(),
                    timeouts: b.timeouts(),
                    invalid_actions: b.invalid_actions(),
                })
                .collect(),
        }
    }

    /// The control loop. Exits when the game completes or the server shuts
    /// down; only a shutdown closes the connected sessions.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        self.monitor.on_game_start(&self.game_id, self.cfg.hand_limit);
        let mut ticker = tokio::time::interval(SCHEDULER_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut done = self.done();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.wake.notified() => {}
                _ = shutdown.wait_for(|stop| *stop) => break,
                _ = done.wait_for(|d| *d) => break,
            }

            if self.is_completed() {
                break;
            }
            if let Some(limit) = self.cfg.hand_limit {
                if self.hands_completed() >= limit {
                    self.finish("hand_limit_reached");
                    break;
                }
            }

            if let Some((seated, button, seed, hand_no)) = self.try_seat_hand() {
                let runner = HandRunner::new(
                    self.game_id.clone(),
                    self.cfg.clone(),
                    seated.clone(),
                    Arc::clone(&self.monitor),
                    shutdown.clone(),
                );
                let pool = Arc::clone(&self);
                tokio::spawn(async move {
                    match runner.run(hand_no, button, seed).await {
                        Ok(outcome) => pool.finish_hand(&seated, outcome),
                        Err(e) => {
                            tracing::error!(game = %pool.game_id, error = %e, "hand failed");
                            for bot in &seated {
                                bot.set_in_hand(false);
                            }
                            pool.wake.notify_one();
                        }
                    }
                });
            }
        }

        if *shutdown.borrow() {
            self.close_all();
        }
    }

    /// Seat the next hand if enough bots are eligible. Seating order is a
    /// pool-RNG shuffle, so joining first buys no positional edge.
    fn try_seat_hand(&self) -> Option<(Vec<Arc<Bot>>, usize, u64, u64)> {
        if let Some(limit) = self.cfg.hand_limit {
            if self.hands_started.load(Ordering::SeqCst) >= limit {
                return None;
            }
        }

        let mut inner = self.inner.lock().unwrap();
        let mut seated: Vec<Arc<Bot>> = inner
            .bots
            .iter()
            .filter(|b| b.eligible(self.cfg.buy_in()))
            .cloned()
            .collect();
        if seated.len() < self.cfg.min_players {
            if !inner.waiting_logged {
                tracing::info!(
                    game = %self.game_id,
                    eligible = seated.len(),
                    needed = self.cfg.min_players,
                    "waiting for players"
                );
                inner.waiting_logged = true;
            }
            return None;
        }
        inner.waiting_logged = false;

        let seed = {
            let mut rng = self.rng.lock().unwrap();
            seated.shuffle(&mut *rng);
            rng.random()
        };
        seated.truncate(self.cfg.max_players);
        for bot in &seated {
            bot.set_in_hand(true);
        }

        // First hand: the shuffle itself picked who holds the button.
        // Afterwards it advances one seat per hand.
        let button = if inner.first_hand_played {
            inner.button = (inner.button + 1) % seated.len();
            inner.button
        } else {
            inner.first_hand_played = true;
            inner.button = 0;
            0
        };
        let hand_no = self.hands_started.fetch_add(1, Ordering::SeqCst) + 1;
        Some((seated, button, seed, hand_no))
    }

    /// Bank the outcome: apply net deltas (clamped at zero), free the
    /// seats, count the hand and tell the monitors.
    fn finish_hand(&self, seated: &[Arc<Bot>], outcome: HandOutcome) {
        for seat in &outcome.seats {
            if let Some(bot) = seated.iter().find(|b| b.id == seat.bot_id) {
                let bankroll = bot.apply_delta(seat.delta);
                tracing::debug!(
                    game = %self.game_id,
                    bot = %bot.id,
                    delta = seat.delta,
                    bankroll,
                    "bankroll updated"
                );
            }
        }
        for bot in seated {
            bot.set_in_hand(false);
        }
        self.hands_completed.fetch_add(1, Ordering::SeqCst);
        self.monitor.on_hand_complete(&outcome);
        self.wake.notify_one();
    }

    /// Terminal state: tell every bot, tell the monitors, stop scheduling.
    fn finish(&self, reason: &str) {
        let hands = self.hands_completed();
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.completed {
                return;
            }
            inner.completed = true;
            inner.completed_reason = Some(reason.to_owned());
            let msg = self.completed_msg(&inner);
            for bot in &inner.bots {
                if let Err(e) = bot.try_send(msg.clone()) {
                    tracing::debug!(bot = %bot.id, error = %e, "game_completed dropped");
                }
            }
        }
        self.monitor.on_game_complete(&self.game_id, hands, reason);
        let _ = self.done_tx.send(true);
        tracing::info!(game = %self.game_id, hands, reason = %reason, "game completed");
    }

    fn completed_msg(&self, inner: &PoolInner) -> ServerMsg {
        ServerMsg::GameCompleted {
            reason: inner
                .completed_reason
                .clone()
                .unwrap_or_else(|| "hand_limit_reached".to_owned()),
            hand_limit: self.cfg.hand_limit,
            hands_completed: self.hands_completed(),
        }
    }

    /// Stop scheduling and close every session. Used on deletion and
    /// server shutdown.
    pub fn stop(&self, reason: &str) {
        self.finish(reason);
        self.close_all();
    }

    fn close_all(&self) {
        let inner = self.inner.lock().unwrap();
        for bot in &inner.bots {
            bot.close();
        }
    }
}
