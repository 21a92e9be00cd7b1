//! One connected client session. The transport pumps live in
//! `server::ws`; everything here is transport-agnostic so tests can drive a
//! bot through plain channels.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};

use felt_shared::{BotRole, PokerAction, ServerMsg};

/// Outbound queue depth per session.
pub const SEND_QUEUE_CAPACITY: usize = 256;
/// How long a blocking send may wait on a saturated queue.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("session closed")]
    Closed,
    #[error("send timed out")]
    Timeout,
    #[error("send queue full")]
    QueueFull,
}

/// A decoded `action` frame on its way from the reader to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionFrame {
    pub action: PokerAction,
    pub amount: u32,
}

#[derive(Debug)]
struct BotFlags {
    closed: bool,
    in_hand: bool,
    sitting_out: bool,
    bankroll: u32,
}

/// Session state for one bot.
#[derive(Debug)]
pub struct Bot {
    pub id: String,
    pub name: String,
    pub game: String,
    pub role: BotRole,
    pub owner_id: Option<String>,
    pub auth_bot_id: Option<String>,
    outbound: mpsc::Sender<ServerMsg>,
    /// Runner-installed, capacity-1. At most one exists per bot at any time;
    /// the reader drops action frames when none is installed.
    mailbox: Mutex<Option<mpsc::Sender<ActionFrame>>>,
    flags: Mutex<BotFlags>,
    done_tx: watch::Sender<bool>,
    timeouts: AtomicU32,
    invalid_actions: AtomicU32,
    dropped_frames: AtomicU64,
    hands_played: AtomicU64,
    hands_won: AtomicU64,
}

impl Bot {
    /// Create a session. The returned receiver feeds the writer pump (or a
    /// test harness).
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        game: impl Into<String>,
        role: BotRole,
        bankroll: u32,
    ) -> (std::sync::Arc<Bot>, mpsc::Receiver<ServerMsg>) {
        Self::with_identity(id, name, game, role, bankroll, None, None)
    }

    /// As [`Bot::new`], carrying identity fields from the auth validator.
    pub fn with_identity(
        id: impl Into<String>,
        name: impl Into<String>,
        game: impl Into<String>,
        role: BotRole,
        bankroll: u32,
        owner_id: Option<String>,
        auth_bot_id: Option<String>,
    ) -> (std::sync::Arc<Bot>, mpsc::Receiver<ServerMsg>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_CAPACITY);
        let (done_tx, _) = watch::channel(false);
        let bot = Bot {
            id: id.into(),
            name: name.into(),
            game: game.into(),
            role,
            owner_id,
            auth_bot_id,
            outbound: tx,
            mailbox: Mutex::new(None),
            flags: Mutex::new(BotFlags {
                closed: false,
                in_hand: false,
                sitting_out: false,
                bankroll,
            }),
            done_tx,
            timeouts: AtomicU32::new(0),
            invalid_actions: AtomicU32::new(0),
            dropped_frames: AtomicU64::new(0),
            hands_played: AtomicU64::new(0),
            hands_won: AtomicU64::new(0),
        };
        (std::sync::Arc::new(bot), rx)
    }

    /// Targeted delivery: waits up to [`SEND_TIMEOUT`] on a full queue.
    pub async fn send(&self, msg: ServerMsg) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        self.outbound
            .send_timeout(msg, SEND_TIMEOUT)
            .await
            .map_err(|e| match e {
                mpsc::error::SendTimeoutError::Timeout(_) => SendError::Timeout,
                mpsc::error::SendTimeoutError::Closed(_) => SendError::Closed,
            })
    }

    /// Broadcast delivery: never waits. A saturated queue drops the frame
    /// and counts it; the bot catches up on the next frame that fits.
    pub fn try_send(&self, msg: ServerMsg) -> Result<(), SendError> {
        self.outbound.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                SendError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Install a fresh capacity-1 mailbox for the next action reply,
    /// replacing any stale one.
    pub fn install_mailbox(&self) -> mpsc::Receiver<ActionFrame> {
        let (tx, rx) = mpsc::channel(1);
        *self.mailbox.lock().unwrap() = Some(tx);
        rx
    }

    pub fn clear_mailbox(&self) {
        *self.mailbox.lock().unwrap() = None;
    }

    #[cfg(test)]
    pub(crate) fn has_mailbox(&self) -> bool {
        self.mailbox.lock().unwrap().is_some()
    }

    /// Reader-side: hand an `action` frame to the waiting runner. Frames
    /// with no listener (or a listener that already got its one reply) are
    /// dropped.
    pub fn forward_action(&self, frame: ActionFrame) -> bool {
        let guard = self.mailbox.lock().unwrap();
        match guard.as_ref() {
            Some(tx) => tx.try_send(frame).is_ok(),
            None => false,
        }
    }

    /// Idempotent close: fires the done signal exactly once.
    pub fn close(&self) {
        let mut flags = self.flags.lock().unwrap();
        if !flags.closed {
            flags.closed = true;
            let _ = self.done_tx.send(true);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.flags.lock().unwrap().closed
    }

    /// A receiver that resolves when the session closes.
    pub fn done(&self) -> watch::Receiver<bool> {
        self.done_tx.subscribe()
    }

    pub fn bankroll(&self) -> u32 {
        self.flags.lock().unwrap().bankroll
    }

    /// Apply a hand's net result, clamping at zero.
    pub fn apply_delta(&self, delta: i64) -> u32 {
        self.hands_played.fetch_add(1, Ordering::Relaxed);
        if delta > 0 {
            self.hands_won.fetch_add(1, Ordering::Relaxed);
        }
        let mut flags = self.flags.lock().unwrap();
        let next = flags.bankroll as i64 + delta;
        flags.bankroll = next.max(0) as u32;
        flags.bankroll
    }

    pub fn hands_played(&self) -> u64 {
        self.hands_played.load(Ordering::Relaxed)
    }

    pub fn hands_won(&self) -> u64 {
        self.hands_won.load(Ordering::Relaxed)
    }

    pub fn in_hand(&self) -> bool {
        self.flags.lock().unwrap().in_hand
    }

    pub fn set_in_hand(&self, value: bool) {
        self.flags.lock().unwrap().in_hand = value;
    }

    pub fn sitting_out(&self) -> bool {
        self.flags.lock().unwrap().sitting_out
    }

    pub fn set_sitting_out(&self, value: bool) {
        self.flags.lock().unwrap().sitting_out = value;
    }

    /// Ready to be seated into a hand.
    pub fn eligible(&self, buy_in: u32) -> bool {
        let flags = self.flags.lock().unwrap();
        !flags.closed && !flags.in_hand && !flags.sitting_out && flags.bankroll >= buy_in
    }

    pub fn note_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeouts(&self) -> u32 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn note_invalid_action(&self) {
        self.invalid_actions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invalid_actions(&self) -> u32 {
        self.invalid_actions.load(Ordering::Relaxed)
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

/// Deterministic bot id: FNV-32a over the display name, eight hex chars.
pub fn bot_id_from_name(name: &str) -> String {
    let mut hash = 0x811c_9dc5u32;
    for byte in name.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    format!("{:08x}", hash)
}
