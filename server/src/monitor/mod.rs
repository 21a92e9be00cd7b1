//! Passive observers of hand and game lifecycle events.

mod dots;
mod history;
mod log;
mod pretty;

pub use dots::DotsMonitor;
pub use history::{read_history, ActionRecord, HandRecord, HistoryMonitor, HistorySummary};
pub use log::TracingMonitor;
pub use pretty::ConsoleMonitor;

use std::sync::Arc;

use felt_shared::{Card, HandPlayer, PokerAction, Street};

use crate::runner::HandOutcome;

/// Lifecycle callbacks. All methods default to no-ops so a monitor only
/// implements what it cares about; implementations must not block.
pub trait HandMonitor: Send + Sync {
    fn on_game_start(&self, _game: &str, _hand_limit: Option<u64>) {}
    fn on_hand_start(
        &self,
        _hand_id: &str,
        _players: &[HandPlayer],
        _button: usize,
        _small_blind: u32,
        _big_blind: u32,
    ) {
    }
    fn on_player_action(
        &self,
        _hand_id: &str,
        _seat: usize,
        _action: PokerAction,
        _amount: u32,
        _stack: u32,
    ) {
    }
    fn on_street_change(&self, _hand_id: &str, _street: Street, _cards: &[Card]) {}
    fn on_hand_complete(&self, _outcome: &HandOutcome) {}
    fn on_game_complete(&self, _game: &str, _hands: u64, _reason: &str) {}
}

/// Fans every event out to a list of monitors.
#[derive(Default, Clone)]
pub struct MonitorSet {
    monitors: Vec<Arc<dyn HandMonitor>>,
}

impl MonitorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, monitor: Arc<dyn HandMonitor>) {
        self.monitors.push(monitor);
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl HandMonitor for MonitorSet {
    fn on_game_start(&self, game: &str, hand_limit: Option<u64>) {
        for m in &self.monitors {
            m.on_game_start(game, hand_limit);
        }
    }

    fn on_hand_start(
        &self,
        hand_id: &str,
        players: &[HandPlayer],
        button: usize,
        small_blind: u32,
        big_blind: u32,
    ) {
        for m in &self.monitors {
            m.on_hand_start(hand_id, players, button, small_blind, big_blind);
        }
    }

    fn on_player_action(
        &self,
        hand_id: &str,
        seat: usize,
        action: PokerAction,
        amount: u32,
        stack: u32,
    ) {
        for m in &self.monitors {
            m.on_player_action(hand_id, seat, action, amount, stack);
        }
    }

    fn on_street_change(&self, hand_id: &str, street: Street, cards: &[Card]) {
        for m in &self.monitors {
            m.on_street_change(hand_id, street, cards);
        }
    }

    fn on_hand_complete(&self, outcome: &HandOutcome) {
        for m in &self.monitors {
            m.on_hand_complete(outcome);
        }
    }

    fn on_game_complete(&self, game: &str, hands: u64, reason: &str) {
        for m in &self.monitors {
            m.on_game_complete(game, hands, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        hands: AtomicUsize,
        actions: AtomicUsize,
    }

    impl HandMonitor for Counter {
        fn on_hand_start(&self, _: &str, _: &[HandPlayer], _: usize, _: u32, _: u32) {
            self.hands.fetch_add(1, Ordering::Relaxed);
        }
        fn on_player_action(&self, _: &str, _: usize, _: PokerAction, _: u32, _: u32) {
            self.actions.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn multiplexer_reaches_every_monitor() {
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        let mut set = MonitorSet::new();
        set.attach(a.clone());
        set.attach(b.clone());

        set.on_hand_start("h", &[], 0, 5, 10);
        set.on_player_action("h", 0, PokerAction::Fold, 0, 100);
        set.on_player_action("h", 1, PokerAction::Call, 10, 90);

        for m in [&a, &b] {
            assert_eq!(m.hands.load(Ordering::Relaxed), 1);
            assert_eq!(m.actions.load(Ordering::Relaxed), 2);
        }
    }
}
