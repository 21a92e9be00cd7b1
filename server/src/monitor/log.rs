//! Structured-log monitor: every lifecycle event becomes one tracing line.

use felt_shared::{Card, HandPlayer, PokerAction, Street};

use super::HandMonitor;
use crate::runner::HandOutcome;

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMonitor;

impl HandMonitor for TracingMonitor {
    fn on_game_start(&self, game: &str, hand_limit: Option<u64>) {
        tracing::info!(game = %game, hand_limit = ?hand_limit, "game started");
    }

    fn on_hand_start(
        &self,
        hand_id: &str,
        players: &[HandPlayer],
        button: usize,
        small_blind: u32,
        big_blind: u32,
    ) {
        tracing::info!(
            hand = %hand_id,
            players = players.len(),
            button,
            sb = small_blind,
            bb = big_blind,
            "hand started"
        );
    }

    fn on_player_action(
        &self,
        hand_id: &str,
        seat: usize,
        action: PokerAction,
        amount: u32,
        stack: u32,
    ) {
        tracing::info!(hand = %hand_id, seat, action = %action, amount, stack, "action");
    }

    fn on_street_change(&self, hand_id: &str, street: Street, cards: &[Card]) {
        let board: Vec<String> = cards.iter().map(|c| c.to_string()).collect();
        tracing::info!(hand = %hand_id, street = %street, board = ?board, "street");
    }

    fn on_hand_complete(&self, outcome: &HandOutcome) {
        tracing::info!(
            hand = %outcome.hand_id,
            pot = outcome.pot_size,
            winners = outcome.winners.len(),
            street = %outcome.street_reached,
            showdown = outcome.showdown,
            "hand complete"
        );
    }

    fn on_game_complete(&self, game: &str, hands: u64, reason: &str) {
        tracing::info!(game = %game, hands, reason = %reason, "game complete");
    }
}
