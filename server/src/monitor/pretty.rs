//! Colored console monitor for watching a table from the server terminal.

use std::io::IsTerminal;

use owo_colors::OwoColorize;

use felt_shared::{Card, HandPlayer, PokerAction, Street};

use super::HandMonitor;
use crate::runner::HandOutcome;

/// Prints a compact, human-oriented line per event. Color is dropped when
/// stdout is not a terminal.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleMonitor {
    color: bool,
}

impl ConsoleMonitor {
    pub fn new() -> Self {
        ConsoleMonitor { color: std::io::stdout().is_terminal() }
    }

    fn card_list(cards: &[Card]) -> String {
        cards
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for ConsoleMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HandMonitor for ConsoleMonitor {
    fn on_hand_start(
        &self,
        hand_id: &str,
        players: &[HandPlayer],
        button: usize,
        small_blind: u32,
        big_blind: u32,
    ) {
        let roster = players
            .iter()
            .map(|p| format!("{}:{}({})", p.seat, p.name, p.chips))
            .collect::<Vec<_>>()
            .join(" ");
        if self.color {
            println!(
                "{} {} blinds {}/{} button {} | {}",
                "[HAND]".bold().cyan(),
                hand_id.bold(),
                small_blind,
                big_blind,
                button,
                roster
            );
        } else {
            println!(
                "[HAND] {} blinds {}/{} button {} | {}",
                hand_id, small_blind, big_blind, button, roster
            );
        }
    }

    fn on_player_action(
        &self,
        _hand_id: &str,
        seat: usize,
        action: PokerAction,
        amount: u32,
        stack: u32,
    ) {
        let verb = match action {
            PokerAction::Fold => format!("{}", "folds".red()),
            PokerAction::Check => "checks".to_owned(),
            PokerAction::Call => format!("calls {}", amount),
            PokerAction::Raise => format!("{} {}", "raises to".yellow(), amount),
            PokerAction::Allin => format!("{} ({})", "all-in".bold().yellow(), amount),
            PokerAction::SitOut => "sits out".to_owned(),
            PokerAction::SitIn => "sits in".to_owned(),
        };
        if self.color {
            println!("  seat {} {} (stack {})", seat, verb, stack);
        } else {
            println!("  seat {} {} (stack {})", seat, action, stack);
        }
    }

    fn on_street_change(&self, _hand_id: &str, street: Street, cards: &[Card]) {
        if self.color {
            println!("  {} {}", format!("[{}]", street).bold().green(), Self::card_list(cards));
        } else {
            println!("  [{}] {}", street, Self::card_list(cards));
        }
    }

    fn on_hand_complete(&self, outcome: &HandOutcome) {
        let winners = outcome
            .winners
            .iter()
            .map(|w| match &w.hand_rank {
                Some(rank) => format!("seat {} +{} ({})", w.seat, w.amount, rank),
                None => format!("seat {} +{}", w.seat, w.amount),
            })
            .collect::<Vec<_>>()
            .join(", ");
        if self.color {
            println!(
                "{} {} pot {} -> {}",
                "[RESULT]".bold().magenta(),
                outcome.hand_id,
                outcome.pot_size,
                winners
            );
        } else {
            println!("[RESULT] {} pot {} -> {}", outcome.hand_id, outcome.pot_size, winners);
        }
    }

    fn on_game_complete(&self, game: &str, hands: u64, reason: &str) {
        println!("[GAME] {} complete after {} hands ({})", game, hands, reason);
    }
}
