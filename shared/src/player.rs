//! Per-message player records.

use serde::{Deserialize, Serialize};

use crate::cards::Card;

/// How a session participates in games.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotRole {
    #[default]
    Player,
    Npc,
}

/// Seat assignment announced in `hand_start`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandPlayer {
    pub name: String,
    pub seat: usize,
    pub chips: u32,
}

/// Per-seat state carried by every `game_update`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub seat: usize,
    pub chips: u32,
    pub bet: u32,
    pub folded: bool,
    pub all_in: bool,
}

/// One winner line in `hand_result`. Hole cards and rank are present only
/// when the seat showed down.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WinnerEntry {
    pub seat: usize,
    pub amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_cards: Option<[Card; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand_rank: Option<String>,
}
