//! The framed message protocol.
//!
//! Every frame carries one JSON record tagged by a `type` field. Field names
//! here are the wire contract; bots are written against these exact names.

use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::game::{PokerAction, Street};
use crate::player::{BotRole, HandPlayer, PlayerSnapshot, WinnerEntry};

/// Frames a client may send.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Mandatory first frame of every session.
    Connect {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<BotRole>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        protocol_version: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_token: Option<String>,
    },
    /// A decision for the currently outstanding `action_request`, or an
    /// out-of-band `sit-out`/`sit-in`.
    Action {
        action: PokerAction,
        #[serde(default)]
        amount: u32,
    },
}

/// Frames the server may send.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    HandStart {
        hand_id: String,
        players: Vec<HandPlayer>,
        button: usize,
        your_seat: usize,
        small_blind: u32,
        big_blind: u32,
    },
    GameUpdate {
        hand_id: String,
        street: Street,
        community_cards: Vec<Card>,
        pot: u32,
        players: Vec<PlayerSnapshot>,
    },
    ActionRequest {
        hand_id: String,
        pot: u32,
        to_call: u32,
        min_bet: u32,
        min_raise: u32,
        valid_actions: Vec<PokerAction>,
        /// Milliseconds left on the decision clock.
        time_remaining: u64,
    },
    PlayerAction {
        hand_id: String,
        seat: usize,
        action: PokerAction,
        amount: u32,
        pot_after: u32,
    },
    StreetChange {
        hand_id: String,
        street: Street,
        community_cards: Vec<Card>,
    },
    HandResult {
        hand_id: String,
        winners: Vec<WinnerEntry>,
        pot_size: u32,
        final_board: Vec<Card>,
    },
    GameCompleted {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hand_limit: Option<u64>,
        hands_completed: u64,
    },
    /// Non-fatal complaint toward one bot (e.g. an illegal action that was
    /// treated as a fold).
    Error { code: String, message: String },
}
