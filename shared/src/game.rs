//! Streets and player action kinds as they appear on the wire.

use serde::{Deserialize, Serialize};

/// Betting round of a hand. `Complete` means no further betting happens
/// (showdown or everyone-but-one folded).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Complete,
}

impl Street {
    /// Community cards dealt once this street is reached.
    pub fn board_len(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River | Street::Complete => 5,
        }
    }

    pub fn next(self) -> Street {
        match self {
            Street::Preflop => Street::Flop,
            Street::Flop => Street::Turn,
            Street::Turn => Street::River,
            Street::River | Street::Complete => Street::Complete,
        }
    }
}

impl std::fmt::Display for Street {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
            Street::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Action verbs a bot may send (and the server echoes back in
/// `player_action` / `valid_actions`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PokerAction {
    Fold,
    Check,
    Call,
    Raise,
    Allin,
    SitOut,
    SitIn,
}

impl PokerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PokerAction::Fold => "fold",
            PokerAction::Check => "check",
            PokerAction::Call => "call",
            PokerAction::Raise => "raise",
            PokerAction::Allin => "allin",
            PokerAction::SitOut => "sit-out",
            PokerAction::SitIn => "sit-in",
        }
    }
}

impl std::fmt::Display for PokerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
