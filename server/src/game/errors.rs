//! Rule violations surfaced by [`HandState::apply`](super::HandState::apply).
//! These are runtime conditions (a bot misbehaving), never panics.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("no such seat")]
    SeatNotFound,
    #[error("action not valid for the current state")]
    InvalidForState,
    #[error("amount out of range")]
    AmountOutOfRange,
}

impl ActionError {
    /// Wire code carried in the `error` frame toward the offending bot.
    pub fn code(self) -> &'static str {
        match self {
            ActionError::NotYourTurn => "not_your_turn",
            ActionError::SeatNotFound => "seat_not_found",
            ActionError::InvalidForState => "invalid_action_for_state",
            ActionError::AmountOutOfRange => "amount_out_of_range",
        }
    }
}
