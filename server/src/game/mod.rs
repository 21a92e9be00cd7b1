//! The hand state machine: pure rules, no I/O. The runner drives it; the
//! pool never touches it directly.

mod betting;
mod errors;
mod hand;
mod pots;
mod settle;
mod street;

pub use betting::Applied;
pub use errors::ActionError;
pub use hand::{HandState, Seat};
pub use pots::Pot;
pub use settle::Settlement;
pub use street::StreetEvent;
