//! Hand strength evaluation.

mod evaluation;

pub use evaluation::{best_hand, evaluate};
