//! Minimal progress monitor: one dot per completed hand.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use super::HandMonitor;
use crate::runner::HandOutcome;

const DOTS_PER_LINE: u64 = 50;

/// Prints a `.` per hand and wraps the line every fifty, for long headless
/// runs where the pretty monitor would be noise.
#[derive(Debug, Default)]
pub struct DotsMonitor {
    count: AtomicU64,
}

impl DotsMonitor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandMonitor for DotsMonitor {
    fn on_hand_complete(&self, _outcome: &HandOutcome) {
        let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut out = std::io::stdout().lock();
        if n % DOTS_PER_LINE == 0 {
            let _ = writeln!(out, ". {}", n);
        } else {
            let _ = write!(out, ".");
            let _ = out.flush();
        }
    }

    fn on_game_complete(&self, game: &str, hands: u64, reason: &str) {
        println!();
        println!("{}: {} hands ({})", game, hands, reason);
    }
}
