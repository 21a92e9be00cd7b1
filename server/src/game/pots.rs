//! Pot layering. Pots are always rebuilt from committed totals, never
//! mutated incrementally, so they cannot drift from the seats.

use super::hand::Seat;

/// One pot layer: the main pot first, side pots in increasing all-in
/// threshold order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pot {
    pub amount: u32,
    /// Seats that can win this layer (committed at least its threshold and
    /// have not folded).
    pub eligible: Vec<usize>,
}

/// Rebuild the pot layers from scratch.
///
/// Walk the distinct committed totals ascending; each step of the walk
/// contributes `(threshold - previous) * contributors` chips. Folded seats
/// contribute chips but are never eligible; adjacent layers with the same
/// eligible set collapse into one pot.
pub fn rebuild(seats: &[Seat]) -> Vec<Pot> {
    let mut thresholds: Vec<u32> = seats
        .iter()
        .map(|s| s.total_committed)
        .filter(|&c| c > 0)
        .collect();
    thresholds.sort_unstable();
    thresholds.dedup();

    let mut pots: Vec<Pot> = Vec::new();
    let mut prev = 0u32;
    for threshold in thresholds {
        let step = threshold - prev;
        let contributors = seats
            .iter()
            .filter(|s| s.total_committed >= threshold)
            .count() as u32;
        let eligible: Vec<usize> = seats
            .iter()
            .filter(|s| s.total_committed >= threshold && !s.folded)
            .map(|s| s.seat)
            .collect();
        let amount = step * contributors;
        prev = threshold;

        match pots.last_mut() {
            // A folded seat's threshold splits a layer without changing who
            // can win it; fold those chips into the pot below. Same for a
            // layer nobody live reaches (over-commit by a seat that later
            // folded).
            Some(last) if last.eligible == eligible || eligible.is_empty() => {
                last.amount += amount;
            }
            _ => pots.push(Pot { amount, eligible }),
        }
    }
    pots
}

/// Sum across all layers; equals the sum of committed totals.
pub fn total(pots: &[Pot]) -> u32 {
    pots.iter().map(|p| p.amount).sum()
}
