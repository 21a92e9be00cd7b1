//! End-of-hand settlement: pot distribution and the hand result payload.

use felt_shared::{Card, HandRank, WinnerEntry};

use crate::poker;

use super::hand::HandState;
use super::pots;

/// What a finished hand pays out. `deltas[i]` is seat i's net chip change;
/// the runner turns the rest into the `hand_result` frame.
#[derive(Clone, Debug)]
pub struct Settlement {
    pub winners: Vec<WinnerEntry>,
    pub deltas: Vec<i64>,
    pub pot_size: u32,
    pub board: Vec<Card>,
    pub showdown: bool,
}

impl HandState {
    /// Distribute every pot layer. Uncontested layers go back to their only
    /// eligible seat; contested layers are split among the best hands, with
    /// any odd chips going to the winner closest left of the button.
    pub fn settle(&self) -> Settlement {
        let n = self.seats.len();
        let final_pots = pots::rebuild(&self.seats);
        let pot_size = pots::total(&final_pots);
        let showdown = self.unfolded_count() >= 2;

        let ranks: Vec<Option<HandRank>> = self
            .seats
            .iter()
            .map(|s| {
                (showdown && !s.folded).then(|| poker::best_hand(s.hole, &self.community))
            })
            .collect();

        let mut winnings = vec![0u32; n];
        for pot in &final_pots {
            match pot.eligible.as_slice() {
                [] => {}
                [only] => winnings[*only] += pot.amount,
                eligible => {
                    let best = eligible
                        .iter()
                        .filter_map(|&i| ranks[i].as_ref())
                        .max()
                        .cloned();
                    let mut pot_winners: Vec<usize> = eligible
                        .iter()
                        .copied()
                        .filter(|&i| ranks[i].as_ref() == best.as_ref())
                        .collect();
                    if pot_winners.is_empty() {
                        continue;
                    }
                    // Odd chips go to the winner closest left of the button.
                    pot_winners
                        .sort_by_key(|&i| (i + n - (self.button + 1) % n) % n);
                    let share = pot.amount / pot_winners.len() as u32;
                    let remainder = pot.amount % pot_winners.len() as u32;
                    for &w in &pot_winners {
                        winnings[w] += share;
                    }
                    winnings[pot_winners[0]] += remainder;
                }
            }
        }

        let winners = self
            .seats
            .iter()
            .filter(|s| winnings[s.seat] > 0)
            .map(|s| WinnerEntry {
                seat: s.seat,
                amount: winnings[s.seat],
                hole_cards: ranks[s.seat].as_ref().map(|_| s.hole),
                hand_rank: ranks[s.seat].as_ref().map(|r| r.category.label().to_owned()),
            })
            .collect();

        let deltas = self
            .seats
            .iter()
            .map(|s| winnings[s.seat] as i64 - s.total_committed as i64)
            .collect();

        Settlement {
            winners,
            deltas,
            pot_size,
            board: self.community.clone(),
            showdown,
        }
    }
}
