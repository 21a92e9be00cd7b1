//! Hand state: seats, deck, betting bookkeeping, and hand setup.

use std::collections::VecDeque;

use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;

use felt_shared::{Card, PlayerSnapshot, Street};

use super::pots::Pot;

/// One seat in one hand.
#[derive(Clone, Debug)]
pub struct Seat {
    pub seat: usize,
    pub name: String,
    pub chips: u32,
    /// Chips committed on the current street.
    pub bet: u32,
    /// Chips committed across the whole hand.
    pub total_committed: u32,
    pub hole: [Card; 2],
    pub folded: bool,
    pub all_in: bool,
    pub sitting_out: bool,
    pub has_acted: bool,
    /// Set by a short all-in: this seat may still call or fold the increment
    /// but not raise. Cleared by a full raise or a street change.
    pub raise_barred: bool,
}

impl Seat {
    /// A seat that still takes turns this hand.
    pub fn can_act(&self) -> bool {
        !self.folded && !self.all_in
    }

    /// Move up to `amount` chips into the current bet. Returns what was
    /// actually paid; marks the seat all-in when the stack empties.
    pub(crate) fn commit(&mut self, amount: u32) -> u32 {
        let pay = amount.min(self.chips);
        self.chips -= pay;
        self.bet += pay;
        self.total_committed += pay;
        if self.chips == 0 {
            self.all_in = true;
        }
        pay
    }

    pub(crate) fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            seat: self.seat,
            chips: self.chips,
            bet: self.bet,
            folded: self.folded,
            all_in: self.all_in,
        }
    }
}

/// Full state of one hand. Created by the runner for one deal and dropped
/// after the result is published.
#[derive(Clone, Debug)]
pub struct HandState {
    pub id: String,
    pub button: usize,
    pub small_blind: u32,
    pub big_blind: u32,
    pub seats: Vec<Seat>,
    pub active_seat: usize,
    pub(crate) deck: VecDeque<Card>,
    pub community: Vec<Card>,
    pub current_bet: u32,
    pub min_raise: u32,
    pub last_aggressor: Option<usize>,
    pub street: Street,
    /// Rebuilt from committed totals at each street change; never mutated
    /// in place.
    pub pots: Vec<Pot>,
}

impl HandState {
    /// Deal a fresh hand: seeded shuffle, two hole cards per seat, blinds
    /// posted, preflop betting open.
    pub fn new(
        id: impl Into<String>,
        seed: u64,
        names: &[String],
        button: usize,
        small_blind: u32,
        big_blind: u32,
        start_chips: u32,
    ) -> Result<Self> {
        let n = names.len();
        if !(2..=10).contains(&n) {
            bail!("hand needs 2..=10 seats, got {}", n);
        }
        if button >= n {
            bail!("button seat {} out of range for {} seats", button, n);
        }
        if small_blind == 0 || big_blind <= small_blind {
            bail!("blinds must satisfy bb > sb > 0 (got sb={}, bb={})", small_blind, big_blind);
        }
        if start_chips < big_blind {
            bail!("start chips {} below the big blind {}", start_chips, big_blind);
        }

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut deck = Card::deck();
        deck.shuffle(&mut rng);
        let mut deck = VecDeque::from(deck);

        let mut seats = Vec::with_capacity(n);
        for (i, name) in names.iter().enumerate() {
            let c1 = deal(&mut deck)?;
            let c2 = deal(&mut deck)?;
            seats.push(Seat {
                seat: i,
                name: name.clone(),
                chips: start_chips,
                bet: 0,
                total_committed: 0,
                hole: [c1, c2],
                folded: false,
                all_in: false,
                sitting_out: false,
                has_acted: false,
                raise_barred: false,
            });
        }

        let mut hand = HandState {
            id: id.into(),
            button,
            small_blind,
            big_blind,
            seats,
            active_seat: button,
            deck,
            community: Vec::new(),
            current_bet: 0,
            min_raise: big_blind,
            last_aggressor: None,
            street: Street::Preflop,
            pots: Vec::new(),
        };

        // Heads-up the button posts the small blind and acts first preflop.
        let (sb_seat, bb_seat) = if n == 2 {
            (button, (button + 1) % n)
        } else {
            ((button + 1) % n, (button + 2) % n)
        };
        hand.seats[sb_seat].commit(small_blind);
        hand.seats[bb_seat].commit(big_blind);
        hand.current_bet = big_blind;
        hand.min_raise = big_blind;
        hand.active_seat = hand.first_to_act_preflop();
        Ok(hand)
    }

    pub(crate) fn first_to_act_preflop(&self) -> usize {
        let n = self.seats.len();
        let start = if n == 2 { self.button } else { (self.button + 3) % n };
        self.next_actor_from(start).unwrap_or(start)
    }

    /// First seat left of the button that can still act.
    pub(crate) fn first_to_act_postflop(&self) -> Option<usize> {
        let n = self.seats.len();
        self.next_actor_from((self.button + 1) % n)
    }

    /// First seat at or after `start` (wrapping) that can act.
    pub(crate) fn next_actor_from(&self, start: usize) -> Option<usize> {
        let n = self.seats.len();
        (0..n).map(|i| (start + i) % n).find(|&i| self.seats[i].can_act())
    }

    /// Next seat after `from` that still owes action this street.
    pub(crate) fn next_pending_after(&self, from: usize) -> Option<usize> {
        let n = self.seats.len();
        (1..=n).map(|i| (from + i) % n).find(|&i| {
            let s = &self.seats[i];
            s.can_act() && (!s.has_acted || s.bet < self.current_bet)
        })
    }

    pub fn seat(&self, idx: usize) -> Option<&Seat> {
        self.seats.get(idx)
    }

    pub fn unfolded_count(&self) -> usize {
        self.seats.iter().filter(|s| !s.folded).count()
    }

    /// Total chips in play this hand, including bets not yet swept into pots.
    pub fn pot_total(&self) -> u32 {
        self.seats.iter().map(|s| s.total_committed).sum()
    }

    /// Amount the active seat must add to match the current bet.
    pub fn to_call(&self) -> u32 {
        let seat = &self.seats[self.active_seat];
        self.current_bet.saturating_sub(seat.bet)
    }

    pub fn is_complete(&self) -> bool {
        self.unfolded_count() <= 1 || self.street == Street::Complete
    }

    pub fn snapshots(&self) -> Vec<PlayerSnapshot> {
        self.seats.iter().map(Seat::snapshot).collect()
    }

    pub(crate) fn draw(&mut self) -> Result<Card> {
        deal(&mut self.deck)
    }

    /// Deterministic helper used only by tests that need a known deck order.
    #[cfg(test)]
    pub(crate) fn deck_len(&self) -> usize {
        self.deck.len()
    }
}

fn deal(deck: &mut VecDeque<Card>) -> Result<Card> {
    deck.pop_front()
        .ok_or_else(|| anyhow::anyhow!("deck underflow"))
}
