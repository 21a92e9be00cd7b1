//! Round closure and street transitions.

use felt_shared::{Card, Street};

use super::hand::HandState;
use super::pots;

/// Emitted for each street dealt by
/// [`advance_street_if_closed`](HandState::advance_street_if_closed); the
/// runner turns these into `street_change` frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreetEvent {
    pub street: Street,
    pub community: Vec<Card>,
}

impl HandState {
    /// The betting round is closed when every seat that can still act has
    /// taken its turn since the last aggressive action and matched the
    /// current bet. With fewer than two live actors there is nobody left to
    /// bet against, so a matched board is closed as well.
    pub(crate) fn round_closed(&self) -> bool {
        let actors: Vec<_> = self.seats.iter().filter(|s| s.can_act()).collect();
        if actors.len() < 2 {
            return actors.iter().all(|s| s.bet == self.current_bet);
        }
        actors
            .iter()
            .all(|s| s.has_acted && s.bet == self.current_bet)
    }

    /// Called after every action: deals as many streets as have become
    /// closed (several at once when the remaining seats are all-in) and
    /// returns one event per street dealt.
    pub fn advance_street_if_closed(&mut self) -> Vec<StreetEvent> {
        let mut events = Vec::new();
        if self.unfolded_count() <= 1 {
            // Uncontested; no further cards are dealt.
            self.street = Street::Complete;
            return events;
        }

        while self.street != Street::Complete && self.round_closed() {
            self.pots = pots::rebuild(&self.seats);
            for seat in &mut self.seats {
                seat.bet = 0;
                seat.has_acted = false;
                seat.raise_barred = false;
            }
            self.current_bet = 0;
            self.min_raise = self.big_blind;
            self.last_aggressor = None;

            self.street = self.street.next();
            if self.street == Street::Complete {
                break;
            }

            // Burn one, then fill the board up to the street's size.
            let _ = self.draw();
            while self.community.len() < self.street.board_len() {
                match self.draw() {
                    Ok(card) => self.community.push(card),
                    Err(_) => break,
                }
            }
            events.push(StreetEvent {
                street: self.street,
                community: self.community.clone(),
            });

            if let Some(first) = self.first_to_act_postflop() {
                self.active_seat = first;
            }
        }
        events
    }
}
