//! Action legality and application. This file is the betting contract the
//! rest of the server leans on; the tests at the bottom pin its edges.

use felt_shared::PokerAction;

use super::errors::ActionError;
use super::hand::HandState;

/// What actually happened when an action was applied. `amount` is the chips
/// paid for a call, or the street-total bet level for a raise or all-in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Applied {
    pub action: PokerAction,
    pub amount: u32,
    pub all_in: bool,
}

impl HandState {
    /// The action set offered to the active seat. Never empty: `fold` is
    /// always present.
    pub fn valid_actions(&self) -> Vec<PokerAction> {
        let seat = &self.seats[self.active_seat];
        let to_call = self.current_bet.saturating_sub(seat.bet);

        let mut actions = vec![PokerAction::Fold];
        if to_call == 0 {
            actions.push(PokerAction::Check);
        }
        if to_call > 0 && seat.chips > to_call {
            actions.push(PokerAction::Call);
        }
        // A raise needs strictly more than the call behind it, a full
        // minimum increment within reach, and an unbarred seat. A stack
        // that exactly covers the call is *not* a raise candidate; the only
        // way to put it in is `allin`.
        if seat.chips > to_call
            && seat.bet + seat.chips >= self.current_bet + self.min_raise
            && !seat.raise_barred
        {
            actions.push(PokerAction::Raise);
        }
        if seat.chips > 0 {
            actions.push(PokerAction::Allin);
        }
        actions
    }

    /// Apply one action for `seat_idx`. Mutates seats and betting state;
    /// street advancement is a separate step
    /// ([`advance_street_if_closed`](HandState::advance_street_if_closed)).
    pub fn apply(
        &mut self,
        seat_idx: usize,
        action: PokerAction,
        amount: u32,
    ) -> Result<Applied, ActionError> {
        if seat_idx >= self.seats.len() {
            return Err(ActionError::SeatNotFound);
        }
        if self.is_complete() {
            return Err(ActionError::InvalidForState);
        }
        if seat_idx != self.active_seat {
            return Err(ActionError::NotYourTurn);
        }
        if !self.seats[seat_idx].can_act() {
            return Err(ActionError::InvalidForState);
        }

        let valid = self.valid_actions();
        let applied = match action {
            PokerAction::Fold => {
                self.seats[seat_idx].folded = true;
                Applied { action, amount: 0, all_in: false }
            }
            // A sit-out folds the current hand; the session layer keeps the
            // seat out of future hands.
            PokerAction::SitOut => {
                self.seats[seat_idx].folded = true;
                self.seats[seat_idx].sitting_out = true;
                Applied { action: PokerAction::Fold, amount: 0, all_in: false }
            }
            PokerAction::SitIn => return Err(ActionError::InvalidForState),
            PokerAction::Check => {
                if !valid.contains(&PokerAction::Check) {
                    return Err(ActionError::InvalidForState);
                }
                Applied { action, amount: 0, all_in: false }
            }
            PokerAction::Call => {
                if !valid.contains(&PokerAction::Call) {
                    return Err(ActionError::InvalidForState);
                }
                let owed = self.current_bet - self.seats[seat_idx].bet;
                let paid = self.seats[seat_idx].commit(owed);
                Applied { action, amount: paid, all_in: self.seats[seat_idx].all_in }
            }
            PokerAction::Raise => {
                if !valid.contains(&PokerAction::Raise) {
                    return Err(ActionError::InvalidForState);
                }
                self.apply_raise_to(seat_idx, amount)?
            }
            PokerAction::Allin => {
                if !valid.contains(&PokerAction::Allin) {
                    return Err(ActionError::InvalidForState);
                }
                self.apply_all_in(seat_idx)
            }
        };

        self.seats[seat_idx].has_acted = true;
        if let Some(next) = self.next_pending_after(seat_idx) {
            self.active_seat = next;
        }
        Ok(applied)
    }

    /// Fold a seat without a legality check. Used for timeouts, disconnects
    /// and rejected actions; infallible so the runner can always make
    /// progress.
    pub fn force_fold(&mut self, seat_idx: usize) {
        let Some(seat) = self.seats.get_mut(seat_idx) else {
            return;
        };
        if seat.folded {
            return;
        }
        seat.folded = true;
        seat.has_acted = true;
        if seat_idx == self.active_seat {
            if let Some(next) = self.next_pending_after(seat_idx) {
                self.active_seat = next;
            }
        }
    }

    /// Raise the street bet to exactly `to`.
    fn apply_raise_to(&mut self, seat_idx: usize, to: u32) -> Result<Applied, ActionError> {
        let seat_bet = self.seats[seat_idx].bet;
        let seat_chips = self.seats[seat_idx].chips;
        if to < self.current_bet + self.min_raise {
            return Err(ActionError::AmountOutOfRange);
        }
        if to.saturating_sub(seat_bet) > seat_chips {
            return Err(ActionError::AmountOutOfRange);
        }

        self.seats[seat_idx].commit(to - seat_bet);
        self.min_raise = to - self.current_bet;
        self.current_bet = to;
        self.last_aggressor = Some(seat_idx);
        self.reopen_action(seat_idx, false);
        Ok(Applied {
            action: PokerAction::Raise,
            amount: to,
            all_in: self.seats[seat_idx].all_in,
        })
    }

    /// Push the whole stack in. Over the current bet this either reopens
    /// the round (full increment) or bars earlier actors from raising
    /// (short all-in).
    fn apply_all_in(&mut self, seat_idx: usize) -> Applied {
        let stack = self.seats[seat_idx].chips;
        self.seats[seat_idx].commit(stack);
        let new_bet = self.seats[seat_idx].bet;

        if new_bet > self.current_bet {
            let increment = new_bet - self.current_bet;
            if increment >= self.min_raise {
                self.min_raise = increment;
                self.last_aggressor = Some(seat_idx);
                self.reopen_action(seat_idx, false);
            } else {
                self.reopen_action(seat_idx, true);
            }
            self.current_bet = new_bet;
        }
        Applied { action: PokerAction::Allin, amount: new_bet, all_in: true }
    }

    /// Give every other live seat its turn back. `bar_raises` is the short
    /// all-in case: seats that had already acted may call or fold the
    /// increment but not raise again.
    fn reopen_action(&mut self, actor: usize, bar_raises: bool) {
        for i in 0..self.seats.len() {
            if i == actor || !self.seats[i].can_act() {
                continue;
            }
            if bar_raises {
                if self.seats[i].has_acted {
                    self.seats[i].raise_barred = true;
                    self.seats[i].has_acted = false;
                }
            } else {
                self.seats[i].has_acted = false;
                self.seats[i].raise_barred = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use felt_shared::Street;

    fn fresh(n: usize, button: usize) -> HandState {
        let names: Vec<String> = (0..n).map(|i| format!("p{}", i)).collect();
        HandState::new("t", 99, &names, button, 5, 10, 1000).unwrap()
    }

    #[test]
    fn preflop_caller_gets_fold_call_raise_allin() {
        let h = fresh(3, 0);
        assert_eq!(h.active_seat, 0);
        let v = h.valid_actions();
        assert_eq!(
            v,
            vec![PokerAction::Fold, PokerAction::Call, PokerAction::Raise, PokerAction::Allin]
        );
    }

    #[test]
    fn big_blind_may_check_its_option() -> Result<()> {
        let mut h = fresh(3, 0);
        h.apply(0, PokerAction::Call, 0)?;
        h.apply(1, PokerAction::Call, 0)?;
        assert_eq!(h.active_seat, 2);
        let v = h.valid_actions();
        assert!(v.contains(&PokerAction::Check));
        assert!(!v.contains(&PokerAction::Call));
        Ok(())
    }

    #[test]
    fn exact_stack_call_offers_only_fold_and_allin() -> Result<()> {
        // Seat 1 posted SB 5 and has exactly the call left behind after a
        // raise to 120: 1000-start would be too deep, shrink the stack.
        let mut h = fresh(3, 0);
        h.seats[1].chips = 115;
        h.apply(0, PokerAction::Raise, 120)?;
        assert_eq!(h.active_seat, 1);
        assert_eq!(h.to_call(), 115);
        let v = h.valid_actions();
        assert_eq!(v, vec![PokerAction::Fold, PokerAction::Allin]);
        Ok(())
    }

    #[test]
    fn raise_updates_min_raise_and_current_bet() -> Result<()> {
        let mut h = fresh(3, 0);
        h.apply(0, PokerAction::Raise, 30)?;
        assert_eq!(h.current_bet, 30);
        assert_eq!(h.min_raise, 20);
        // Next raise must reach at least 50.
        let err = h.apply(1, PokerAction::Raise, 45).unwrap_err();
        assert_eq!(err, ActionError::AmountOutOfRange);
        h.apply(1, PokerAction::Raise, 50)?;
        assert_eq!(h.current_bet, 50);
        assert_eq!(h.min_raise, 20);
        Ok(())
    }

    #[test]
    fn call_never_changes_min_raise() -> Result<()> {
        let mut h = fresh(3, 0);
        h.apply(0, PokerAction::Raise, 30)?;
        let before = h.min_raise;
        h.apply(1, PokerAction::Call, 0)?;
        assert_eq!(h.min_raise, before);
        Ok(())
    }

    #[test]
    fn raise_reopens_action_for_other_seats() -> Result<()> {
        let mut h = fresh(3, 0);
        h.apply(0, PokerAction::Call, 0)?;
        h.apply(1, PokerAction::Call, 0)?;
        h.apply(2, PokerAction::Raise, 30)?;
        assert!(!h.seats[0].has_acted);
        assert!(!h.seats[1].has_acted);
        assert!(h.seats[2].has_acted);
        Ok(())
    }

    #[test]
    fn short_all_in_does_not_reopen_action() -> Result<()> {
        let mut h = fresh(3, 0);
        // Seat 2 (BB) holds 9 behind its posted 10: the shove to 19 is an
        // increment of 9, under the minimum raise of 10.
        h.seats[2].chips = 9;
        h.apply(0, PokerAction::Call, 0)?;
        h.apply(1, PokerAction::Call, 0)?;
        h.apply(2, PokerAction::Allin, 0)?;
        assert_eq!(h.current_bet, 19);
        // Earlier callers must respond to the extra 9 but may not raise.
        assert_eq!(h.active_seat, 0);
        assert!(h.seats[0].raise_barred);
        let v = h.valid_actions();
        assert!(v.contains(&PokerAction::Call));
        assert!(!v.contains(&PokerAction::Raise), "short all-in must not reopen raising");
        // The minimum raise increment is untouched by the short shove.
        assert_eq!(h.min_raise, 10);
        Ok(())
    }

    #[test]
    fn full_all_in_reopens_action() -> Result<()> {
        let mut h = fresh(3, 0);
        h.seats[2].chips = 40;
        h.apply(0, PokerAction::Call, 0)?;
        h.apply(1, PokerAction::Call, 0)?;
        h.apply(2, PokerAction::Allin, 0)?;
        // 10 posted + 40 shoved = bet 50, increment 40 >= min raise 10.
        assert_eq!(h.current_bet, 50);
        assert_eq!(h.min_raise, 40);
        assert!(!h.seats[0].raise_barred);
        assert!(h.valid_actions().contains(&PokerAction::Raise));
        Ok(())
    }

    #[test]
    fn full_all_in_after_short_all_in_restores_raising() -> Result<()> {
        // Button 0: sb=1, bb=2, seat 3 opens. Everyone limps, the BB
        // short-shoves, then seat 3 shoves a full stack: the short bar must
        // not survive the full reopen.
        let mut h = fresh(4, 0);
        h.seats[2].chips = 9;
        h.seats[3].chips = 100;
        h.apply(3, PokerAction::Call, 0)?;
        h.apply(0, PokerAction::Call, 0)?;
        h.apply(1, PokerAction::Call, 0)?;
        h.apply(2, PokerAction::Allin, 0)?;
        for i in [0usize, 1, 3] {
            assert!(h.seats[i].raise_barred);
        }
        h.apply(3, PokerAction::Allin, 0)?;
        for i in [0usize, 1] {
            assert!(!h.seats[i].raise_barred);
            assert!(!h.seats[i].has_acted);
        }
        assert!(h.valid_actions().contains(&PokerAction::Raise));
        Ok(())
    }

    #[test]
    fn reraise_chain_compounds_the_minimum() -> Result<()> {
        let mut h = fresh(3, 0);
        h.apply(0, PokerAction::Raise, 30)?;
        h.apply(1, PokerAction::Raise, 80)?;
        assert_eq!(h.min_raise, 50);
        // Seat 2 must now reach 130 to raise.
        assert_eq!(h.apply(2, PokerAction::Raise, 120).unwrap_err(), ActionError::AmountOutOfRange);
        h.apply(2, PokerAction::Raise, 130)?;
        assert_eq!(h.current_bet, 130);
        assert_eq!(h.min_raise, 50);
        Ok(())
    }

    #[test]
    fn check_raise_is_legal_postflop() -> Result<()> {
        let mut h = fresh(3, 0);
        h.apply(0, PokerAction::Call, 0)?;
        h.apply(1, PokerAction::Call, 0)?;
        h.apply(2, PokerAction::Check, 0)?;
        h.advance_street_if_closed();
        // Flop: seat 1 checks, seat 2 bets, and seat 1 gets its turn back
        // with raising open.
        assert_eq!(h.active_seat, 1);
        h.apply(1, PokerAction::Check, 0)?;
        h.apply(2, PokerAction::Raise, 20)?;
        h.apply(0, PokerAction::Fold, 0)?;
        assert_eq!(h.active_seat, 1);
        assert!(h.valid_actions().contains(&PokerAction::Raise));
        h.apply(1, PokerAction::Raise, 60)?;
        assert_eq!(h.current_bet, 60);
        assert_eq!(h.min_raise, 40);
        Ok(())
    }

    #[test]
    fn out_of_turn_and_bad_seat_are_rejected() {
        let mut h = fresh(3, 0);
        assert_eq!(h.apply(1, PokerAction::Fold, 0).unwrap_err(), ActionError::NotYourTurn);
        assert_eq!(h.apply(7, PokerAction::Fold, 0).unwrap_err(), ActionError::SeatNotFound);
        assert_eq!(h.apply(0, PokerAction::Check, 0).unwrap_err(), ActionError::InvalidForState);
    }

    #[test]
    fn sit_out_folds_and_flags_the_seat() -> Result<()> {
        let mut h = fresh(3, 0);
        let applied = h.apply(0, PokerAction::SitOut, 0)?;
        assert_eq!(applied.action, PokerAction::Fold);
        assert!(h.seats[0].folded);
        assert!(h.seats[0].sitting_out);
        Ok(())
    }

    #[test]
    fn completes_when_everyone_else_folds() -> Result<()> {
        let mut h = fresh(3, 0);
        h.apply(0, PokerAction::Fold, 0)?;
        h.apply(1, PokerAction::Fold, 0)?;
        assert!(h.is_complete());
        assert_eq!(h.street, Street::Preflop);
        Ok(())
    }
}
