//! Built-in strategies for NPC sessions and the `felt-bot` client.
//!
//! Strategies see exactly what a remote bot sees: the `action_request`
//! fields plus whatever state the client tracked from `game_update`s.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use felt_shared::PokerAction;

/// One decision's worth of context.
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub pot: u32,
    pub to_call: u32,
    pub min_bet: u32,
    pub min_raise: u32,
    pub valid_actions: Vec<PokerAction>,
    /// Own stack as last seen in a `game_update`, when known.
    pub stack: Option<u32>,
    pub big_blind: Option<u32>,
}

impl DecisionContext {
    pub fn can(&self, action: PokerAction) -> bool {
        self.valid_actions.contains(&action)
    }
}

pub trait Strategy: Send {
    fn name(&self) -> &'static str;
    fn decide(&mut self, ctx: &DecisionContext) -> (PokerAction, u32);
}

/// Checks when it can, calls when it must, shoves only when calling is not
/// offered. Never folds, never raises; the workhorse for scripted tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallingStation;

impl Strategy for CallingStation {
    fn name(&self) -> &'static str {
        "calling-station"
    }

    fn decide(&mut self, ctx: &DecisionContext) -> (PokerAction, u32) {
        if ctx.can(PokerAction::Check) {
            (PokerAction::Check, 0)
        } else if ctx.can(PokerAction::Call) {
            (PokerAction::Call, 0)
        } else if ctx.can(PokerAction::Allin) {
            (PokerAction::Allin, 0)
        } else {
            (PokerAction::Fold, 0)
        }
    }
}

/// Probabilistic pressure player: folds more often as the price goes up,
/// raises the minimum now and then. Seeded, so runs are reproducible.
#[derive(Debug, Clone)]
pub struct PressureBot {
    rng: StdRng,
    /// Baseline fold probability against any bet.
    base_fold: f64,
    /// Probability of min-raising instead of calling/checking.
    aggression: f64,
}

impl PressureBot {
    pub fn new(seed: u64) -> Self {
        PressureBot {
            rng: StdRng::seed_from_u64(seed),
            base_fold: 0.10,
            aggression: 0.20,
        }
    }
}

impl Strategy for PressureBot {
    fn name(&self) -> &'static str {
        "pressure"
    }

    fn decide(&mut self, ctx: &DecisionContext) -> (PokerAction, u32) {
        let can_raise = ctx.can(PokerAction::Raise);
        if can_raise && self.rng.random::<f64>() < self.aggression {
            return (PokerAction::Raise, ctx.min_bet);
        }
        if ctx.can(PokerAction::Check) {
            return (PokerAction::Check, 0);
        }
        if ctx.to_call > 0 {
            // Price-sensitive fold: the bigger the call relative to the
            // stack behind, the likelier the fold.
            let stack = ctx.stack.unwrap_or(ctx.to_call * 4).max(1);
            let pressure = ctx.to_call as f64 / (stack as f64 + ctx.to_call as f64);
            let fold_chance = (self.base_fold + pressure * (1.0 - self.base_fold)).min(0.95);
            if self.rng.random::<f64>() < fold_chance {
                return (PokerAction::Fold, 0);
            }
        }
        if ctx.can(PokerAction::Call) {
            (PokerAction::Call, 0)
        } else if ctx.can(PokerAction::Allin) {
            (PokerAction::Allin, 0)
        } else {
            (PokerAction::Fold, 0)
        }
    }
}

/// Build a strategy by wire name.
pub fn strategy_by_name(name: &str, seed: u64) -> Option<Box<dyn Strategy>> {
    match name {
        "calling-station" => Some(Box::new(CallingStation)),
        "pressure" => Some(Box::new(PressureBot::new(seed))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(valid: &[PokerAction], to_call: u32) -> DecisionContext {
        DecisionContext {
            pot: 30,
            to_call,
            min_bet: 20,
            min_raise: 10,
            valid_actions: valid.to_vec(),
            stack: Some(1000),
            big_blind: Some(10),
        }
    }

    #[test]
    fn calling_station_prefers_check_then_call() {
        let mut s = CallingStation;
        let (a, _) = s.decide(&ctx(&[PokerAction::Fold, PokerAction::Check, PokerAction::Allin], 0));
        assert_eq!(a, PokerAction::Check);
        let (a, _) = s.decide(&ctx(&[PokerAction::Fold, PokerAction::Call, PokerAction::Allin], 10));
        assert_eq!(a, PokerAction::Call);
        // Exact-stack spot: call is absent, the station shoves.
        let (a, _) = s.decide(&ctx(&[PokerAction::Fold, PokerAction::Allin], 115));
        assert_eq!(a, PokerAction::Allin);
    }

    #[test]
    fn pressure_bot_is_deterministic_per_seed() {
        let spots = [
            ctx(&[PokerAction::Fold, PokerAction::Call, PokerAction::Raise, PokerAction::Allin], 10),
            ctx(&[PokerAction::Fold, PokerAction::Check, PokerAction::Raise, PokerAction::Allin], 0),
            ctx(&[PokerAction::Fold, PokerAction::Call, PokerAction::Allin], 400),
        ];
        let run = |seed: u64| {
            let mut bot = PressureBot::new(seed);
            spots.iter().map(|c| bot.decide(c)).collect::<Vec<_>>()
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn pressure_bot_only_emits_offered_actions() {
        let mut bot = PressureBot::new(1);
        for to_call in [0u32, 10, 50, 400] {
            let valid = if to_call == 0 {
                vec![PokerAction::Fold, PokerAction::Check, PokerAction::Allin]
            } else {
                vec![PokerAction::Fold, PokerAction::Call, PokerAction::Allin]
            };
            for _ in 0..50 {
                let (action, _) = bot.decide(&ctx(&valid, to_call));
                assert!(
                    valid.contains(&action) || action == PokerAction::Fold,
                    "strategy emitted {action} outside the offered set"
                );
            }
        }
    }

    #[test]
    fn unknown_strategy_name_is_rejected() {
        assert!(strategy_by_name("calling-station", 0).is_some());
        assert!(strategy_by_name("pressure", 0).is_some());
        assert!(strategy_by_name("gto-wizard", 0).is_none());
    }
}
