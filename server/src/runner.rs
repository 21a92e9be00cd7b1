//! Drives one hand end to end: blinds, action requests under the decision
//! deadline, broadcasts, settlement.
//!
//! One hand is one task. There is never more than one outstanding action
//! request, and never more than one mailbox per bot: the runner installs the
//! mailbox right before asking and clears it right after the wait resolves,
//! whatever way it resolves.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;

use felt_shared::{Card, HandPlayer, PokerAction, ServerMsg, Street, WinnerEntry};

use crate::bot::Bot;
use crate::config::GameConfig;
use crate::game::{ActionError, HandState};
use crate::monitor::HandMonitor;

/// Immutable summary of a finished hand, handed to the pool and monitors.
#[derive(Clone, Debug)]
pub struct HandOutcome {
    pub hand_id: String,
    pub game_id: String,
    pub seats: Vec<SeatOutcome>,
    pub street_reached: Street,
    pub actions: u32,
    pub pot_size: u32,
    pub board: Vec<Card>,
    pub winners: Vec<WinnerEntry>,
    pub showdown: bool,
}

#[derive(Clone, Debug)]
pub struct SeatOutcome {
    pub bot_id: String,
    pub name: String,
    pub seat: usize,
    pub delta: i64,
    pub showed_down: bool,
}

/// How one action request resolved.
enum Decision {
    Act(PokerAction, u32),
    TimedOut,
    Gone,
}

pub struct HandRunner {
    game_id: String,
    cfg: GameConfig,
    bots: Vec<Arc<Bot>>,
    monitor: Arc<dyn HandMonitor>,
    shutdown: watch::Receiver<bool>,
}

impl HandRunner {
    pub fn new(
        game_id: impl Into<String>,
        cfg: GameConfig,
        bots: Vec<Arc<Bot>>,
        monitor: Arc<dyn HandMonitor>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        HandRunner {
            game_id: game_id.into(),
            cfg,
            bots,
            monitor,
            shutdown,
        }
    }

    /// Play one hand to completion. Per-seat failures (timeouts,
    /// disconnects, illegal actions) fold that seat and the hand goes on;
    /// only a broken setup errors out.
    pub async fn run(mut self, hand_no: u64, button: usize, seed: u64) -> Result<HandOutcome> {
        let hand_id = format!("{}-{}", self.game_id, hand_no);
        let names: Vec<String> = self.bots.iter().map(|b| b.name.clone()).collect();
        let mut hand = HandState::new(
            &hand_id,
            seed,
            &names,
            button,
            self.cfg.small_blind,
            self.cfg.big_blind,
            self.cfg.start_chips,
        )?;

        let players: Vec<HandPlayer> = hand
            .seats
            .iter()
            .map(|s| HandPlayer { name: s.name.clone(), seat: s.seat, chips: s.chips })
            .collect();
        for (seat, bot) in self.bots.iter().enumerate() {
            let msg = ServerMsg::HandStart {
                hand_id: hand_id.clone(),
                players: players.clone(),
                button,
                your_seat: seat,
                small_blind: self.cfg.small_blind,
                big_blind: self.cfg.big_blind,
            };
            if let Err(e) = bot.try_send(msg) {
                tracing::debug!(hand = %hand_id, bot = %bot.id, error = %e, "hand_start dropped");
            }
        }
        self.monitor.on_hand_start(
            &hand_id,
            &players,
            button,
            self.cfg.small_blind,
            self.cfg.big_blind,
        );

        let mut actions_taken = 0u32;
        let mut street_reached = Street::Preflop;
        loop {
            for event in hand.advance_street_if_closed() {
                street_reached = event.street;
                self.broadcast(ServerMsg::StreetChange {
                    hand_id: hand_id.clone(),
                    street: event.street,
                    community_cards: event.community.clone(),
                });
                self.monitor
                    .on_street_change(&hand_id, event.street, &event.community);
            }
            if hand.is_complete() {
                break;
            }
            if *self.shutdown.borrow() {
                // Abandoned hand: nobody wins, nobody pays.
                tracing::info!(hand = %hand_id, "shutdown mid-hand, abandoning");
                return Ok(HandOutcome {
                    hand_id,
                    game_id: self.game_id.clone(),
                    seats: hand
                        .seats
                        .iter()
                        .map(|s| SeatOutcome {
                            bot_id: self.bots[s.seat].id.clone(),
                            name: s.name.clone(),
                            seat: s.seat,
                            delta: 0,
                            showed_down: false,
                        })
                        .collect(),
                    street_reached,
                    actions: actions_taken,
                    pot_size: hand.pot_total(),
                    board: hand.community.clone(),
                    winners: Vec::new(),
                    showdown: false,
                });
            }

            let seat = hand.active_seat;
            let bot = Arc::clone(&self.bots[seat]);
            actions_taken += 1;

            let decision = self.request_action(&hand, &bot).await;
            let applied = match decision {
                Decision::Act(action, amount) => {
                    if action == PokerAction::SitOut {
                        bot.set_sitting_out(true);
                    }
                    match hand.apply(seat, action, amount) {
                        Ok(applied) => applied,
                        Err(err) => {
                            self.reject_action(&hand, &bot, seat, err);
                            hand.force_fold(seat);
                            folded()
                        }
                    }
                }
                Decision::TimedOut => {
                    bot.note_timeout();
                    tracing::debug!(hand = %hand_id, seat, bot = %bot.id, "decision timeout");
                    hand.force_fold(seat);
                    folded()
                }
                Decision::Gone => {
                    tracing::debug!(hand = %hand_id, seat, bot = %bot.id, "seat unreachable");
                    hand.force_fold(seat);
                    folded()
                }
            };

            self.broadcast(ServerMsg::PlayerAction {
                hand_id: hand_id.clone(),
                seat,
                action: applied.action,
                amount: applied.amount,
                pot_after: hand.pot_total(),
            });
            let stack = hand.seat(seat).map(|s| s.chips).unwrap_or(0);
            self.monitor
                .on_player_action(&hand_id, seat, applied.action, applied.amount, stack);
            self.broadcast(ServerMsg::GameUpdate {
                hand_id: hand_id.clone(),
                street: hand.street,
                community_cards: hand.community.clone(),
                pot: hand.pot_total(),
                players: hand.snapshots(),
            });
        }

        let settlement = hand.settle();
        self.broadcast(ServerMsg::HandResult {
            hand_id: hand_id.clone(),
            winners: settlement.winners.clone(),
            pot_size: settlement.pot_size,
            final_board: settlement.board.clone(),
        });

        let seats = hand
            .seats
            .iter()
            .map(|s| SeatOutcome {
                bot_id: self.bots[s.seat].id.clone(),
                name: s.name.clone(),
                seat: s.seat,
                delta: settlement.deltas[s.seat],
                showed_down: settlement.showdown && !s.folded,
            })
            .collect();

        Ok(HandOutcome {
            hand_id,
            game_id: self.game_id.clone(),
            seats,
            street_reached,
            actions: actions_taken,
            pot_size: settlement.pot_size,
            board: settlement.board,
            winners: settlement.winners,
            showdown: settlement.showdown,
        })
    }

    /// Ask one bot for its decision and wait for the first of: a reply on
    /// the freshly installed mailbox, the deadline, the bot going away, or
    /// server shutdown.
    async fn request_action(&mut self, hand: &HandState, bot: &Arc<Bot>) -> Decision {
        // A closed session folds; so does a seat that sat out earlier in
        // the hand.
        if bot.is_closed() || bot.sitting_out() {
            return Decision::Gone;
        }

        let to_call = hand.to_call();
        let request = ServerMsg::ActionRequest {
            hand_id: hand.id.clone(),
            pot: hand.pot_total(),
            to_call,
            min_bet: hand.current_bet + hand.min_raise,
            min_raise: hand.min_raise,
            valid_actions: hand.valid_actions(),
            time_remaining: self.cfg.timeout.as_millis() as u64,
        };

        let mut mailbox = bot.install_mailbox();
        // Targeted delivery: if the request cannot reach the bot the turn
        // is forfeited, there is nothing to wait for.
        if let Err(e) = bot.send(request).await {
            tracing::debug!(bot = %bot.id, error = %e, "action_request undeliverable");
            bot.clear_mailbox();
            return Decision::Gone;
        }

        let deadline = tokio::time::sleep(self.cfg.timeout);
        tokio::pin!(deadline);
        let mut done = bot.done();

        let decision = tokio::select! {
            frame = mailbox.recv() => match frame {
                Some(frame) => Decision::Act(frame.action, frame.amount),
                None => Decision::Gone,
            },
            _ = &mut deadline => Decision::TimedOut,
            _ = done.wait_for(|closed| *closed) => Decision::Gone,
            _ = self.shutdown.wait_for(|stop| *stop) => Decision::Gone,
        };
        bot.clear_mailbox();
        decision
    }

    /// Tell an offending bot why its action was discarded.
    fn reject_action(&self, hand: &HandState, bot: &Arc<Bot>, seat: usize, err: ActionError) {
        bot.note_invalid_action();
        tracing::debug!(hand = %hand.id, seat, bot = %bot.id, error = %err, "invalid action");
        let _ = bot.try_send(ServerMsg::Error {
            code: "invalid_action".to_owned(),
            message: format!("{} ({})", err, err.code()),
        });
    }

    /// Non-blocking fan-out; a saturated queue skips this frame for that
    /// bot only.
    fn broadcast(&self, msg: ServerMsg) {
        for bot in &self.bots {
            if let Err(e) = bot.try_send(msg.clone()) {
                tracing::trace!(bot = %bot.id, error = %e, "broadcast frame skipped");
            }
        }
    }
}

fn folded() -> crate::game::Applied {
    crate::game::Applied { action: PokerAction::Fold, amount: 0, all_in: false }
}
