//! Hand-history persistence: one JSONL line per completed hand.
//!
//! Records are self-contained (seats, every action with its street, board,
//! winners), so a hand can be replayed or audited without the server.

use std::collections::HashMap;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use felt_shared::{Card, HandPlayer, PokerAction, Street, WinnerEntry};

use super::HandMonitor;
use crate::runner::HandOutcome;

/// One action as it will appear in the history line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionRecord {
    pub seat: usize,
    pub street: Street,
    pub action: PokerAction,
    pub amount: u32,
}

/// Complete record of one hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandRecord {
    pub hand_id: String,
    pub game_id: String,
    pub button: usize,
    pub small_blind: u32,
    pub big_blind: u32,
    pub players: Vec<HandPlayer>,
    pub actions: Vec<ActionRecord>,
    pub board: Vec<Card>,
    pub winners: Vec<WinnerEntry>,
    pub pot_size: u32,
    pub street_reached: Street,
    pub showdown: bool,
}

#[derive(Debug)]
struct HandInProgress {
    button: usize,
    small_blind: u32,
    big_blind: u32,
    players: Vec<HandPlayer>,
    actions: Vec<ActionRecord>,
    street: Street,
}

#[derive(Debug)]
struct HistoryState {
    writer: BufWriter<File>,
    open_hands: HashMap<String, HandInProgress>,
}

/// A [`HandMonitor`] that appends finished hands to a JSONL file.
#[derive(Debug)]
pub struct HistoryMonitor {
    state: Mutex<HistoryState>,
}

impl HistoryMonitor {
    /// Open (or create) the history file in append mode.
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(HistoryMonitor {
            state: Mutex::new(HistoryState {
                writer: BufWriter::new(file),
                open_hands: HashMap::new(),
            }),
        })
    }

    fn write_record(state: &mut HistoryState, record: &HandRecord) {
        match serde_json::to_string(record) {
            Ok(line) => {
                if let Err(e) = writeln!(state.writer, "{}", line) {
                    tracing::error!(error = %e, hand = %record.hand_id, "history write failed");
                }
                if let Err(e) = state.writer.flush() {
                    tracing::error!(error = %e, "history flush failed");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, hand = %record.hand_id, "history encode failed");
            }
        }
    }
}

impl HandMonitor for HistoryMonitor {
    fn on_hand_start(
        &self,
        hand_id: &str,
        players: &[HandPlayer],
        button: usize,
        small_blind: u32,
        big_blind: u32,
    ) {
        let mut state = self.state.lock().unwrap();
        state.open_hands.insert(
            hand_id.to_owned(),
            HandInProgress {
                button,
                small_blind,
                big_blind,
                players: players.to_vec(),
                actions: Vec::new(),
                street: Street::Preflop,
            },
        );
    }

    fn on_player_action(
        &self,
        hand_id: &str,
        seat: usize,
        action: PokerAction,
        amount: u32,
        _stack: u32,
    ) {
        let mut state = self.state.lock().unwrap();
        if let Some(hand) = state.open_hands.get_mut(hand_id) {
            let street = hand.street;
            hand.actions.push(ActionRecord { seat, street, action, amount });
        }
    }

    fn on_street_change(&self, hand_id: &str, street: Street, _cards: &[Card]) {
        let mut state = self.state.lock().unwrap();
        if let Some(hand) = state.open_hands.get_mut(hand_id) {
            hand.street = street;
        }
    }

    fn on_hand_complete(&self, outcome: &HandOutcome) {
        let mut state = self.state.lock().unwrap();
        let Some(hand) = state.open_hands.remove(&outcome.hand_id) else {
            return;
        };
        let record = HandRecord {
            hand_id: outcome.hand_id.clone(),
            game_id: outcome.game_id.clone(),
            button: hand.button,
            small_blind: hand.small_blind,
            big_blind: hand.big_blind,
            players: hand.players,
            actions: hand.actions,
            board: outcome.board.clone(),
            winners: outcome.winners.clone(),
            pot_size: outcome.pot_size,
            street_reached: outcome.street_reached,
            showdown: outcome.showdown,
        };
        Self::write_record(&mut state, &record);
    }
}

/// Read a JSONL history file back into records. Lines that fail to parse
/// are skipped with a warning so one torn write cannot poison a replay.
pub fn read_history<P: AsRef<Path>>(path: P) -> std::io::Result<Vec<HandRecord>> {
    use std::io::BufRead;

    let file = File::open(path)?;
    let mut records = Vec::new();
    for (lineno, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HandRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(line = lineno + 1, error = %e, "skipping undecodable history line");
            }
        }
    }
    Ok(records)
}

/// Aggregates over a history file, for the `felt-bot history` command.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistorySummary {
    pub hands: usize,
    pub showdowns: usize,
    pub total_pot: u64,
    pub biggest_pot: u32,
    /// Hands won per player name (a split counts for every winner).
    pub wins_by_name: Vec<(String, u64)>,
}

impl HistorySummary {
    pub fn from_records(records: &[HandRecord]) -> Self {
        let mut summary = HistorySummary { hands: records.len(), ..Default::default() };
        let mut wins: HashMap<String, u64> = HashMap::new();
        for record in records {
            if record.showdown {
                summary.showdowns += 1;
            }
            summary.total_pot += record.pot_size as u64;
            summary.biggest_pot = summary.biggest_pot.max(record.pot_size);
            for winner in &record.winners {
                if let Some(player) = record.players.iter().find(|p| p.seat == winner.seat) {
                    *wins.entry(player.name.clone()).or_default() += 1;
                }
            }
        }
        summary.wins_by_name = wins.into_iter().collect();
        summary.wins_by_name.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        summary
    }
}
