//! Match history log and end-of-match report.
//!
//! The history log is plain text, one `x,y,mark` line per accepted move,
//! flushed as the match goes. The report is a JSON document written once
//! at the end:
//!
//! ```json
//! {
//!   "timing": { "start": 1700000000, "finish": 1700000042 },
//!   "players": [
//!     { "directory": "minimax(depth=4)", "color": "B", "result": "win", "score": 40,
//!       "disqualified": false },
//!     { "directory": "random", "color": "W", "result": "loss", "score": 24,
//!       "disqualified": false }
//!   ],
//!   "moves": [ { "coord": "2,3", "color": "B" } ]
//! }
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::game::Player;
use crate::server::{HistoryEntry, MatchOutcome, MatchResult};

/// Append-only match history file.
#[derive(Debug)]
pub struct HistoryLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl HistoryLog {
    /// Create (or truncate) the history file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .map_err(|e| Error::io(format!("create history log {}", path.display()), e))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Write one accepted move and flush it to disk.
    pub fn append(&mut self, entry: &HistoryEntry) -> Result<()> {
        writeln!(self.writer, "{},{}", entry.mv, entry.player)
            .and_then(|_| self.writer.flush())
            .map_err(|e| Error::io(format!("write history log {}", self.path.display()), e))
    }
}

/// Match start and finish, in seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timing {
    pub start: u64,
    pub finish: u64,
}

/// Standing of one player at the end of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
    Win,
    Loss,
    Draw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerResult {
    /// Agent label
    pub directory: String,
    pub color: String,
    pub result: Standing,
    pub score: i32,
    pub disqualified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub coord: String,
    pub color: String,
}

/// Structured summary of a finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub timing: Timing,
    pub players: Vec<PlayerResult>,
    pub moves: Vec<MoveRecord>,
}

fn unix_seconds(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

impl MatchReport {
    pub fn from_result(result: &MatchResult) -> Self {
        let winner = result.outcome.winner();
        let players = Player::ALL
            .iter()
            .map(|&p| PlayerResult {
                directory: result.name(p).to_string(),
                color: p.to_string(),
                result: match winner {
                    Some(w) if w == p => Standing::Win,
                    Some(_) => Standing::Loss,
                    None => Standing::Draw,
                },
                score: result.score(p),
                disqualified: result.outcome == MatchOutcome::Disqualified(p),
            })
            .collect();
        let moves = result
            .history
            .iter()
            .map(|entry| MoveRecord {
                coord: entry.mv.to_string(),
                color: entry.player.to_string(),
            })
            .collect();

        Self {
            timing: Timing {
                start: unix_seconds(result.started),
                finish: unix_seconds(result.finished),
            },
            players,
            moves,
        }
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| Error::io(format!("create report {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)
            .and_then(|_| writer.flush())
            .map_err(|e| Error::io(format!("write report {}", path.display()), e))
    }
}
