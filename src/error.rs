//! Error types for the advsearch crate.

use thiserror::Error;

use crate::game::{Move, Player};

/// Main error type for the advsearch crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("illegal move {mv} for {}", player_label(.player))]
    IllegalMove { mv: Move, player: Option<Player> },

    #[error("board text has {got} rows, expected {expected}")]
    BoardRows { expected: usize, got: usize },

    #[error("board row {row} has {got} cells, expected {expected}")]
    BoardRowLength {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("invalid character '{character}' at row {row}, column {col}")]
    InvalidCell {
        character: char,
        row: usize,
        col: usize,
    },

    #[error("invalid move text '{0}' (expected 'x,y')")]
    InvalidMoveText(String),

    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an I/O error with a short description of what was being attempted.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            operation: operation.into(),
            source,
        }
    }
}

fn player_label(player: &Option<Player>) -> String {
    match player {
        Some(p) => format!("player {p}"),
        None => "a terminal state".to_string(),
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;
