//! The game contract shared by every board engine.
//!
//! Search agents and the match server only ever see a [`GameState`]: a board
//! paired with the player to move. Each game (othello, misère tic-tac-toe)
//! supplies its own board and implements the trait, so search code never
//! depends on game specifics.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::constants::{INVALID_COORD, MARK_BLACK, MARK_WHITE};
use crate::error::{Error, Result};

/// One of the two players, identified by the mark they place.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Player {
    Black,
    White,
}

impl Player {
    /// Both players in turn order.
    pub const ALL: [Player; 2] = [Player::Black, Player::White];

    /// Return the other player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    /// Character used for this player's cells in the board text format.
    #[inline]
    pub fn mark(self) -> char {
        match self {
            Player::Black => MARK_BLACK,
            Player::White => MARK_WHITE,
        }
    }

    /// Parse a board-text mark; `None` for anything but `B` or `W`.
    pub fn from_mark(c: char) -> Option<Player> {
        match c {
            MARK_BLACK => Some(Player::Black),
            MARK_WHITE => Some(Player::White),
            _ => None,
        }
    }

    /// Index into per-player arrays (Black = 0, White = 1).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Player::Black => 0,
            Player::White => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mark())
    }
}

/// A move: a pair of integer coordinates, `x` growing left to right (column)
/// and `y` growing top to bottom (row).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    pub x: i32,
    pub y: i32,
}

impl Move {
    /// Sentinel that is never legal in any game.
    pub const INVALID: Move = Move {
        x: INVALID_COORD,
        y: INVALID_COORD,
    };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl From<(i32, i32)> for Move {
    fn from((x, y): (i32, i32)) -> Self {
        Move::new(x, y)
    }
}

impl FromStr for Move {
    type Err = Error;

    /// Parse `"x,y"` (surrounding whitespace and parentheses tolerated).
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let mut parts = trimmed.split(',');
        let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::InvalidMoveText(s.to_string()));
        };
        match (x.trim().parse::<i32>(), y.trim().parse::<i32>()) {
            (Ok(x), Ok(y)) => Ok(Move::new(x, y)),
            _ => Err(Error::InvalidMoveText(s.to_string())),
        }
    }
}

/// Final result of a game from the board's point of view.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Win(Player),
    Draw,
}

impl Outcome {
    /// Decide the outcome by comparing both players' scores.
    pub fn from_scores(black: i32, white: i32) -> Self {
        match black.cmp(&white) {
            std::cmp::Ordering::Greater => Outcome::Win(Player::Black),
            std::cmp::Ordering::Less => Outcome::Win(Player::White),
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }

    pub fn winner(self) -> Option<Player> {
        match self {
            Outcome::Win(p) => Some(p),
            Outcome::Draw => None,
        }
    }
}

/// Uniform state contract implemented by every game.
///
/// States are values: [`GameState::next_state`] returns a fresh state and
/// never mutates `self`, and `Clone` is a deep, independent copy. This is what
/// lets the match server hand agents a private copy without any locking.
pub trait GameState: Clone + Send + 'static {
    /// Player to move; `None` when no player can move (terminal).
    fn player(&self) -> Option<Player>;

    fn is_terminal(&self) -> bool;

    fn is_legal_move(&self, mv: Move) -> bool;

    /// Legal moves for the player to move, in a deterministic order.
    fn legal_moves(&self) -> Vec<Move>;

    /// Winner of a terminal state; `None` for a draw or an unfinished game.
    fn winner(&self) -> Option<Player>;

    /// Apply `mv` for the player to move and return the successor state.
    ///
    /// After the move the opponent moves next if they have a legal move,
    /// otherwise the mover moves again if they can, otherwise the successor
    /// is terminal and has no player.
    ///
    /// # Errors
    /// [`Error::IllegalMove`] if `is_legal_move(mv)` is false.
    fn next_state(&self, mv: Move) -> Result<Self>;

    /// Match score of `player` (piece count, or +1/-1/0 for win/loss/draw games).
    fn score(&self, player: Player) -> i32;

    /// Board in the plain text format (one character per cell).
    fn text(&self) -> String;

    /// Human-readable board with coordinates, highlighting `last` if given.
    fn render(&self, last: Option<Move>) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_roundtrip() {
        for p in Player::ALL {
            assert_ne!(p, p.opponent());
            assert_eq!(p, p.opponent().opponent());
        }
    }

    #[test]
    fn test_mark_parse() {
        assert_eq!(Player::from_mark('B'), Some(Player::Black));
        assert_eq!(Player::from_mark('W'), Some(Player::White));
        assert_eq!(Player::from_mark('.'), None);
        assert_eq!(Player::from_mark('x'), None);
    }

    #[test]
    fn test_move_from_str() {
        assert_eq!("3,2".parse::<Move>().unwrap(), Move::new(3, 2));
        assert_eq!(" (4, 5)\n".parse::<Move>().unwrap(), Move::new(4, 5));
        assert_eq!("-1,-1".parse::<Move>().unwrap(), Move::INVALID);
        assert!("3".parse::<Move>().is_err());
        assert!("a,b".parse::<Move>().is_err());
        assert!("1,2,3".parse::<Move>().is_err());
        assert!("1.5,2".parse::<Move>().is_err());
    }

    #[test]
    fn test_outcome_from_scores() {
        assert_eq!(Outcome::from_scores(40, 24), Outcome::Win(Player::Black));
        assert_eq!(Outcome::from_scores(-1, 1), Outcome::Win(Player::White));
        assert_eq!(Outcome::from_scores(32, 32), Outcome::Draw);
        assert_eq!(Outcome::Draw.winner(), None);
    }
}
