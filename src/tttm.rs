//! Misère tic-tac-toe: the 3x3 marking game where completing a line loses.
//!
//! Turns strictly alternate; there is no passing. A state is terminal once a
//! line of three identical marks exists or the grid is full.

use std::fmt;

use crate::constants::{MARK_EMPTY, TTTM_SIZE};
use crate::error::{Error, Result};
use crate::game::{GameState, Move, Player};

const SIZE: i32 = TTTM_SIZE as i32;

/// Every row, column and diagonal as `(x, y)` triples.
const LINES: [[(i32, i32); 3]; 8] = [
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(2, 0), (1, 1), (0, 2)],
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Player>; TTTM_SIZE * TTTM_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse 3 lines of 3 characters from `B`, `W`, `.`.
    pub fn from_text(text: &str) -> Result<Self> {
        let rows: Vec<&str> = text.trim().lines().map(str::trim).collect();
        if rows.len() != TTTM_SIZE {
            return Err(Error::BoardRows {
                expected: TTTM_SIZE,
                got: rows.len(),
            });
        }
        let mut board = Self::new();
        for (y, row) in rows.iter().enumerate() {
            let len = row.chars().count();
            if len != TTTM_SIZE {
                return Err(Error::BoardRowLength {
                    row: y,
                    expected: TTTM_SIZE,
                    got: len,
                });
            }
            for (x, c) in row.chars().enumerate() {
                match Player::from_mark(c) {
                    Some(p) => board.place(Move::new(x as i32, y as i32), p),
                    None if c == MARK_EMPTY => {}
                    None => {
                        return Err(Error::InvalidCell {
                            character: c,
                            row: y,
                            col: x,
                        });
                    }
                }
            }
        }
        Ok(board)
    }

    fn idx(x: i32, y: i32) -> usize {
        (y * SIZE + x) as usize
    }

    pub fn is_within_bounds(&self, mv: Move) -> bool {
        (0..SIZE).contains(&mv.x) && (0..SIZE).contains(&mv.y)
    }

    pub fn get(&self, mv: Move) -> Option<Player> {
        if !self.is_within_bounds(mv) {
            return None;
        }
        self.cells[Self::idx(mv.x, mv.y)]
    }

    /// True if `mv` is on the board and unoccupied.
    pub fn is_empty_at(&self, mv: Move) -> bool {
        self.is_within_bounds(mv) && self.cells[Self::idx(mv.x, mv.y)].is_none()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Put a mark on the board; callers check legality first.
    pub fn place(&mut self, mv: Move, p: Player) {
        self.cells[Self::idx(mv.x, mv.y)] = Some(p);
    }

    /// Owner of a completed line, if any. Under the misère rule that player loses.
    pub fn loser(&self) -> Option<Player> {
        LINES.iter().find_map(|line| {
            let [a, b, c] = line.map(|(x, y)| self.cells[Self::idx(x, y)]);
            match a {
                Some(p) if b == a && c == a => Some(p),
                _ => None,
            }
        })
    }

    /// Board with coordinates; the last move is marked `*`.
    pub fn decorated(&self, last: Option<Move>) -> String {
        let mut out = String::from("x 0 1 2\n");
        for y in 0..SIZE {
            out.push_str(&y.to_string());
            for x in 0..SIZE {
                let mv = Move::new(x, y);
                out.push(if last == Some(mv) { '*' } else { ' ' });
                out.push(self.get(mv).map_or(MARK_EMPTY, Player::mark));
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..SIZE {
            for x in 0..SIZE {
                let ch = self.cells[Self::idx(x, y)].map_or(MARK_EMPTY, Player::mark);
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A misère tic-tac-toe board plus the player to move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TttmState {
    board: Board,
    player: Option<Player>,
}

impl Default for TttmState {
    fn default() -> Self {
        Self::new()
    }
}

impl TttmState {
    /// Empty board, Black to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            player: Some(Player::Black),
        }
    }

    /// Wrap a board with `to_move` to play; the player is `None` if the board is already over.
    pub fn from_board(board: Board, to_move: Player) -> Self {
        let player = if board.is_full() || board.loser().is_some() {
            None
        } else {
            Some(to_move)
        };
        Self { board, player }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
}

impl GameState for TttmState {
    fn player(&self) -> Option<Player> {
        self.player
    }

    fn is_terminal(&self) -> bool {
        self.board.is_full() || self.board.loser().is_some()
    }

    fn is_legal_move(&self, mv: Move) -> bool {
        self.player.is_some() && self.board.is_empty_at(mv)
    }

    /// Empty cells in row-major order.
    fn legal_moves(&self) -> Vec<Move> {
        if self.player.is_none() {
            return Vec::new();
        }
        (0..SIZE)
            .flat_map(|y| (0..SIZE).map(move |x| Move::new(x, y)))
            .filter(|&mv| self.board.is_empty_at(mv))
            .collect()
    }

    fn winner(&self) -> Option<Player> {
        self.board.loser().map(Player::opponent)
    }

    fn next_state(&self, mv: Move) -> Result<Self> {
        let Some(p) = self.player.filter(|_| self.board.is_empty_at(mv)) else {
            return Err(Error::IllegalMove {
                mv,
                player: self.player,
            });
        };
        let mut board = self.board.clone();
        board.place(mv, p);
        Ok(Self::from_board(board, p.opponent()))
    }

    fn score(&self, player: Player) -> i32 {
        match self.winner() {
            Some(w) if w == player => 1,
            Some(_) => -1,
            None => 0,
        }
    }

    fn text(&self) -> String {
        self.board.to_string()
    }

    fn render(&self, last: Option<Move>) -> String {
        self.board.decorated(last)
    }
}
