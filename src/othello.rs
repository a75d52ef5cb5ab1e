//! Othello board engine and game state.
//!
//! This module provides the core rules of the 8x8 capture game:
//! - Board representation with per-mark piece counters
//! - Bracket detection and flipping in all eight directions
//! - Legal move generation with a memoized per-mark cache
//! - Terminal detection, scoring, and the pass rule
//!
//! Coordinates are `(x, y)` = (column, row), `x` growing to the right and `y`
//! growing downwards. The initial board is:
//!
//! ```text
//! ........
//! ........
//! ........
//! ...WB...
//! ...BW...
//! ........
//! ........
//! ........
//! ```

use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::fmt;

use crate::constants::{DIRECTIONS, MARK_EMPTY, OTHELLO_CELLS, OTHELLO_SIZE};
use crate::error::{Error, Result};
use crate::game::{GameState, Move, Player};

const SIZE: i32 = OTHELLO_SIZE as i32;

/// An othello board.
///
/// Invariants:
/// - `piece_count[p]` always equals the number of cells holding `p`.
/// - `legal[p]` is either empty or exactly equal to a fresh computation of
///   `p`'s legal moves; every mutation clears both caches.
#[derive(Clone, Debug)]
pub struct Board {
    cells: [Option<Player>; OTHELLO_CELLS],
    piece_count: [usize; 2],
    legal: [OnceCell<BTreeSet<Move>>; 2],
    /// Cells changed by the last move (placed cell and flips), for display only.
    flipped: Vec<Move>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Board {}

impl Board {
    /// Create the standard starting position.
    pub fn new() -> Self {
        let mut board = Self::empty();
        board.set(3, 3, Player::White);
        board.set(4, 3, Player::Black);
        board.set(3, 4, Player::Black);
        board.set(4, 4, Player::White);
        board
    }

    fn empty() -> Self {
        Self {
            cells: [None; OTHELLO_CELLS],
            piece_count: [0; 2],
            legal: Default::default(),
            flipped: Vec::new(),
        }
    }

    /// Parse a board from its text form: 8 lines of 8 characters from `B`, `W`, `.`.
    ///
    /// Leading/trailing blank space around the block and each line is ignored.
    pub fn from_text(text: &str) -> Result<Self> {
        let rows: Vec<&str> = text.trim().lines().map(str::trim).collect();
        if rows.len() != OTHELLO_SIZE {
            return Err(Error::BoardRows {
                expected: OTHELLO_SIZE,
                got: rows.len(),
            });
        }

        let mut board = Self::empty();
        for (y, row) in rows.iter().enumerate() {
            let len = row.chars().count();
            if len != OTHELLO_SIZE {
                return Err(Error::BoardRowLength {
                    row: y,
                    expected: OTHELLO_SIZE,
                    got: len,
                });
            }
            for (x, c) in row.chars().enumerate() {
                match Player::from_mark(c) {
                    Some(p) => board.set(x as i32, y as i32, p),
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

    #[inline]
    fn idx(x: i32, y: i32) -> usize {
        (y * SIZE + x) as usize
    }

    /// Place a piece without applying any rule. Only used while building boards.
    fn set(&mut self, x: i32, y: i32, p: Player) {
        let i = Self::idx(x, y);
        if let Some(old) = self.cells[i] {
            self.piece_count[old.index()] -= 1;
        }
        self.cells[i] = Some(p);
        self.piece_count[p.index()] += 1;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.legal = Default::default();
    }

    /// Return whether the move refers to a cell on the board.
    #[inline]
    pub fn is_within_bounds(&self, mv: Move) -> bool {
        (0..SIZE).contains(&mv.x) && (0..SIZE).contains(&mv.y)
    }

    /// Content of a cell, `None` if empty or out of bounds.
    pub fn get(&self, mv: Move) -> Option<Player> {
        if !self.is_within_bounds(mv) {
            return None;
        }
        self.cells[Self::idx(mv.x, mv.y)]
    }

    /// Number of pieces of the given mark.
    #[inline]
    pub fn num_pieces(&self, p: Player) -> usize {
        self.piece_count[p.index()]
    }

    /// Number of empty cells.
    #[inline]
    pub fn num_empty(&self) -> usize {
        OTHELLO_CELLS - self.piece_count[0] - self.piece_count[1]
    }

    /// Cells changed by the most recent `apply_move`.
    pub fn flipped(&self) -> &[Move] {
        &self.flipped
    }

    /// Walk from `from` in direction `(dx, dy)` over a run of opponent pieces.
    ///
    /// Returns the first cell after the run. `None` if the run is empty or the
    /// walk leaves the board.
    fn end_of_run(
        &self,
        from: Move,
        p: Player,
        (dx, dy): (i32, i32),
    ) -> Option<(Move, Option<Player>)> {
        let opp = Some(p.opponent());
        let mut x = from.x + dx;
        let mut y = from.y + dy;
        if !(0..SIZE).contains(&x)
            || !(0..SIZE).contains(&y)
            || self.cells[Self::idx(x, y)] != opp
        {
            return None;
        }
        while self.cells[Self::idx(x, y)] == opp {
            x += dx;
            y += dy;
            if !(0..SIZE).contains(&x) || !(0..SIZE).contains(&y) {
                return None;
            }
        }
        Some((Move::new(x, y), self.cells[Self::idx(x, y)]))
    }

    /// Find the piece of `p` that brackets opponent pieces when `p` plays `mv`.
    fn find_bracket(&self, mv: Move, p: Player, dir: (i32, i32)) -> Option<Move> {
        match self.end_of_run(mv, p, dir) {
            Some((end, Some(owner))) if owner == p => Some(end),
            _ => None,
        }
    }

    /// Dual of `find_bracket`: from a piece `p` owns, find the empty cell
    /// beyond a run of opponent pieces.
    fn find_empty_from_owned(&self, owned: Move, p: Player, dir: (i32, i32)) -> Option<Move> {
        match self.end_of_run(owned, p, dir) {
            Some((end, None)) => Some(end),
            _ => None,
        }
    }

    /// Legal moves for `p`, computed once and cached until the next mutation.
    pub fn legal_moves(&self, p: Player) -> &BTreeSet<Move> {
        self.legal[p.index()].get_or_init(|| {
            if self.num_pieces(p) > self.num_empty() {
                self.legal_moves_dense(p)
            } else {
                self.legal_moves_sparse(p)
            }
        })
    }

    /// Legal moves found by testing every empty cell for a bracket.
    /// Cheaper when empty cells are scarce.
    pub fn legal_moves_dense(&self, p: Player) -> BTreeSet<Move> {
        let mut moves = BTreeSet::new();
        for y in 0..SIZE {
            for x in 0..SIZE {
                if self.cells[Self::idx(x, y)].is_some() {
                    continue;
                }
                let mv = Move::new(x, y);
                if DIRECTIONS.iter().any(|&d| self.find_bracket(mv, p, d).is_some()) {
                    moves.insert(mv);
                }
            }
        }
        moves
    }

    /// Legal moves found by looking outward from every piece `p` owns.
    /// Cheaper when `p` has few pieces.
    pub fn legal_moves_sparse(&self, p: Player) -> BTreeSet<Move> {
        let mut moves = BTreeSet::new();
        for y in 0..SIZE {
            for x in 0..SIZE {
                if self.cells[Self::idx(x, y)] != Some(p) {
                    continue;
                }
                for &d in &DIRECTIONS {
                    if let Some(mv) = self.find_empty_from_owned(Move::new(x, y), p, d) {
                        moves.insert(mv);
                    }
                }
            }
        }
        moves
    }

    pub fn has_legal_move(&self, p: Player) -> bool {
        !self.legal_moves(p).is_empty()
    }

    pub fn is_legal(&self, mv: Move, p: Player) -> bool {
        self.legal_moves(p).contains(&mv)
    }

    /// Place a piece of `p` at `mv` and flip every bracketed opponent run.
    ///
    /// Returns `false` without touching the board if the move is illegal.
    pub fn apply_move(&mut self, mv: Move, p: Player) -> bool {
        if !self.is_legal(mv, p) {
            return false;
        }

        self.flipped.clear();
        let opp = p.opponent();
        let i = Self::idx(mv.x, mv.y);
        self.cells[i] = Some(p);
        self.piece_count[p.index()] += 1;
        self.flipped.push(mv);

        for &(dx, dy) in &DIRECTIONS {
            let Some(end) = self.find_bracket(mv, p, (dx, dy)) else {
                continue;
            };
            let (mut x, mut y) = (mv.x + dx, mv.y + dy);
            while (x, y) != (end.x, end.y) {
                self.cells[Self::idx(x, y)] = Some(p);
                self.piece_count[p.index()] += 1;
                self.piece_count[opp.index()] -= 1;
                self.flipped.push(Move::new(x, y));
                x += dx;
                y += dy;
            }
        }

        self.invalidate();
        true
    }

    /// True iff neither mark has a legal move.
    pub fn is_terminal(&self) -> bool {
        !self.has_legal_move(Player::Black) && !self.has_legal_move(Player::White)
    }

    /// Player with more pieces, `None` on a tie. Only meaningful on a terminal board.
    pub fn winner(&self) -> Option<Player> {
        let black = self.num_pieces(Player::Black);
        let white = self.num_pieces(Player::White);
        match black.cmp(&white) {
            std::cmp::Ordering::Greater => Some(Player::Black),
            std::cmp::Ordering::Less => Some(Player::White),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Board with coordinates; the last move and flipped pieces are marked `*`.
    pub fn decorated(&self, last: Option<Move>) -> String {
        let mut out = String::from("x 0 1 2 3 4 5 6 7\n");
        for y in 0..SIZE {
            out.push_str(&y.to_string());
            for x in 0..SIZE {
                let mv = Move::new(x, y);
                let marked = last.is_some() && (last == Some(mv) || self.flipped.contains(&mv));
                out.push(if marked { '*' } else { ' ' });
                out.push(cell_char(self.cells[Self::idx(x, y)]));
            }
            out.push('\n');
        }
        out
    }
}

fn cell_char(cell: Option<Player>) -> char {
    cell.map_or(MARK_EMPTY, Player::mark)
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..SIZE {
            for x in 0..SIZE {
                write!(f, "{}", cell_char(self.cells[Self::idx(x, y)]))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// An othello board plus the player to move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OthelloState {
    board: Board,
    player: Option<Player>,
}

impl Default for OthelloState {
    fn default() -> Self {
        Self::new()
    }
}

impl OthelloState {
    /// Starting position, Black to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            player: Some(Player::Black),
        }
    }

    /// Wrap an arbitrary board, preferring `to_move` but handing the turn to
    /// whoever actually has a move (`None` if nobody does).
    pub fn from_board(board: Board, to_move: Player) -> Self {
        let player = next_player(&board, to_move);
        Self { board, player }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
}

/// Pass rule: `candidate` moves if able, else the other player, else nobody.
fn next_player(board: &Board, candidate: Player) -> Option<Player> {
    if board.has_legal_move(candidate) {
        Some(candidate)
    } else if board.has_legal_move(candidate.opponent()) {
        Some(candidate.opponent())
    } else {
        None
    }
}

impl GameState for OthelloState {
    fn player(&self) -> Option<Player> {
        self.player
    }

    fn is_terminal(&self) -> bool {
        self.board.is_terminal()
    }

    fn is_legal_move(&self, mv: Move) -> bool {
        self.player.is_some_and(|p| self.board.is_legal(mv, p))
    }

    fn legal_moves(&self) -> Vec<Move> {
        match self.player {
            Some(p) => self.board.legal_moves(p).iter().copied().collect(),
            None => Vec::new(),
        }
    }

    fn winner(&self) -> Option<Player> {
        if self.is_terminal() {
            self.board.winner()
        } else {
            None
        }
    }

    fn next_state(&self, mv: Move) -> Result<Self> {
        let illegal = || Error::IllegalMove {
            mv,
            player: self.player,
        };
        let p = self.player.ok_or_else(illegal)?;
        let mut board = self.board.clone();
        if !board.apply_move(mv, p) {
            return Err(illegal());
        }
        let player = next_player(&board, p.opponent());
        Ok(Self { board, player })
    }

    fn score(&self, player: Player) -> i32 {
        self.board.num_pieces(player) as i32
    }

    fn text(&self) -> String {
        self.board.to_string()
    }

    fn render(&self, last: Option<Move>) -> String {
        self.board.decorated(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "\
........
........
........
...WB...
...BW...
........
........
........
";

    /// Build a random board text where roughly `fill` of the cells are occupied.
    fn random_board(rng: &mut fastrand::Rng, fill: f64) -> Board {
        let mut text = String::new();
        for _ in 0..OTHELLO_SIZE {
            for _ in 0..OTHELLO_SIZE {
                let c = if rng.f64() < fill {
                    if rng.bool() { 'B' } else { 'W' }
                } else {
                    '.'
                };
                text.push(c);
            }
            text.push('\n');
        }
        Board::from_text(&text).unwrap()
    }

    /// Brute-force reference: every empty cell with a bracket in some direction.
    fn brute_force_moves(board: &Board, p: Player) -> BTreeSet<Move> {
        let mut moves = BTreeSet::new();
        for y in 0..SIZE {
            for x in 0..SIZE {
                let mv = Move::new(x, y);
                if board.get(mv).is_none()
                    && DIRECTIONS.iter().any(|&d| board.find_bracket(mv, p, d).is_some())
                {
                    moves.insert(mv);
                }
            }
        }
        moves
    }

    fn count_cells(board: &Board, p: Player) -> usize {
        let mut n = 0;
        for y in 0..SIZE {
            for x in 0..SIZE {
                if board.get(Move::new(x, y)) == Some(p) {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn test_initial_board() {
        let board = Board::new();
        assert_eq!(board.num_pieces(Player::Black), 2);
        assert_eq!(board.num_pieces(Player::White), 2);
        assert_eq!(board.num_empty(), 60);
        assert_eq!(board.to_string(), START);
    }

    #[test]
    fn test_initial_legal_moves() {
        let board = Board::new();
        let expected: BTreeSet<Move> = [(3, 2), (2, 3), (5, 4), (4, 5)]
            .into_iter()
            .map(Move::from)
            .collect();
        assert_eq!(board.legal_moves(Player::Black), &expected);
        assert_eq!(board.legal_moves(Player::White).len(), 4);
    }

    #[test]
    fn test_text_roundtrip() {
        let board = Board::from_text(START).unwrap();
        assert_eq!(board, Board::new());
        assert_eq!(board.to_string(), START);

        let odd = "BBBBBBB.\nBBWWWWBB\nBWBWWBBB\nBWWWBBBB\nBWBBBBBB\nBWBWBBBB\nBBWWBBBB\nBBBWBBBB\n";
        let parsed = Board::from_text(&format!("\n  {odd}  \n")).unwrap();
        assert_eq!(parsed.to_string(), odd);
        assert_eq!(parsed.num_pieces(Player::Black), 47);
        assert_eq!(parsed.num_pieces(Player::White), 16);
    }

    #[test]
    fn test_from_text_rejects_bad_input() {
        let short_row = START.replacen("...WB...", "...WB..", 1);
        assert!(matches!(
            Board::from_text(&short_row),
            Err(Error::BoardRowLength { row: 3, expected: 8, got: 7 })
        ));

        let bad_char = START.replacen("...WB...", "...WX...", 1);
        assert!(matches!(
            Board::from_text(&bad_char),
            Err(Error::InvalidCell { character: 'X', row: 3, col: 4 })
        ));

        let missing_row = "........\n".repeat(7);
        assert!(matches!(
            Board::from_text(&missing_row),
            Err(Error::BoardRows { expected: 8, got: 7 })
        ));
    }

    #[test]
    fn test_first_move_flips_single_piece() {
        let mut board = Board::new();
        assert!(board.apply_move(Move::new(3, 2), Player::Black));

        // (3,3) was White, bracketed by the new piece and Black's (3,4)
        assert_eq!(board.get(Move::new(3, 3)), Some(Player::Black));
        assert_eq!(board.num_pieces(Player::Black), 4);
        assert_eq!(board.num_pieces(Player::White), 1);
        assert_eq!(board.flipped(), &[Move::new(3, 2), Move::new(3, 3)]);
    }

    #[test]
    fn test_multi_direction_capture() {
        let text = "\
B.B.B...
.WWW....
BW.WB...
.WWW....
B.B.B...
........
........
........
";
        let mut board = Board::from_text(text).unwrap();
        assert!(board.apply_move(Move::new(2, 2), Player::Black));
        assert_eq!(board.num_pieces(Player::White), 0);
        assert_eq!(board.num_pieces(Player::Black), 17);
    }

    #[test]
    fn test_illegal_move_leaves_board_untouched() {
        let mut board = Board::new();
        let before = board.clone();
        assert!(!board.apply_move(Move::new(0, 0), Player::Black));
        assert!(!board.apply_move(Move::new(3, 3), Player::Black)); // occupied
        assert!(!board.apply_move(Move::INVALID, Player::Black));
        assert_eq!(board, before);
        assert_eq!(board.num_pieces(Player::Black), 2);
    }

    #[test]
    fn test_cache_invalidated_after_move() {
        let mut board = Board::new();
        let black_before = board.legal_moves(Player::Black).clone();
        let _ = board.legal_moves(Player::White);
        assert!(board.apply_move(Move::new(3, 2), Player::Black));

        assert_ne!(board.legal_moves(Player::Black), &black_before);
        assert_eq!(board.legal_moves(Player::Black), &brute_force_moves(&board, Player::Black));
        assert_eq!(board.legal_moves(Player::White), &brute_force_moves(&board, Player::White));
    }

    #[test]
    fn test_dense_and_sparse_agree() {
        let mut rng = fastrand::Rng::with_seed(7);
        for fill in [0.1, 0.3, 0.5, 0.7, 0.9, 0.97] {
            for _ in 0..200 {
                let board = random_board(&mut rng, fill);
                for p in Player::ALL {
                    let dense = board.legal_moves_dense(p);
                    let sparse = board.legal_moves_sparse(p);
                    assert_eq!(dense, sparse, "fill {fill}, player {p}\n{board}");
                    assert_eq!(&dense, board.legal_moves(p));
                    assert_eq!(dense, brute_force_moves(&board, p));
                }
            }
        }
    }

    #[test]
    fn test_counters_match_grid_during_random_games() {
        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..20 {
            let mut state = OthelloState::new();
            while let Some(p) = state.player() {
                let moves = state.legal_moves();
                let mv = moves[rng.usize(..moves.len())];
                let next = state.next_state(mv).unwrap();

                let board = next.board();
                assert_eq!(board.num_pieces(Player::Black), count_cells(board, Player::Black));
                assert_eq!(board.num_pieces(Player::White), count_cells(board, Player::White));
                assert_eq!(
                    board.num_pieces(Player::Black) + board.num_pieces(Player::White) + board.num_empty(),
                    OTHELLO_CELLS
                );
                // One placed piece, no piece ever removed
                assert_eq!(
                    board.num_pieces(p),
                    state.board().num_pieces(p) + board.flipped().len()
                );
                state = next;
            }
            assert!(state.is_terminal());
            assert!(state.legal_moves().is_empty());
        }
    }

    #[test]
    fn test_next_state_is_a_new_value() {
        let state = OthelloState::new();
        let next = state.next_state(Move::new(3, 2)).unwrap();
        assert_eq!(state, OthelloState::new());
        assert_eq!(next.player(), Some(Player::White));
        assert_eq!(next.score(Player::Black), 4);
        assert_eq!(next.score(Player::White), 1);
    }

    #[test]
    fn test_next_state_rejects_illegal_move() {
        let state = OthelloState::new();
        assert!(!state.is_legal_move(Move::new(0, 0)));
        assert!(matches!(
            state.next_state(Move::new(0, 0)),
            Err(Error::IllegalMove { player: Some(Player::Black), .. })
        ));
    }

    #[test]
    fn test_pass_gives_turn_back_to_mover() {
        let text = "\
WB......
........
........
........
........
........
........
WB......
";
        let board = Board::from_text(text).unwrap();
        // Black has no move, so the turn goes to White
        let state = OthelloState::from_board(board, Player::Black);
        assert_eq!(state.player(), Some(Player::White));

        let state = state.next_state(Move::new(2, 0)).unwrap();
        assert_eq!(state.player(), Some(Player::White), "Black must pass");
        assert!(!state.is_terminal());

        let state = state.next_state(Move::new(2, 7)).unwrap();
        assert_eq!(state.player(), None);
        assert!(state.is_terminal());
        assert_eq!(state.winner(), Some(Player::White));
        assert_eq!(state.score(Player::Black), 0);
    }

    #[test]
    fn test_winner_compares_counts() {
        let full_draw = "BBBBBBBB\n".repeat(4) + &"WWWWWWWW\n".repeat(4);
        let board = Board::from_text(&full_draw).unwrap();
        assert!(board.is_terminal());
        assert_eq!(board.winner(), None);

        let state = OthelloState::from_board(board, Player::Black);
        assert_eq!(state.player(), None);
        assert_eq!(state.winner(), None);
    }

    #[test]
    fn test_decorated_marks_last_move() {
        let state = OthelloState::new().next_state(Move::new(3, 2)).unwrap();
        let rendered = state.render(Some(Move::new(3, 2)));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "x 0 1 2 3 4 5 6 7");
        assert_eq!(lines[3], "2 . . .*B . . . .");
        assert_eq!(lines[4], "3 . . .*B B . . .");
    }
}
