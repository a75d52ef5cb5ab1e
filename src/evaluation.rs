//! Static evaluation functions for minimax.
//!
//! Each function scores a state from the point of view of `player`: higher
//! is better for `player`, and swapping the player negates the score. They
//! are plain `fn` items so a minimax agent can be paired with any of them.

use crate::game::{GameState, Player};
use crate::othello::OthelloState;
use crate::tttm::TttmState;

/// Signature shared by every evaluation function.
pub type EvalFn<S> = fn(&S, Player) -> f64;

/// Positional weights for the othello grid, indexed `[y][x]`.
/// Corners are worth the most; the cells next to them give corners away.
pub const OTHELLO_MASK: [[i32; 8]; 8] = [
    [100, -20, 10, 5, 5, 10, -20, 100],
    [-20, -50, -2, -2, -2, -2, -50, -20],
    [10, -2, -1, -1, -1, -1, -2, 10],
    [5, -2, -1, -1, -1, -1, -2, 5],
    [5, -2, -1, -1, -1, -1, -2, 5],
    [10, -2, -1, -1, -1, -1, -2, 10],
    [-20, -50, -2, -2, -2, -2, -50, -20],
    [100, -20, 10, 5, 5, 10, -20, 100],
];

/// Value of a decided othello game, large enough to dominate any heuristic.
pub const OTHELLO_WIN: f64 = 1000.0;

/// Weight of one extra legal move in `othello_utility`.
const MOBILITY_WEIGHT: f64 = 5.0;

/// Piece difference.
pub fn othello_count(state: &OthelloState, player: Player) -> f64 {
    let board = state.board();
    board.num_pieces(player) as f64 - board.num_pieces(player.opponent()) as f64
}

/// Sum of mask weights of `player`'s pieces minus the opponent's.
pub fn othello_mask(state: &OthelloState, player: Player) -> f64 {
    let board = state.board();
    let mut total = 0;
    for (y, row) in OTHELLO_MASK.iter().enumerate() {
        for (x, &weight) in row.iter().enumerate() {
            match board.get((x as i32, y as i32).into()) {
                Some(p) if p == player => total += weight,
                Some(_) => total -= weight,
                None => {}
            }
        }
    }
    total as f64
}

/// Exact value on terminal states, mask plus mobility otherwise.
pub fn othello_utility(state: &OthelloState, player: Player) -> f64 {
    if state.is_terminal() {
        return match state.winner() {
            Some(w) if w == player => OTHELLO_WIN,
            Some(_) => -OTHELLO_WIN,
            None => 0.0,
        };
    }
    let board = state.board();
    let mobility = board.legal_moves(player).len() as f64
        - board.legal_moves(player.opponent()).len() as f64;
    othello_mask(state, player) + MOBILITY_WEIGHT * mobility
}

/// +1 if `player` won, -1 if they lost, 0 otherwise.
pub fn tttm_utility(state: &TttmState, player: Player) -> f64 {
    match state.winner() {
        Some(w) if w == player => 1.0,
        Some(_) => -1.0,
        None => 0.0,
    }
}
