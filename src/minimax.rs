//! Depth-bounded minimax search with alpha-beta pruning.
//!
//! The search is generic over any [`GameState`] and takes the evaluation
//! function as a parameter, so the same code plays every game with any
//! heuristic. Leaves (depth cutoff or terminal states) are scored from the
//! point of view of the player to move at the root.
//!
//! A node is a MAX node when the player to move there is the root player and
//! a MIN node otherwise. With strict alternation this is the usual MAX/MIN
//! ping-pong; when a player has to pass, the mover simply stays in its role.
//!
//! [`search_cancellable`] polls a [`CancelToken`] at every node. Once it is
//! raised, remaining nodes are scored by the evaluation function directly and
//! the search unwinds with the best root move found so far.
//!
//! # Example
//!
//! ```
//! use advsearch::evaluation::othello_count;
//! use advsearch::minimax::minimax_move;
//! use advsearch::othello::OthelloState;
//!
//! let state = OthelloState::new();
//! let best = minimax_move(&state, 3, othello_count);
//! assert!(best.is_some());
//! ```

use tracing::debug;

use crate::game::{GameState, Move, Player};
use crate::timer::CancelToken;

/// Counters collected during one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Nodes visited, root excluded
    pub nodes: u64,
    /// Calls to the evaluation function
    pub evaluations: u64,
}

struct Minimax<'a, S, F> {
    player: Player,
    eval: &'a F,
    cancel: Option<&'a CancelToken>,
    stats: SearchStats,
    _state: std::marker::PhantomData<fn(&S)>,
}

impl<S, F> Minimax<'_, S, F>
where
    S: GameState,
    F: Fn(&S, Player) -> f64,
{
    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    fn is_cutoff(&self, state: &S, depth: i32) -> bool {
        depth == 0 || state.is_terminal() || self.is_cancelled()
    }

    fn evaluate(&mut self, state: &S) -> f64 {
        self.stats.evaluations += 1;
        (self.eval)(state, self.player)
    }

    /// Value of a successor state, dispatching on who moves there.
    fn value(&mut self, state: &S, alpha: f64, beta: f64, depth: i32) -> f64 {
        self.stats.nodes += 1;
        if state.player() == Some(self.player) {
            self.max_value(state, alpha, beta, depth)
        } else {
            self.min_value(state, alpha, beta, depth)
        }
    }

    fn max_value(&mut self, state: &S, mut alpha: f64, beta: f64, depth: i32) -> f64 {
        if self.is_cutoff(state, depth) {
            return self.evaluate(state);
        }
        let mut v = f64::NEG_INFINITY;
        for mv in state.legal_moves() {
            let Ok(next) = state.next_state(mv) else {
                continue;
            };
            v = v.max(self.value(&next, alpha, beta, depth - 1));
            if v >= beta {
                return v;
            }
            alpha = alpha.max(v);
        }
        v
    }

    fn min_value(&mut self, state: &S, alpha: f64, mut beta: f64, depth: i32) -> f64 {
        if self.is_cutoff(state, depth) {
            return self.evaluate(state);
        }
        let mut v = f64::INFINITY;
        for mv in state.legal_moves() {
            let Ok(next) = state.next_state(mv) else {
                continue;
            };
            v = v.min(self.value(&next, alpha, beta, depth - 1));
            if v <= alpha {
                return v;
            }
            beta = beta.min(v);
        }
        v
    }
}

/// Run alpha-beta from `state` and return the best move with search statistics.
///
/// `max_depth` counts plies; [`crate::constants::UNBOUNDED_DEPTH`] (-1)
/// searches to terminal states and is only sensible for short games.
/// Among moves of equal value the first one enumerated wins.
/// Returns `None` if `state` is terminal or has no legal move.
pub fn search<S, F>(state: &S, max_depth: i32, eval: F) -> (Option<Move>, SearchStats)
where
    S: GameState,
    F: Fn(&S, Player) -> f64,
{
    run(state, max_depth, &eval, None)
}

/// [`search`] that gives up as soon as `cancel` is raised.
///
/// A cancelled search still returns the best root move among those scored
/// so far (the first legal move if none was), so callers always get an
/// answer quickly.
pub fn search_cancellable<S, F>(
    state: &S,
    max_depth: i32,
    eval: F,
    cancel: &CancelToken,
) -> (Option<Move>, SearchStats)
where
    S: GameState,
    F: Fn(&S, Player) -> f64,
{
    run(state, max_depth, &eval, Some(cancel))
}

fn run<S, F>(
    state: &S,
    max_depth: i32,
    eval: &F,
    cancel: Option<&CancelToken>,
) -> (Option<Move>, SearchStats)
where
    S: GameState,
    F: Fn(&S, Player) -> f64,
{
    let Some(player) = state.player() else {
        return (None, SearchStats::default());
    };
    let mut search = Minimax {
        player,
        eval,
        cancel,
        stats: SearchStats::default(),
        _state: std::marker::PhantomData,
    };

    let mut alpha = f64::NEG_INFINITY;
    let beta = f64::INFINITY;
    let mut best = None;
    for mv in state.legal_moves() {
        let Ok(next) = state.next_state(mv) else {
            continue;
        };
        let v = search.value(&next, alpha, beta, max_depth - 1);
        if best.is_none() || v > alpha {
            alpha = v;
            best = Some(mv);
        }
        if search.is_cancelled() {
            break;
        }
    }

    debug!(
        player = %player,
        cancelled = search.is_cancelled(),
        depth = max_depth,
        nodes = search.stats.nodes,
        evaluations = search.stats.evaluations,
        best = ?best,
        value = alpha,
        "minimax search finished"
    );
    (best, search.stats)
}

/// Best move for the player to move in `state`; see [`search`].
pub fn minimax_move<S, F>(state: &S, max_depth: i32, eval: F) -> Option<Move>
where
    S: GameState,
    F: Fn(&S, Player) -> f64,
{
    search(state, max_depth, eval).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::UNBOUNDED_DEPTH;
    use crate::evaluation::{othello_count, othello_mask, tttm_utility};
    use crate::othello::{Board, OthelloState};
    use crate::tttm::{self, TttmState};

    #[test]
    fn test_ties_go_to_first_move() {
        let state = OthelloState::new();
        let first = state.legal_moves()[0];
        assert_eq!(minimax_move(&state, 2, |_, _| 0.0), Some(first));
        assert_eq!(first, Move::new(2, 3));
    }

    #[test]
    fn test_deterministic() {
        let state = OthelloState::new()
            .next_state(Move::new(3, 2))
            .unwrap()
            .next_state(Move::new(2, 2))
            .unwrap();
        let a = search(&state, 3, othello_mask);
        let b = search(&state, 3, othello_mask);
        assert_eq!(a, b);
        assert!(a.0.is_some());
    }

    #[test]
    fn test_depth_one_is_greedy() {
        // Black at (0,0) can take the whole top row run in one move
        let text = "\
BWWWW...
........
........
...WB...
...BW...
........
........
........";
        let state = OthelloState::from_board(Board::from_text(text).unwrap(), Player::Black);
        assert_eq!(minimax_move(&state, 1, othello_count), Some(Move::new(5, 0)));
    }

    #[test]
    fn test_terminal_root_has_no_move() {
        let full = "BBBBBBBB\n".repeat(8);
        let state = OthelloState::from_board(Board::from_text(&full).unwrap(), Player::Black);
        assert_eq!(search(&state, 3, othello_count), (None, SearchStats::default()));
    }

    #[test]
    fn test_depth_zero_children_are_leaves() {
        let state = OthelloState::new();
        let (_, stats) = search(&state, 1, othello_count);
        assert_eq!(stats.nodes, 4);
        assert_eq!(stats.evaluations, 4);
    }

    #[test]
    fn test_cancelled_search_stops_early() {
        let state = OthelloState::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let (best, stats) = search_cancellable(&state, 12, othello_count, &cancel);
        // Only the first root child is scored, straight from the evaluation
        assert_eq!(best, Some(state.legal_moves()[0]));
        assert_eq!(stats.nodes, 1);
        assert_eq!(stats.evaluations, 1);
    }

    #[test]
    fn test_uncancelled_token_changes_nothing() {
        let state = OthelloState::new().next_state(Move::new(3, 2)).unwrap();
        let cancel = CancelToken::new();
        assert_eq!(
            search_cancellable(&state, 3, othello_mask, &cancel),
            search(&state, 3, othello_mask)
        );
    }

    #[test]
    fn test_tttm_avoids_completing_a_line() {
        // Black to move; (2,0) completes Black's top row and loses
        let board = tttm::Board::from_text("BB.\nW.W\n.W.").unwrap();
        let state = TttmState::from_board(board, Player::Black);
        let mv = minimax_move(&state, UNBOUNDED_DEPTH, tttm_utility).unwrap();
        assert_ne!(mv, Move::new(2, 0));
    }
}
