//! Monte Carlo playouts (random game simulation).
//!
//! A playout plays uniformly random legal moves until the game ends, then
//! scores the final state for the player that owns the search.

use fastrand::Rng;

use crate::constants::MAX_ROLLOUT_PLIES;
use crate::error::Result;
use crate::game::{GameState, Player};

/// Play random legal moves from `state` and return the final state.
///
/// Stops at a terminal state or after [`MAX_ROLLOUT_PLIES`] plies, whichever
/// comes first. The input state is left untouched.
///
/// # Errors
/// Propagates [`crate::error::Error::IllegalMove`] if the game rejects one of
/// its own legal moves, which indicates a broken game implementation.
pub fn rollout<S: GameState>(state: &S, rng: &mut Rng) -> Result<S> {
    let mut current = state.clone();
    for _ in 0..MAX_ROLLOUT_PLIES {
        let moves = current.legal_moves();
        if current.is_terminal() || moves.is_empty() {
            break;
        }
        let mv = moves[rng.usize(..moves.len())];
        current = current.next_state(mv)?;
    }
    Ok(current)
}

/// Reward of a finished playout: 1 if `player` won, 0 for a loss or draw.
#[inline]
pub fn reward<S: GameState>(terminal: &S, player: Player) -> f64 {
    if terminal.winner() == Some(player) {
        1.0
    } else {
        0.0
    }
}
