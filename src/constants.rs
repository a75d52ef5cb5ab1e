//! Constants for board geometry, search parameters, and match rules.
//!
//! Everything the engines and the match server treat as a tunable number
//! lives here so that the rest of the crate never hard-codes a magic value.

use std::time::Duration;

// =============================================================================
// Board Geometry
// =============================================================================

/// Side length of the capture game (othello) grid.
pub const OTHELLO_SIZE: usize = 8;

/// Number of cells on the capture game grid.
pub const OTHELLO_CELLS: usize = OTHELLO_SIZE * OTHELLO_SIZE;

/// Side length of the misère tic-tac-toe grid.
pub const TTTM_SIZE: usize = 3;

/// Offsets `(dx, dy)` to the eight neighboring cells.
/// Order: North, South, West, East, NW, NE, SW, SE
pub const DIRECTIONS: [(i32, i32); 8] = [
    (0, -1),  // North (up one row)
    (0, 1),   // South (down one row)
    (-1, 0),  // West (left one column)
    (1, 0),   // East (right one column)
    (-1, -1), // NW (diagonal)
    (1, -1),  // NE (diagonal)
    (-1, 1),  // SW (diagonal)
    (1, 1),   // SE (diagonal)
];

// =============================================================================
// Cell Characters (board text format)
// =============================================================================

/// Black mark (first player).
pub const MARK_BLACK: char = 'B';

/// White mark (second player).
pub const MARK_WHITE: char = 'W';

/// Empty cell.
pub const MARK_EMPTY: char = '.';

// =============================================================================
// Minimax Parameters
// =============================================================================

/// Depth value meaning "search until terminal states".
pub const UNBOUNDED_DEPTH: i32 = -1;

/// Default minimax depth for the capture game.
pub const OTHELLO_DEPTH: i32 = 4;

// =============================================================================
// MCTS (Monte Carlo Tree Search) Parameters
// =============================================================================

/// Reference exploration weight for UCB1 (sqrt 2).
pub const EXPLORATION_WEIGHT: f64 = std::f64::consts::SQRT_2;

/// Guards UCB division for unvisited children.
pub const UCB_EPSILON: f64 = 1e-6;

/// Default wall-clock budget of one MCTS move decision.
pub const MCTS_TIME_BUDGET: Duration = Duration::from_millis(1000);

/// Upper bound on plies in a single rollout; both supported games finish far sooner.
pub const MAX_ROLLOUT_PLIES: usize = OTHELLO_CELLS * 2;

// =============================================================================
// Match Rules
// =============================================================================

/// Consecutive illegal or timed-out turns before a player is disqualified.
pub const MAX_ILLEGAL_MOVES: u32 = 5;

/// Default per-move deadline.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Coordinate used for the sentinel "invalid" move; never inside any grid.
pub const INVALID_COORD: i32 = -1;
