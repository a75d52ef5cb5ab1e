//! advsearch: adversarial search agents and a timed match server.
//!
//! This crate provides two-player board games behind a common state
//! contract, two search strategies that play any of them, and an
//! orchestrator that runs matches between agents under per-move deadlines.
//!
//! ## Modules
//!
//! - [`constants`] - Board dimensions, search defaults and match limits
//! - [`error`] - Library error type
//! - [`game`] - Players, moves and the [`game::GameState`] contract
//! - [`othello`] - The 8x8 capture game with cached legal moves
//! - [`tttm`] - Misère tic-tac-toe
//! - [`evaluation`] - Scoring functions for minimax
//! - [`minimax`] - Alpha-beta minimax search
//! - [`playout`] - Random game simulation for MCTS
//! - [`mcts`] - Monte Carlo Tree Search over an arena tree
//! - [`agent`] - Agent trait, concrete agents and agent specs
//! - [`timer`] - Deadline-bounded agent calls
//! - [`server`] - The match orchestrator
//! - [`report`] - History log and match report
//!
//! ## Example
//!
//! ```
//! use advsearch::evaluation::othello_mask;
//! use advsearch::game::GameState;
//! use advsearch::minimax::minimax_move;
//! use advsearch::othello::OthelloState;
//!
//! // Start a game and let minimax answer the opening move
//! let state = OthelloState::new();
//! let state = state.next_state("3,2".parse().unwrap()).unwrap();
//!
//! let reply = minimax_move(&state, 3, othello_mask).unwrap();
//! println!("White plays {reply}");
//! assert!(state.is_legal_move(reply));
//! ```

pub mod agent;
pub mod constants;
pub mod error;
pub mod evaluation;
pub mod game;
pub mod mcts;
pub mod minimax;
pub mod othello;
pub mod playout;
pub mod report;
pub mod server;
pub mod timer;
pub mod tttm;
