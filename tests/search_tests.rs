//! Integration tests for the search strategies.
//!
//! Alpha-beta is checked on a small hand-built game tree where the pruned
//! leaves are known, MCTS on a one-ply decision, and both on real games.

use std::cell::RefCell;

use advsearch::agent::{Agent, RandomAgent};
use advsearch::constants::UNBOUNDED_DEPTH;
use advsearch::error::{Error, Result};
use advsearch::evaluation::{othello_utility, tttm_utility};
use advsearch::game::{GameState, Move, Player};
use advsearch::mcts::{self, MctsConfig};
use advsearch::minimax::{minimax_move, search};
use advsearch::othello::OthelloState;
use advsearch::timer::CancelToken;
use advsearch::tttm::TttmState;

// =============================================================================
// Abstract game trees
// =============================================================================

/// Leaf utilities of the ternary depth-2 tree, left to right.
const LEAVES: [f64; 9] = [3.0, 12.0, 8.0, 2.0, 4.0, 6.0, 14.0, 5.0, 2.0];

/// Ternary tree of depth 2: node 0 is the root (MAX), 1..=3 the MIN nodes,
/// 4..=12 the leaves.
#[derive(Clone, Debug, PartialEq)]
struct TernaryTree {
    node: usize,
}

impl TernaryTree {
    fn leaf_index(&self) -> Option<usize> {
        self.node.checked_sub(4)
    }
}

impl GameState for TernaryTree {
    fn player(&self) -> Option<Player> {
        match self.node {
            0 => Some(Player::Black),
            1..=3 => Some(Player::White),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        self.node >= 4
    }

    fn is_legal_move(&self, mv: Move) -> bool {
        !self.is_terminal() && mv.y == 0 && (0..3).contains(&mv.x)
    }

    fn legal_moves(&self) -> Vec<Move> {
        if self.is_terminal() {
            Vec::new()
        } else {
            (0..3).map(|x| Move::new(x, 0)).collect()
        }
    }

    fn winner(&self) -> Option<Player> {
        None
    }

    fn next_state(&self, mv: Move) -> Result<Self> {
        if !self.is_legal_move(mv) {
            return Err(Error::IllegalMove {
                mv,
                player: self.player(),
            });
        }
        let i = mv.x as usize;
        let node = if self.node == 0 {
            1 + i
        } else {
            4 + 3 * (self.node - 1) + i
        };
        Ok(Self { node })
    }

    fn score(&self, _player: Player) -> i32 {
        0
    }

    fn text(&self) -> String {
        self.node.to_string()
    }

    fn render(&self, _last: Option<Move>) -> String {
        self.text()
    }
}

/// One decision for Black: move 0 wins, move 1 draws, move 2 loses.
#[derive(Clone, Debug, PartialEq)]
struct OnePly {
    chosen: Option<i32>,
}

impl GameState for OnePly {
    fn player(&self) -> Option<Player> {
        self.chosen.is_none().then_some(Player::Black)
    }

    fn is_terminal(&self) -> bool {
        self.chosen.is_some()
    }

    fn is_legal_move(&self, mv: Move) -> bool {
        self.chosen.is_none() && mv.y == 0 && (0..3).contains(&mv.x)
    }

    fn legal_moves(&self) -> Vec<Move> {
        if self.is_terminal() {
            Vec::new()
        } else {
            (0..3).map(|x| Move::new(x, 0)).collect()
        }
    }

    fn winner(&self) -> Option<Player> {
        match self.chosen {
            Some(0) => Some(Player::Black),
            Some(2) => Some(Player::White),
            _ => None,
        }
    }

    fn next_state(&self, mv: Move) -> Result<Self> {
        if !self.is_legal_move(mv) {
            return Err(Error::IllegalMove {
                mv,
                player: self.player(),
            });
        }
        Ok(Self { chosen: Some(mv.x) })
    }

    fn score(&self, player: Player) -> i32 {
        match self.winner() {
            Some(w) if w == player => 1,
            Some(_) => -1,
            None => 0,
        }
    }

    fn text(&self) -> String {
        format!("{:?}", self.chosen)
    }

    fn render(&self, _last: Option<Move>) -> String {
        self.text()
    }
}

// =============================================================================
// Minimax
// =============================================================================

#[test]
fn test_alpha_beta_prunes_known_leaves() {
    let evaluated = RefCell::new(Vec::new());
    let eval = |state: &TernaryTree, player: Player| {
        assert_eq!(player, Player::Black, "leaves are scored for the root player");
        let leaf = state.leaf_index().expect("only leaves are evaluated");
        evaluated.borrow_mut().push(leaf);
        LEAVES[leaf]
    };

    let (best, stats) = search(&TernaryTree { node: 0 }, 2, eval);

    // Left subtree fully, middle cut after its first leaf (2 <= 3), right
    // subtree needs all three leaves to drop below 3
    assert_eq!(*evaluated.borrow(), vec![0, 1, 2, 3, 6, 7, 8]);
    assert_eq!(stats.evaluations, 7);
    assert_eq!(best, Some(Move::new(0, 0)));
}

#[test]
fn test_alpha_beta_matches_plain_minimax_value() {
    // Reorder so the best subtree comes last; the choice must follow it
    let rotated = |state: &TernaryTree, _: Player| {
        let leaf = state.leaf_index().unwrap();
        LEAVES[(leaf + 3) % 9]
    };
    // Subtrees are now {2,4,6}, {14,5,2}, {3,12,8}
    assert_eq!(minimax_move(&TernaryTree { node: 0 }, 2, rotated), Some(Move::new(2, 0)));
}

#[test]
fn test_depth_limit_evaluates_inner_nodes() {
    let evaluated = RefCell::new(Vec::new());
    let eval = |state: &TernaryTree, _: Player| {
        evaluated.borrow_mut().push(state.node);
        state.node as f64
    };
    let best = minimax_move(&TernaryTree { node: 0 }, 1, eval);
    assert_eq!(*evaluated.borrow(), vec![1, 2, 3]);
    assert_eq!(best, Some(Move::new(2, 0)));
}

#[test]
fn test_minimax_deterministic_on_othello() {
    let mut state = OthelloState::new();
    for _ in 0..6 {
        let first = minimax_move(&state, 4, othello_utility);
        let second = minimax_move(&state, 4, othello_utility);
        assert_eq!(first, second);
        let mv = first.unwrap();
        assert!(state.is_legal_move(mv));
        state = state.next_state(mv).unwrap();
    }
}

#[test]
fn test_unbounded_minimax_never_loses_tttm() {
    // Misère tic-tac-toe is a draw under perfect play
    for seed in 0..4 {
        let opponent = RandomAgent::new(Some(seed));
        for minimax_side in Player::ALL {
            let mut state = TttmState::new();
            while let Some(player) = state.player() {
                let mv = if player == minimax_side {
                    minimax_move(&state, UNBOUNDED_DEPTH, tttm_utility).unwrap()
                } else {
                    opponent.make_move(state.clone(), &CancelToken::new()).unwrap()
                };
                state = state.next_state(mv).unwrap();
            }
            assert_ne!(
                state.winner(),
                Some(minimax_side.opponent()),
                "minimax as {minimax_side} lost with seed {seed}:\n{}",
                state.text()
            );
        }
    }
}

// =============================================================================
// MCTS
// =============================================================================

#[test]
fn test_mcts_finds_winning_move_one_ply() {
    for seed in 0..10 {
        let config = MctsConfig::with_iterations(500, seed);
        let mv = mcts::search(&OnePly { chosen: None }, &config, &CancelToken::new()).unwrap();
        assert_eq!(mv, Some(Move::new(0, 0)), "seed {seed}");
    }
}

#[test]
fn test_mcts_terminal_root() {
    let config = MctsConfig::with_iterations(10, 0);
    let mv = mcts::search(&OnePly { chosen: Some(1) }, &config, &CancelToken::new()).unwrap();
    assert_eq!(mv, None);
}

#[test]
fn test_mcts_avoids_immediate_loss_tttm() {
    // Black to move; (2,0) completes the top row and loses on the spot,
    // every other move keeps the game going
    let board = advsearch::tttm::Board::from_text("BB.\n...\nWW.").unwrap();
    let state = TttmState::from_board(board, Player::Black);
    let config = MctsConfig::with_iterations(3000, 21);
    let mv = mcts::search(&state, &config, &CancelToken::new()).unwrap().unwrap();
    assert!(state.is_legal_move(mv));
    assert_ne!(mv, Move::new(2, 0));
}
