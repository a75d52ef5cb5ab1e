//! Monte Carlo Tree Search (MCTS) with UCB1 selection.
//!
//! Each iteration runs the classic four phases:
//! - Selection: descend through fully expanded nodes by UCB1
//! - Expansion: add one child for a random untried move
//! - Simulation: random playout to a terminal state
//! - Backpropagation: add the reward to every node on the path
//!
//! Rewards are always measured for the player to move at the root. The tree
//! lives in an arena (`Vec<Node>`) indexed by [`NodeId`], so parent links are
//! plain indices and the whole tree is dropped at once when the search ends.

use std::time::{Duration, Instant};

use fastrand::Rng;
use tracing::{debug, trace};

use crate::constants::{EXPLORATION_WEIGHT, MCTS_TIME_BUDGET, UCB_EPSILON};
use crate::error::Result;
use crate::game::{GameState, Move, Player};
use crate::playout::{reward, rollout};
use crate::timer::CancelToken;

/// Index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Parent of the root.
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// A node in the search tree.
#[derive(Debug, Clone)]
pub struct Node<S> {
    /// Game state reached at this node
    pub state: S,
    /// Parent node (`NodeId::NONE` for the root)
    pub parent: NodeId,
    /// Expanded children
    pub children: Vec<NodeId>,
    /// Move that led here from the parent
    pub mv: Option<Move>,
    /// Legal moves not yet expanded into children
    pub untried: Vec<Move>,
    /// Number of iterations through this node
    pub visits: u32,
    /// Accumulated reward for the root player
    pub value: f64,
}

impl<S: GameState> Node<S> {
    fn new(state: S, parent: NodeId, mv: Option<Move>) -> Self {
        let untried = state.legal_moves();
        Self {
            state,
            parent,
            children: Vec::new(),
            mv,
            untried,
            visits: 0,
            value: 0.0,
        }
    }
}

impl<S> Node<S> {
    /// True once every legal move has a child.
    #[inline]
    pub fn is_fully_expanded(&self) -> bool {
        self.untried.is_empty()
    }

    /// Average reward, 0 for unvisited nodes.
    pub fn mean_value(&self) -> f64 {
        if self.visits > 0 {
            self.value / self.visits as f64
        } else {
            0.0
        }
    }
}

/// UCB1 score of a child whose parent has `parent_visits` visits.
fn ucb<S>(child: &Node<S>, parent_visits: u32, exploration: f64) -> f64 {
    let visits = child.visits as f64 + UCB_EPSILON;
    let exploitation = child.value / visits;
    let parent = parent_visits.max(1) as f64;
    exploitation + exploration * (parent.ln() / visits).sqrt()
}

/// Arena-allocated search tree.
#[derive(Debug, Clone)]
pub struct Tree<S> {
    nodes: Vec<Node<S>>,
}

impl<S: GameState> Tree<S> {
    /// Create a tree holding only the root state.
    pub fn new(root_state: S) -> Self {
        Self {
            nodes: vec![Node::new(root_state, NodeId::NONE, None)],
        }
    }

    /// Add a child of `parent` for `mv` and return its id.
    ///
    /// The move is removed from the parent's untried list if present.
    ///
    /// # Errors
    /// [`crate::error::Error::IllegalMove`] if `mv` is illegal in the parent state.
    pub fn add_child(&mut self, parent: NodeId, mv: Move) -> Result<NodeId> {
        let state = self.get(parent).state.next_state(mv)?;
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(state, parent, Some(mv)));

        let parent_node = self.get_mut(parent);
        parent_node.untried.retain(|&m| m != mv);
        parent_node.children.push(id);
        Ok(id)
    }
}

impl<S> Tree<S> {
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<S> {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child of `id` maximizing UCB1, first one on ties.
    pub fn select_child(&self, id: NodeId, exploration: f64) -> Option<NodeId> {
        let node = self.get(id);
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &node.children {
            let score = ucb(self.get(child), node.visits, exploration);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((child, score));
            }
        }
        best.map(|(child, _)| child)
    }

    /// Add one visit and `reward` to `id` and each of its ancestors.
    pub fn backpropagate(&mut self, id: NodeId, reward: f64) {
        let mut current = id;
        while !current.is_none() {
            let node = self.get_mut(current);
            node.visits += 1;
            node.value += reward;
            current = node.parent;
        }
    }

    /// Most visited child of `id`, first one on ties.
    pub fn best_child(&self, id: NodeId) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        for &child in &self.get(id).children {
            if best.is_none_or(|b| self.get(child).visits > self.get(b).visits) {
                best = Some(child);
            }
        }
        best
    }
}

/// When a search stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    /// Wall-clock budget measured from the start of the search
    Time(Duration),
    /// Fixed number of iterations
    Iterations(u32),
}

/// MCTS tuning parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig {
    pub limit: SearchLimit,
    /// UCB1 exploration weight
    pub exploration: f64,
    /// Seed for rollouts and expansion; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            limit: SearchLimit::Time(MCTS_TIME_BUDGET),
            exploration: EXPLORATION_WEIGHT,
            seed: None,
        }
    }
}

impl MctsConfig {
    /// Iteration-bounded configuration with a fixed seed, for reproducible searches.
    pub fn with_iterations(iterations: u32, seed: u64) -> Self {
        Self {
            limit: SearchLimit::Iterations(iterations),
            seed: Some(seed),
            ..Self::default()
        }
    }
}

/// One select/expand/simulate/backpropagate pass.
fn iterate<S: GameState>(
    tree: &mut Tree<S>,
    player: Player,
    exploration: f64,
    rng: &mut Rng,
) -> Result<()> {
    let mut node = tree.root();
    while tree.get(node).is_fully_expanded() {
        let Some(child) = tree.select_child(node, exploration) else {
            break;
        };
        node = child;
    }

    let untried = &mut tree.get_mut(node).untried;
    if !untried.is_empty() {
        let mv = untried.swap_remove(rng.usize(..untried.len()));
        node = tree.add_child(node, mv)?;
    }

    let terminal = rollout(&tree.get(node).state, rng)?;
    tree.backpropagate(node, reward(&terminal, player));
    Ok(())
}

/// Run MCTS from `state` and return the most visited root move.
///
/// Stops when the configured limit is reached or `cancel` fires. Always
/// returns a legal move for a non-terminal state: if no iteration finished,
/// the first legal move is returned. `None` only for terminal states.
///
/// # Errors
/// Propagates game errors from expansion or rollouts.
pub fn search<S: GameState>(
    state: &S,
    config: &MctsConfig,
    cancel: &CancelToken,
) -> Result<Option<Move>> {
    let Some(player) = state.player() else {
        return Ok(None);
    };
    let Some(&fallback) = state.legal_moves().first() else {
        return Ok(None);
    };

    let mut rng = match config.seed {
        Some(seed) => Rng::with_seed(seed),
        None => Rng::new(),
    };
    let mut tree = Tree::new(state.clone());
    let start = Instant::now();
    let mut iterations = 0u32;

    loop {
        let exhausted = match config.limit {
            SearchLimit::Time(budget) => start.elapsed() >= budget,
            SearchLimit::Iterations(n) => iterations >= n,
        };
        if exhausted || cancel.is_cancelled() {
            break;
        }
        iterate(&mut tree, player, config.exploration, &mut rng)?;
        iterations += 1;
    }

    let root = tree.root();
    for &child in &tree.get(root).children {
        let node = tree.get(child);
        trace!(
            mv = ?node.mv,
            visits = node.visits,
            mean = node.mean_value(),
            "root child"
        );
    }

    let best = tree.best_child(root).and_then(|id| tree.get(id).mv);
    debug!(
        player = %player,
        iterations,
        nodes = tree.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        best = ?best,
        "mcts search finished"
    );
    Ok(best.or(Some(fallback)))
}
