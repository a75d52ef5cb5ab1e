//! Timed match orchestrator.
//!
//! A [`Match`] owns the canonical game state and drives two agents through
//! alternating turns. Each turn the agent to move gets a private copy of the
//! state and a wall-clock deadline:
//!
//! - a legal answer is applied and recorded in the history
//! - an illegal answer, no answer, or a timeout is a strike; the state is
//!   left unchanged and the same player is asked again
//! - [`MatchConfig::max_illegal`] consecutive strikes disqualify the player
//!
//! The match ends when the state is terminal (higher score wins) or a player
//! is disqualified (the opponent wins).
//!
//! ## Example
//!
//! ```
//! use advsearch::agent::{build_tttm_agent, AgentSpec};
//! use advsearch::server::Match;
//! use advsearch::tttm::TttmState;
//!
//! let black = build_tttm_agent(&AgentSpec::Random, Some(1)).unwrap();
//! let white = build_tttm_agent(&AgentSpec::Random, Some(2)).unwrap();
//! let mut game = Match::new(TttmState::new(), black, white);
//! let result = game.run().unwrap();
//! assert!(!result.history.is_empty());
//! ```

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::constants::{DEFAULT_DEADLINE, MAX_ILLEGAL_MOVES};
use crate::error::Result;
use crate::game::{GameState, Move, Outcome, Player};
use crate::report::HistoryLog;
use crate::timer::{CallResult, call_with_timeout};

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Wall-clock limit for one move decision
    pub deadline: Duration,
    /// Minimum duration of an accepted turn; the remainder is slept
    pub pace: Duration,
    /// Consecutive strikes before disqualification
    pub max_illegal: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            pace: Duration::ZERO,
            max_illegal: MAX_ILLEGAL_MOVES,
        }
    }
}

/// One accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub mv: Move,
    pub player: Player,
}

/// What happened in a single call to [`Match::play_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The move was legal and has been applied
    Accepted(Move),
    /// The agent answered with an illegal (or malformed) move
    Illegal(Move),
    /// The agent timed out, crashed, or declined to move
    NoMove,
    /// The match was already over; nothing was done
    Finished,
}

/// Notable things that happen during a match, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// `player` had no legal move and the opponent moves again
    Pass { player: Player },
    TimedOut { player: Player, strikes: u32 },
    Illegal { player: Player, mv: Move, strikes: u32 },
    Disqualified { player: Player },
}

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Decided on the final position
    Finished(Outcome),
    /// `player` reached the strike limit and lost
    Disqualified(Player),
}

impl MatchOutcome {
    pub fn winner(self) -> Option<Player> {
        match self {
            MatchOutcome::Finished(outcome) => outcome.winner(),
            MatchOutcome::Disqualified(p) => Some(p.opponent()),
        }
    }
}

/// Everything the reporting side needs once a match is over.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    /// Agent labels, indexed by [`Player::index`]
    pub names: [String; 2],
    /// Final scores, indexed by [`Player::index`]
    pub scores: [i32; 2],
    pub history: Vec<HistoryEntry>,
    pub events: Vec<MatchEvent>,
    pub started: SystemTime,
    pub finished: SystemTime,
    /// Final board in the plain text format
    pub final_board: String,
}

impl MatchResult {
    pub fn score(&self, player: Player) -> i32 {
        self.scores[player.index()]
    }

    pub fn name(&self, player: Player) -> &str {
        &self.names[player.index()]
    }
}

/// A match between two agents over one game.
pub struct Match<S: GameState> {
    state: S,
    agents: [Arc<dyn Agent<S>>; 2],
    config: MatchConfig,
    strikes: [u32; 2],
    history: Vec<HistoryEntry>,
    events: Vec<MatchEvent>,
    disqualified: Option<Player>,
    history_log: Option<HistoryLog>,
    started: SystemTime,
}

impl<S: GameState> Match<S> {
    /// Create a match with the default configuration.
    pub fn new(state: S, black: Arc<dyn Agent<S>>, white: Arc<dyn Agent<S>>) -> Self {
        Self::with_config(state, black, white, MatchConfig::default())
    }

    pub fn with_config(
        state: S,
        black: Arc<dyn Agent<S>>,
        white: Arc<dyn Agent<S>>,
        config: MatchConfig,
    ) -> Self {
        Self {
            state,
            agents: [black, white],
            config,
            strikes: [0; 2],
            history: Vec::new(),
            events: Vec::new(),
            disqualified: None,
            history_log: None,
            started: SystemTime::now(),
        }
    }

    /// Append every accepted move to `log` as it happens.
    pub fn with_history_log(mut self, log: HistoryLog) -> Self {
        self.history_log = Some(log);
        self
    }

    /// Canonical state (read-only).
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn events(&self) -> &[MatchEvent] {
        &self.events
    }

    /// Current consecutive strikes of `player`.
    pub fn strikes(&self, player: Player) -> u32 {
        self.strikes[player.index()]
    }

    pub fn is_over(&self) -> bool {
        self.disqualified.is_some() || self.state.is_terminal() || self.state.player().is_none()
    }

    /// Play turns until the match is over and return the result.
    ///
    /// # Errors
    /// Only I/O failures of the history log; agent misbehavior is part of
    /// the match, not an error.
    pub fn run(&mut self) -> Result<MatchResult> {
        self.started = SystemTime::now();
        info!(
            black = %self.agents[0].name(),
            white = %self.agents[1].name(),
            deadline_ms = self.config.deadline.as_millis() as u64,
            "match started"
        );
        debug!("initial board\n{}", self.state.render(None));

        while !self.is_over() {
            self.play_turn()?;
        }

        let result = self.result();
        match result.outcome {
            MatchOutcome::Finished(Outcome::Win(p)) => {
                info!(
                    winner = %p,
                    name = %result.name(p),
                    black = result.scores[0],
                    white = result.scores[1],
                    "match finished"
                );
            }
            MatchOutcome::Finished(Outcome::Draw) => {
                info!(black = result.scores[0], white = result.scores[1], "match drawn");
            }
            MatchOutcome::Disqualified(p) => {
                info!(loser = %p, name = %result.name(p), "match ended by disqualification");
            }
        }
        Ok(result)
    }

    /// Ask the player to move for one decision and apply it if legal.
    pub fn play_turn(&mut self) -> Result<TurnOutcome> {
        if self.is_over() {
            return Ok(TurnOutcome::Finished);
        }
        let Some(player) = self.state.player() else {
            return Ok(TurnOutcome::Finished);
        };

        let turn_start = Instant::now();
        let agent = Arc::clone(&self.agents[player.index()]);
        let call = call_with_timeout(agent, self.state.clone(), self.config.deadline);

        let outcome = match call {
            CallResult::Returned(Some(mv)) if self.state.is_legal_move(mv) => {
                self.accept(player, mv)?;
                TurnOutcome::Accepted(mv)
            }
            CallResult::Returned(Some(mv)) => {
                let strikes = self.strike(player);
                warn!(player = %player, mv = %mv, strikes, "illegal move");
                self.events.push(MatchEvent::Illegal { player, mv, strikes });
                TurnOutcome::Illegal(mv)
            }
            CallResult::Returned(None) | CallResult::TimedOut | CallResult::Panicked => {
                let strikes = self.strike(player);
                match call {
                    CallResult::Panicked => warn!(player = %player, strikes, "agent crashed"),
                    _ => warn!(player = %player, strikes, "no move before the deadline"),
                }
                self.events.push(MatchEvent::TimedOut { player, strikes });
                TurnOutcome::NoMove
            }
        };

        if self.strikes[player.index()] >= self.config.max_illegal {
            info!(player = %player, "player disqualified after too many illegal moves or timeouts");
            self.disqualified = Some(player);
            self.events.push(MatchEvent::Disqualified { player });
        }

        if matches!(outcome, TurnOutcome::Accepted(_)) {
            let elapsed = turn_start.elapsed();
            if self.config.pace > elapsed {
                thread::sleep(self.config.pace - elapsed);
            }
        }
        Ok(outcome)
    }

    fn strike(&mut self, player: Player) -> u32 {
        let strikes = &mut self.strikes[player.index()];
        *strikes += 1;
        *strikes
    }

    fn accept(&mut self, player: Player, mv: Move) -> Result<()> {
        let next = self.state.next_state(mv)?;
        let entry = HistoryEntry { mv, player };
        if let Some(log) = self.history_log.as_mut() {
            log.append(&entry)?;
        }
        self.history.push(entry);
        self.strikes[player.index()] = 0;
        self.state = next;

        info!(player = %player, mv = %mv, ply = self.history.len(), "move accepted");
        debug!("board after {mv}\n{}", self.state.render(Some(mv)));

        if self.state.player() == Some(player) {
            let passer = player.opponent();
            info!(player = %passer, "no legal moves, opponent plays again");
            self.events.push(MatchEvent::Pass { player: passer });
        }
        Ok(())
    }

    fn result(&self) -> MatchResult {
        let scores = Player::ALL.map(|p| self.state.score(p));
        let outcome = match self.disqualified {
            Some(p) => MatchOutcome::Disqualified(p),
            None => MatchOutcome::Finished(Outcome::from_scores(scores[0], scores[1])),
        };
        MatchResult {
            outcome,
            names: [self.agents[0].name(), self.agents[1].name()],
            scores,
            history: self.history.clone(),
            events: self.events.clone(),
            started: self.started,
            finished: SystemTime::now(),
            final_board: self.state.text(),
        }
    }
}
