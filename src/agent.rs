//! Agents: anything that can pick a move for a game state.
//!
//! The match server only knows the [`Agent`] trait. Agents are chosen at
//! runtime from a textual [`AgentSpec`]:
//!
//! | Spec | Agent |
//! |------|-------|
//! | `random` | [`RandomAgent`] |
//! | `minimax` / `minimax:<depth>` | [`MinimaxAgent`] (`-1` = unbounded, tic-tac-toe only) |
//! | `mcts` / `mcts:<millis>` | [`MctsAgent`] with a time budget |
//! | `process:<command>` | [`ProcessAgent`] running an external program |

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use fastrand::Rng;
use tracing::{debug, warn};

use crate::constants::{OTHELLO_DEPTH, UNBOUNDED_DEPTH};
use crate::error::{Error, Result};
use crate::evaluation::{EvalFn, othello_utility, tttm_utility};
use crate::game::{GameState, Move};
use crate::mcts::{self, MctsConfig, SearchLimit};
use crate::minimax::search_cancellable;
use crate::othello::OthelloState;
use crate::timer::CancelToken;
use crate::tttm::TttmState;

/// How often a [`ProcessAgent`] checks its cancel token while waiting for output.
const PROCESS_POLL: Duration = Duration::from_millis(10);

/// A move chooser.
///
/// `make_move` receives a private copy of the game state and may do anything
/// with it. Returning `None` means "no move"; the server treats it like a
/// timeout. Long-running agents should poll `cancel` and give up once it is
/// set, since their answer will be discarded anyway.
pub trait Agent<S: GameState>: Send + Sync {
    fn make_move(&self, state: S, cancel: &CancelToken) -> Option<Move>;

    /// Label used in logs and the match report.
    fn name(&self) -> String;
}

/// Picks a uniformly random legal move.
#[derive(Debug)]
pub struct RandomAgent {
    rng: Mutex<Rng>,
}

impl RandomAgent {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Rng::with_seed(seed),
            None => Rng::new(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl<S: GameState> Agent<S> for RandomAgent {
    fn make_move(&self, state: S, _cancel: &CancelToken) -> Option<Move> {
        let moves = state.legal_moves();
        if moves.is_empty() {
            return None;
        }
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };
        Some(moves[rng.usize(..moves.len())])
    }

    fn name(&self) -> String {
        "random".to_string()
    }
}

/// Alpha-beta minimax to a fixed depth with a pluggable evaluation.
///
/// The search polls its cancel token, so a timed-out call unwinds instead of
/// running on in the background.
pub struct MinimaxAgent<S> {
    depth: i32,
    eval: EvalFn<S>,
}

impl<S> MinimaxAgent<S> {
    pub fn new(depth: i32, eval: EvalFn<S>) -> Self {
        Self { depth, eval }
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }
}

impl<S: GameState> Agent<S> for MinimaxAgent<S> {
    fn make_move(&self, state: S, cancel: &CancelToken) -> Option<Move> {
        search_cancellable(&state, self.depth, self.eval, cancel).0
    }

    fn name(&self) -> String {
        if self.depth == UNBOUNDED_DEPTH {
            "minimax(unbounded)".to_string()
        } else {
            format!("minimax(depth={})", self.depth)
        }
    }
}

/// Monte Carlo tree search agent.
#[derive(Debug, Clone, Default)]
pub struct MctsAgent {
    config: MctsConfig,
}

impl MctsAgent {
    pub fn new(config: MctsConfig) -> Self {
        Self { config }
    }
}

impl<S: GameState> Agent<S> for MctsAgent {
    fn make_move(&self, state: S, cancel: &CancelToken) -> Option<Move> {
        match mcts::search(&state, &self.config, cancel) {
            Ok(mv) => mv,
            Err(e) => {
                warn!(error = %e, "mcts search failed");
                None
            }
        }
    }

    fn name(&self) -> String {
        match self.config.limit {
            SearchLimit::Time(budget) => format!("mcts({}ms)", budget.as_millis()),
            SearchLimit::Iterations(n) => format!("mcts({n} iterations)"),
        }
    }
}

/// Runs an external program once per move.
///
/// The program receives the board text followed by the mark of the player to
/// move on stdin, and must print `x,y` on its first output line. Output that
/// does not parse is turned into [`Move::INVALID`] so the server counts it as
/// an illegal move. The child is killed if the call is cancelled.
#[derive(Debug, Clone)]
pub struct ProcessAgent {
    program: String,
    args: Vec<String>,
}

impl ProcessAgent {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Run the program and return its first non-empty output line, or
    /// `None` if it was cancelled.
    ///
    /// Output is read on a helper thread while the child runs, so a chatty
    /// program never stalls on a full pipe. The child is killed once its
    /// answer is in.
    fn query(&self, input: &str, cancel: &CancelToken) -> Result<Option<String>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::io(format!("spawn '{}'", self.program), e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .map_err(|e| Error::io("write agent input", e))?;
        }

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(Some(String::new()));
        };
        let (tx, rx) = channel();
        let reader = thread::Builder::new()
            .name(format!("agent-output-{}", self.program))
            .spawn(move || {
                let _ = tx.send(first_line(stdout));
            });
        if let Err(e) = reader {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::io("spawn agent output reader", e));
        }

        let answer = loop {
            match rx.recv_timeout(PROCESS_POLL) {
                Ok(line) => break Some(line),
                Err(RecvTimeoutError::Timeout) if cancel.is_cancelled() => break None,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break Some(Ok(String::new())),
            }
        };
        let _ = child.kill();
        let _ = child.wait();

        match answer {
            Some(line) => line
                .map(Some)
                .map_err(|e| Error::io("read agent output", e)),
            None => Ok(None),
        }
    }
}

/// First non-empty line of `output`, or an empty string at end of stream.
fn first_line(output: impl Read) -> io::Result<String> {
    for line in BufReader::new(output).lines() {
        let line = line?;
        if !line.trim().is_empty() {
            return Ok(line);
        }
    }
    Ok(String::new())
}

impl<S: GameState> Agent<S> for ProcessAgent {
    fn make_move(&self, state: S, cancel: &CancelToken) -> Option<Move> {
        let player = state.player()?;
        let input = format!("{}\n{}\n", state.text().trim_end(), player.mark());
        match self.query(&input, cancel) {
            Ok(Some(line)) => match line.parse::<Move>() {
                Ok(mv) => Some(mv),
                Err(e) => {
                    debug!(agent = %self.program, error = %e, "unparsable agent output");
                    Some(Move::INVALID)
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(agent = %self.program, error = %e, "agent process failed");
                None
            }
        }
    }

    fn name(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Parsed agent specification, see the module docs for the syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentSpec {
    Random,
    /// `None` uses the game's default depth
    Minimax { depth: Option<i32> },
    /// `None` uses the default time budget
    Mcts { budget: Option<Duration> },
    Process { program: String, args: Vec<String> },
}

impl FromStr for AgentSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg.trim())),
            None => (s, None),
        };
        let unknown = || Error::UnknownAgent(s.to_string());

        match (kind.to_ascii_lowercase().as_str(), arg) {
            ("random", None) => Ok(AgentSpec::Random),
            ("minimax", None) => Ok(AgentSpec::Minimax { depth: None }),
            ("minimax", Some(depth)) => {
                let depth: i32 = depth.parse().map_err(|_| unknown())?;
                if depth < UNBOUNDED_DEPTH || depth == 0 {
                    return Err(unknown());
                }
                Ok(AgentSpec::Minimax { depth: Some(depth) })
            }
            ("mcts", None) => Ok(AgentSpec::Mcts { budget: None }),
            ("mcts", Some(millis)) => {
                let millis: u64 = millis.parse().map_err(|_| unknown())?;
                Ok(AgentSpec::Mcts {
                    budget: Some(Duration::from_millis(millis)),
                })
            }
            ("process", Some(command)) => {
                let mut words = command.split_whitespace().map(str::to_string);
                let program = words.next().ok_or_else(unknown)?;
                Ok(AgentSpec::Process {
                    program,
                    args: words.collect(),
                })
            }
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for AgentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentSpec::Random => write!(f, "random"),
            AgentSpec::Minimax { depth: None } => write!(f, "minimax"),
            AgentSpec::Minimax { depth: Some(d) } => write!(f, "minimax:{d}"),
            AgentSpec::Mcts { budget: None } => write!(f, "mcts"),
            AgentSpec::Mcts { budget: Some(b) } => write!(f, "mcts:{}", b.as_millis()),
            AgentSpec::Process { program, args } if args.is_empty() => {
                write!(f, "process:{program}")
            }
            AgentSpec::Process { program, args } => {
                write!(f, "process:{program} {}", args.join(" "))
            }
        }
    }
}

fn mcts_config(budget: Option<Duration>, seed: Option<u64>) -> MctsConfig {
    let mut config = MctsConfig {
        seed,
        ..MctsConfig::default()
    };
    if let Some(budget) = budget {
        config.limit = SearchLimit::Time(budget);
    }
    config
}

/// Minimax settings of one game.
struct MinimaxDefaults<S> {
    eval: EvalFn<S>,
    depth: i32,
    allow_unbounded: bool,
}

fn build_agent<S: GameState>(
    spec: &AgentSpec,
    seed: Option<u64>,
    minimax: MinimaxDefaults<S>,
) -> Result<Arc<dyn Agent<S>>> {
    let agent: Arc<dyn Agent<S>> = match spec {
        AgentSpec::Random => Arc::new(RandomAgent::new(seed)),
        AgentSpec::Minimax { depth } => {
            let depth = depth.unwrap_or(minimax.depth);
            if depth == UNBOUNDED_DEPTH && !minimax.allow_unbounded {
                return Err(Error::InvalidConfiguration(format!(
                    "'{spec}' searches to the end of the game, which this game is too long for"
                )));
            }
            Arc::new(MinimaxAgent::new(depth, minimax.eval))
        }
        AgentSpec::Mcts { budget } => Arc::new(MctsAgent::new(mcts_config(*budget, seed))),
        AgentSpec::Process { program, args } => {
            Arc::new(ProcessAgent::new(program.clone(), args.clone()))
        }
    };
    Ok(agent)
}

/// Build an agent for the capture game.
///
/// Minimax defaults to depth [`OTHELLO_DEPTH`] with the terminal-aware utility.
/// Unbounded minimax is rejected.
pub fn build_othello_agent(
    spec: &AgentSpec,
    seed: Option<u64>,
) -> Result<Arc<dyn Agent<OthelloState>>> {
    let minimax = MinimaxDefaults {
        eval: othello_utility,
        depth: OTHELLO_DEPTH,
        allow_unbounded: false,
    };
    build_agent(spec, seed, minimax)
}

/// Build an agent for misère tic-tac-toe.
///
/// The game is small enough for minimax to search it to the end by default.
pub fn build_tttm_agent(spec: &AgentSpec, seed: Option<u64>) -> Result<Arc<dyn Agent<TttmState>>> {
    let minimax = MinimaxDefaults {
        eval: tttm_utility,
        depth: UNBOUNDED_DEPTH,
        allow_unbounded: true,
    };
    build_agent(spec, seed, minimax)
}
