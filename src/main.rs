//! advsearch: play a timed match between two game-playing agents.
//!
//! ## Usage
//!
//! - `advsearch othello minimax mcts` - Minimax (depth 4) as Black against MCTS
//! - `advsearch tttm random minimax:-1 -d 1` - Misère tic-tac-toe, one second per move
//! - `advsearch othello process:./my_bot random --board start.txt` - External agent from a custom position
//!
//! Agent specs: `random`, `minimax[:depth]`, `mcts[:millis]`, `process:<command>`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing::level_filters::LevelFilter;

use advsearch::agent::{Agent, AgentSpec, build_othello_agent, build_tttm_agent};
use advsearch::game::{GameState, Player};
use advsearch::othello::{self, OthelloState};
use advsearch::report::{HistoryLog, MatchReport};
use advsearch::server::{Match, MatchConfig, MatchOutcome};
use advsearch::tttm::{self, TttmState};

/// Which game to play.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Game {
    /// 8x8 capture game
    Othello,
    /// 3x3 misère tic-tac-toe
    Tttm,
}

/// Timed match server for adversarial search agents
#[derive(Parser, Debug)]
#[command(name = "advsearch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Game to play
    #[arg(value_enum)]
    game: Game,

    /// Agent playing Black (moves first)
    black: AgentSpec,

    /// Agent playing White
    white: AgentSpec,

    /// Time limit per move, in seconds
    #[arg(short, long, default_value_t = 5.0)]
    delay: f64,

    /// Minimum time per accepted move, in seconds
    #[arg(short, long, default_value_t = 0.0)]
    pace: f64,

    /// File receiving one `x,y,mark` line per accepted move
    #[arg(short = 'l', long, default_value = "history.txt")]
    log_history: PathBuf,

    /// File receiving the JSON match report
    #[arg(short, long, default_value = "results.json")]
    output_file: PathBuf,

    /// Start from the position in this board text file
    #[arg(long)]
    board: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seed for random and MCTS agents
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn validate(&self) -> Result<()> {
        if self.delay <= 0.0 {
            bail!("delay must be a positive number of seconds (got {})", self.delay);
        }
        seconds("delay", self.delay)?;

        if self.pace < 0.0 {
            bail!("pace cannot be negative (got {})", self.pace);
        }
        seconds("pace", self.pace)?;

        if self.log_history == self.output_file {
            bail!(
                "history log and report must be different files (both are {})",
                self.log_history.display()
            );
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            bail!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            );
        }

        Ok(())
    }

    fn match_config(&self) -> Result<MatchConfig> {
        Ok(MatchConfig {
            deadline: seconds("delay", self.delay)?,
            pace: seconds("pace", self.pace)?,
            ..MatchConfig::default()
        })
    }

    /// Seeds for the two agents, distinct so that identical specs still differ.
    fn seeds(&self) -> (Option<u64>, Option<u64>) {
        (self.seed, self.seed.map(|s| s.wrapping_add(1)))
    }
}

/// Convert a seconds option to a `Duration`, rejecting NaN, negative and
/// out-of-range values.
fn seconds(option: &str, value: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) => Ok(duration),
        Err(e) => bail!("{option} of {value} seconds is not a usable duration: {e}"),
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn read_board(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read board file {}", path.display()))
}

fn play<S: GameState>(
    cli: &Cli,
    state: S,
    black: Arc<dyn Agent<S>>,
    white: Arc<dyn Agent<S>>,
) -> Result<()> {
    let log = HistoryLog::create(&cli.log_history)?;
    let mut game = Match::with_config(state, black, white, cli.match_config()?).with_history_log(log);
    let result = game.run().context("match aborted")?;

    println!("{}", game.state().render(result.history.last().map(|e| e.mv)));
    for p in Player::ALL {
        println!("{p} ({}): {}", result.name(p), result.score(p));
    }
    match result.outcome {
        MatchOutcome::Disqualified(p) => {
            println!("{p} disqualified, {} wins", p.opponent());
        }
        outcome => match outcome.winner() {
            Some(p) => println!("{p} ({}) wins", result.name(p)),
            None => println!("Draw"),
        },
    }

    MatchReport::from_result(&result).write_json(&cli.output_file)?;
    info!(
        history = %cli.log_history.display(),
        report = %cli.output_file.display(),
        "match files written"
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.validate()?;
    init_tracing(&cli.log_level);

    let (black_seed, white_seed) = cli.seeds();
    match cli.game {
        Game::Othello => {
            let state = match &cli.board {
                Some(path) => {
                    let board = othello::Board::from_text(&read_board(path)?)
                        .with_context(|| format!("invalid board in {}", path.display()))?;
                    OthelloState::from_board(board, Player::Black)
                }
                None => OthelloState::new(),
            };
            let black = build_othello_agent(&cli.black, black_seed)?;
            let white = build_othello_agent(&cli.white, white_seed)?;
            play(&cli, state, black, white)
        }
        Game::Tttm => {
            let state = match &cli.board {
                Some(path) => {
                    let board = tttm::Board::from_text(&read_board(path)?)
                        .with_context(|| format!("invalid board in {}", path.display()))?;
                    TttmState::from_board(board, Player::Black)
                }
                None => TttmState::new(),
            };
            let black = build_tttm_agent(&cli.black, black_seed)?;
            let white = build_tttm_agent(&cli.white, white_seed)?;
            play(&cli, state, black, white)
        }
    }
}
