//! Deadline-bounded agent calls.
//!
//! An agent's move function runs on its own worker thread and the caller
//! waits on a channel with a timeout. When the deadline passes the caller
//! stops waiting, raises the call's [`CancelToken`] and moves on; the worker
//! is detached and its late answer is discarded. Agents that poll their token
//! stop searching shortly afterwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::agent::Agent;
use crate::game::{GameState, Move};

/// Shared stop flag handed to an agent for the duration of one call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the agent holding this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a deadline-bounded call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallResult {
    /// The agent answered in time (`None` means it declined to move)
    Returned(Option<Move>),
    /// The deadline passed first
    TimedOut,
    /// The worker thread died without answering
    Panicked,
}

/// Run `agent.make_move(state)` on a worker thread and wait at most `deadline`.
pub fn call_with_timeout<S: GameState>(
    agent: Arc<dyn Agent<S>>,
    state: S,
    deadline: Duration,
) -> CallResult {
    let (tx, rx) = channel();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();
    let name = agent.name();

    let spawned = thread::Builder::new()
        .name(format!("agent-{name}"))
        .spawn(move || {
            let mv = agent.make_move(state, &worker_cancel);
            let _ = tx.send(mv);
        });
    if let Err(e) = spawned {
        warn!(agent = %name, error = %e, "failed to spawn agent thread");
        return CallResult::Panicked;
    }

    match rx.recv_timeout(deadline) {
        Ok(mv) => CallResult::Returned(mv),
        Err(RecvTimeoutError::Timeout) => {
            cancel.cancel();
            CallResult::TimedOut
        }
        Err(RecvTimeoutError::Disconnected) => CallResult::Panicked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tttm::TttmState;

    struct Fixed(Option<Move>);

    impl Agent<TttmState> for Fixed {
        fn make_move(&self, _state: TttmState, _cancel: &CancelToken) -> Option<Move> {
            self.0
        }

        fn name(&self) -> String {
            "fixed".to_string()
        }
    }

    struct Sleeper;

    impl Agent<TttmState> for Sleeper {
        fn make_move(&self, _state: TttmState, cancel: &CancelToken) -> Option<Move> {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            Some(Move::new(0, 0))
        }

        fn name(&self) -> String {
            "sleeper".to_string()
        }
    }

    struct Crasher;

    impl Agent<TttmState> for Crasher {
        fn make_move(&self, _state: TttmState, _cancel: &CancelToken) -> Option<Move> {
            panic!("agent crashed");
        }

        fn name(&self) -> String {
            "crasher".to_string()
        }
    }

    #[test]
    fn test_cancel_token_shared() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn test_returned_in_time() {
        let agent: Arc<dyn Agent<TttmState>> = Arc::new(Fixed(Some(Move::new(1, 1))));
        let result = call_with_timeout(agent, TttmState::new(), Duration::from_secs(2));
        assert_eq!(result, CallResult::Returned(Some(Move::new(1, 1))));

        let agent: Arc<dyn Agent<TttmState>> = Arc::new(Fixed(None));
        let result = call_with_timeout(agent, TttmState::new(), Duration::from_secs(2));
        assert_eq!(result, CallResult::Returned(None));
    }

    #[test]
    fn test_timed_out() {
        let agent: Arc<dyn Agent<TttmState>> = Arc::new(Sleeper);
        let result = call_with_timeout(agent, TttmState::new(), Duration::from_millis(50));
        assert_eq!(result, CallResult::TimedOut);
    }

    #[test]
    fn test_panicked() {
        let agent: Arc<dyn Agent<TttmState>> = Arc::new(Crasher);
        let result = call_with_timeout(agent, TttmState::new(), Duration::from_secs(2));
        assert_eq!(result, CallResult::Panicked);
    }
}
