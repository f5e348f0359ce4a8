//! Shared winner bookkeeping and termination decisions.
//!
//! Results are ranked by their `(period, worker)` signature: the smallest
//! period wins and ties go to the smallest worker id. Because workers keep
//! running for `margin` periods after the first conclusive report, any
//! worker that could still produce a smaller signature gets the chance to do
//! so, which makes the final winner independent of wall-clock arrival order.

use crate::engine::SolveResult;
use crate::error::ExchangeResult;
use crate::period::{MailboxDirectory, ProducerMailbox};
use parking_lot::Mutex;
use std::fmt;
use tracing::debug;

/// Identifies the authoritative result: lower compares as better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WinnerSignature {
    pub period: u64,
    pub worker: usize,
}

impl fmt::Display for WinnerSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {} at period {}", self.worker, self.period)
    }
}

/// The recorded result and who produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Winner {
    pub result: SolveResult,
    pub signature: WinnerSignature,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    live_workers: usize,
    launched: bool,
    winner: Option<Winner>,
}

/// Single shared object holding global exchange state.
#[derive(Debug)]
pub struct Coordinator {
    num_workers: usize,
    margin: u64,
    period_length: u64,
    directory: MailboxDirectory,
    state: Mutex<CoordinatorState>,
}

impl Coordinator {
    /// Allocate the coordinator and one mailbox per worker.
    pub fn new(num_workers: usize, margin: u64, period_length: u64) -> ExchangeResult<Self> {
        let directory = MailboxDirectory::new(num_workers, margin)?;
        Ok(Self {
            num_workers,
            margin,
            period_length,
            directory,
            state: Mutex::new(CoordinatorState::default()),
        })
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn margin(&self) -> u64 {
        self.margin
    }

    pub fn period_length(&self) -> u64 {
        self.period_length
    }

    pub fn register_start(&self) {
        let mut state = self.state.lock();
        state.live_workers += 1;
        state.launched = true;
    }

    pub fn register_stop(&self) {
        let mut state = self.state.lock();
        assert!(state.live_workers > 0, "register_stop without register_start");
        state.live_workers -= 1;
    }

    /// Number of running workers, or `None` before the first one started.
    pub fn live_workers(&self) -> Option<usize> {
        let state = self.state.lock();
        state.launched.then_some(state.live_workers)
    }

    /// Record a worker's final result.
    ///
    /// The first report is always recorded. Later reports replace it only when
    /// conclusive and carrying a strictly smaller signature. Returns whether
    /// this call became the new best.
    ///
    /// When every report is `Unknown`, the recorded signature belongs to
    /// whichever report arrived first. Only conclusive winners are
    /// independent of thread timing.
    pub fn report_result(&self, result: SolveResult, period: u64, worker: usize) -> bool {
        let signature = WinnerSignature { period, worker };
        let mut state = self.state.lock();

        if let Some(current) = state.winner {
            debug_assert!(
                !result.is_conclusive()
                    || !current.result.is_conclusive()
                    || current.result == result,
                "conflicting verdicts {} and {}",
                current.result,
                result
            );
            if !result.is_conclusive() || signature >= current.signature {
                return false;
            }
        }

        debug!(worker, period, %result, "new best result");
        state.winner = Some(Winner { result, signature });
        true
    }

    /// Whether a worker at `period` should stop.
    ///
    /// True once a result exists and either it is inconclusive or `period`
    /// lies beyond the winner's period plus the margin.
    pub fn should_terminate(&self, period: u64) -> bool {
        let state = self.state.lock();
        match state.winner {
            None => false,
            Some(winner) => {
                !winner.result.is_conclusive()
                    || winner.signature.period.saturating_add(self.margin) < period
            }
        }
    }

    pub fn solution_found(&self) -> bool {
        self.state.lock().winner.is_some()
    }

    pub fn winner(&self) -> Option<Winner> {
        self.state.lock().winner
    }

    /// Final verdict (`Unknown` if nothing was reported).
    pub fn result(&self) -> SolveResult {
        self.winner().map(|w| w.result).unwrap_or_default()
    }

    pub fn mailbox(&self, worker: usize) -> &ProducerMailbox {
        self.directory.get(worker)
    }

    pub fn directory(&self) -> &MailboxDirectory {
        &self.directory
    }
}
