//! Interface to the sequential solving engines driven by each worker
//!
//! The exchange runtime never depends on a concrete backend. An engine runs its
//! own search inside [`SolvingEngine::solve`] and calls back into the
//! [`PeriodicWorker`] handle it is given:
//!
//! - `add_work` after every internal step, to advance the logical clock
//! - `export_candidate` for each learnt clause worth sharing
//! - `check_period` whenever `at_boundary` is true; a `false` return means stop
//! - `should_apply` / `take_imported` to integrate clauses from other workers

pub mod simulated;

pub use simulated::{SimulatedConfig, SimulatedEngine};

use crate::clause::{Clause, Literal};
use crate::worker::PeriodicWorker;
use std::fmt;

/// Verdict of one engine or of the whole portfolio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveResult {
    Satisfiable,
    Unsatisfiable,
    /// Stopped without a conclusive answer
    #[default]
    Unknown,
}

impl SolveResult {
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, SolveResult::Unknown)
    }

    /// Conventional SAT-competition exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            SolveResult::Satisfiable => 10,
            SolveResult::Unsatisfiable => 20,
            SolveResult::Unknown => 0,
        }
    }
}

impl fmt::Display for SolveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveResult::Satisfiable => write!(f, "SATISFIABLE"),
            SolveResult::Unsatisfiable => write!(f, "UNSATISFIABLE"),
            SolveResult::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Result of injecting imported clauses into engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Ok,
    /// The imported clauses contradict the engine's state at the root level
    Conflict,
}

/// Monotonically increasing counters read by the exchange policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStatistics {
    pub conflicts: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub restarts: u64,
    pub redundant_clauses: u64,
}

/// Clauses imported from other workers, separated by size
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBatch {
    pub units: Vec<Clause>,
    pub clauses: Vec<Clause>,
}

impl ImportBatch {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len() + self.clauses.len()
    }

    /// Route a clause to the unit or non-unit list
    pub fn push(&mut self, clause: Clause) {
        if clause.is_unit() {
            self.units.push(clause);
        } else {
            self.clauses.push(clause);
        }
    }
}

/// A sequential search engine driven by one worker
pub trait SolvingEngine {
    /// Run the search to completion or until the worker says stop
    fn solve(&mut self, worker: &mut PeriodicWorker) -> SolveResult;

    /// Inject imported clauses into the engine's state
    fn apply_imported_clauses(&mut self, units: &[Clause], clauses: &[Clause]) -> ApplyOutcome;

    fn statistics(&self) -> EngineStatistics;

    /// Admit more clauses for export (export volume is below target)
    fn relax_export_threshold(&mut self) {}

    /// Admit fewer clauses for export (export volume is above target)
    fn tighten_export_threshold(&mut self) {}

    /// Current export quality threshold, for reporting
    fn export_threshold(&self) -> u32 {
        0
    }

    /// Satisfying assignment after a `Satisfiable` verdict
    fn model(&self) -> Option<Vec<Literal>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_exit_codes() {
        assert_eq!(SolveResult::Satisfiable.exit_code(), 10);
        assert_eq!(SolveResult::Unsatisfiable.exit_code(), 20);
        assert_eq!(SolveResult::Unknown.exit_code(), 0);
        assert!(!SolveResult::Unknown.is_conclusive());
    }

    #[test]
    fn test_import_batch_routing() {
        let mut batch = ImportBatch::default();
        batch.push(Clause::from([5]));
        batch.push(Clause::from([1, -2]));
        batch.push(Clause::from([-7]));
        assert_eq!(batch.units.len(), 2);
        assert_eq!(batch.clauses.len(), 1);
        assert_eq!(batch.len(), 3);
    }
}
