//! Deterministic periodic clause exchange for parallel portfolio SAT solving.
//!
//! Every worker runs its own engine and splits its work into periods measured
//! in engine work units, not wall time. At the end of each period a worker
//! publishes the clauses it learnt and imports what the others published
//! `margin` periods earlier, waiting for them if necessary. Because every
//! exchange is keyed by period, a run with deterministic engines produces the
//! same clause flow and the same winner regardless of thread scheduling.

pub mod clause;
pub mod engine;
pub mod error;
pub mod parallel;
pub mod period;
pub mod result;
pub mod worker;

pub use clause::{Clause, Literal};
pub use engine::{ApplyOutcome, EngineStatistics, ImportBatch, SolveResult, SolvingEngine};
pub use error::{ExchangeError, ExchangeResult};
pub use parallel::{Coordinator, ExchangeConfig, WinnerSignature, run_portfolio};
pub use result::{PortfolioResult, WorkerStatistics};
pub use worker::PeriodicWorker;
