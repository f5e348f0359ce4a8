//! Per-worker statistics and the portfolio's final result

use crate::clause::Literal;
use crate::engine::{EngineStatistics, SolveResult};
use crate::parallel::coordinator::WinnerSignature;
use crate::worker::timer::{Phase, PhaseTimes};
use std::time::Duration;

/// Statistics from one worker
#[derive(Debug, Clone, Default)]
pub struct WorkerStatistics {
    pub worker_id: usize,
    /// What the worker's engine concluded
    pub result: SolveResult,
    /// Periods completed
    pub periods: u64,
    /// Period length in effect when the worker stopped
    pub period_length: u64,
    /// Clauses moved into the worker's own mailbox
    pub exported_clauses: u64,
    /// Literals moved into the worker's own mailbox
    pub exported_literals: u64,
    /// Clauses dropped because they alone exceed the export budget
    pub oversized_clauses: u64,
    /// Clauses received from other workers
    pub imported_clauses: u64,
    /// Times the engine was made to apply imported clauses
    pub forced_applications: u64,
    /// Engine export threshold at the end of the run
    pub export_threshold: u32,
    pub engine: EngineStatistics,
    pub phase_times: PhaseTimes,
}

impl WorkerStatistics {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }

    /// Fraction of wall time spent blocked on other workers (0.0 to 1.0)
    pub fn waiting_ratio(&self) -> f64 {
        let total = self.phase_times.total().as_secs_f64();
        if total == 0.0 {
            0.0
        } else {
            self.phase_times.get(Phase::Waiting).as_secs_f64() / total
        }
    }

    /// Conflicts per second of non-waiting time
    pub fn conflict_rate(&self) -> f64 {
        let secs = self.phase_times.non_waiting().as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.engine.conflicts as f64 / secs
        }
    }
}

/// Result of a full portfolio run
#[derive(Debug, Clone)]
pub struct PortfolioResult {
    /// Verdict held by the coordinator once every worker stopped
    pub result: SolveResult,
    /// Signature of the authoritative worker, if any reported
    pub winner: Option<WinnerSignature>,
    /// Model from the winning engine for satisfiable runs
    pub model: Option<Vec<Literal>>,
    /// Per-worker statistics, indexed by worker id
    pub worker_statistics: Vec<WorkerStatistics>,
    pub elapsed: Duration,
}

impl PortfolioResult {
    pub fn total_conflicts(&self) -> u64 {
        self.worker_statistics
            .iter()
            .map(|s| s.engine.conflicts)
            .sum()
    }

    pub fn total_imported(&self) -> u64 {
        self.worker_statistics
            .iter()
            .map(|s| s.imported_clauses)
            .sum()
    }

    pub fn total_exported(&self) -> u64 {
        self.worker_statistics
            .iter()
            .map(|s| s.exported_clauses)
            .sum()
    }

    /// Format statistics as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Workers: {}\n", self.worker_statistics.len()));
        s.push_str(&format!("Time: {:.2?}\n", self.elapsed));
        if let Some(winner) = self.winner {
            s.push_str(&format!("Winner: {}\n", winner));
        }
        s.push_str(&format!("Conflicts: {}\n", self.total_conflicts()));
        s.push_str(&format!("Exported clauses: {}\n", self.total_exported()));
        s.push_str(&format!(
            "Exported literals: {}\n",
            self.worker_statistics
                .iter()
                .map(|w| w.exported_literals)
                .sum::<u64>()
        ));
        s.push_str(&format!("Imported clauses: {}\n", self.total_imported()));

        for stats in &self.worker_statistics {
            s.push_str(&format!(
                "  worker {:2}: {:>13} periods {:6} len {:9} conflicts {:9} exported {:7} imported {:8} forced {:4} wait {:5.1}%\n",
                stats.worker_id,
                stats.result,
                stats.periods,
                stats.period_length,
                stats.engine.conflicts,
                stats.exported_clauses,
                stats.imported_clauses,
                stats.forced_applications,
                stats.waiting_ratio() * 100.0,
            ));
            let phases: Vec<String> = stats
                .phase_times
                .iter()
                .map(|(phase, time)| format!("{} {:.2?}", phase, time))
                .collect();
            s.push_str(&format!(
                "             literals {} rate {:.0} conflicts/s | {}\n",
                stats.exported_literals,
                stats.conflict_rate(),
                phases.join(" "),
            ));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::timer::PhaseTimer;

    #[test]
    fn test_ratios_handle_zero_time() {
        let stats = WorkerStatistics::new(0);
        assert_eq!(stats.waiting_ratio(), 0.0);
        assert_eq!(stats.conflict_rate(), 0.0);
    }

    #[test]
    fn test_summary_lists_every_worker() {
        let mut first = WorkerStatistics::new(0);
        first.engine.conflicts = 10;
        first.exported_clauses = 4;
        first.exported_literals = 9;
        let mut second = WorkerStatistics::new(1);
        second.engine.conflicts = 5;
        second.imported_clauses = 4;

        let result = PortfolioResult {
            result: SolveResult::Unsatisfiable,
            winner: Some(WinnerSignature { period: 3, worker: 1 }),
            model: None,
            worker_statistics: vec![first, second],
            elapsed: Duration::from_millis(12),
        };

        assert_eq!(result.total_conflicts(), 15);
        let summary = result.format_summary();
        assert!(summary.contains("Winner: worker 1 at period 3"));
        assert!(summary.contains("worker  0"));
        assert!(summary.contains("worker  1"));
        assert!(summary.contains("Exported literals: 9"));
        for phase in ["running", "waiting", "exchanging", "period-update"] {
            assert!(summary.contains(phase), "missing {} time: {}", phase, summary);
        }
    }

    #[test]
    fn test_summary_reports_phase_times_and_rate() {
        let mut timer = PhaseTimer::new();
        timer.start(Phase::Running);
        std::thread::sleep(Duration::from_millis(5));
        timer.start(Phase::Waiting);
        std::thread::sleep(Duration::from_millis(5));
        let mut stats = WorkerStatistics::new(0);
        stats.engine.conflicts = 1000;
        timer.stop();
        stats.phase_times = timer.times();

        assert!(stats.conflict_rate() > 0.0);
        assert!(stats.waiting_ratio() > 0.0 && stats.waiting_ratio() < 1.0);
        let result = PortfolioResult {
            result: SolveResult::Unknown,
            winner: None,
            model: None,
            worker_statistics: vec![stats],
            elapsed: Duration::from_millis(10),
        };
        let summary = result.format_summary();
        let detail = summary
            .lines()
            .find(|l| l.contains("conflicts/s"))
            .expect("Should print a per-worker detail line");
        assert!(detail.contains("running "), "detail: {}", detail);
        assert!(!summary.contains("Winner:"));
    }
}
