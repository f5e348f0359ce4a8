use dps::{
    ApplyOutcome, Clause, Coordinator, EngineStatistics, ExchangeConfig, PeriodicWorker,
    SolveResult, SolvingEngine, WinnerSignature, run_portfolio,
};
use std::time::Duration;

/// Concludes with `verdict` once the worker reaches `period`, or never.
struct ScriptedEngine {
    conclude_at: Option<u64>,
    verdict: SolveResult,
    stats: EngineStatistics,
}

impl ScriptedEngine {
    fn concluding(period: u64, verdict: SolveResult) -> Self {
        Self {
            conclude_at: Some(period),
            verdict,
            stats: EngineStatistics::default(),
        }
    }

    fn endless() -> Self {
        Self {
            conclude_at: None,
            verdict: SolveResult::Unknown,
            stats: EngineStatistics::default(),
        }
    }
}

impl SolvingEngine for ScriptedEngine {
    fn solve(&mut self, worker: &mut PeriodicWorker) -> SolveResult {
        loop {
            self.stats.conflicts += 1;
            worker.export_candidate(Clause::from([worker.id() as i32 + 1, 100]), 1);
            worker.add_work(10);
            while worker.at_boundary() {
                if !worker.check_period(self) {
                    return SolveResult::Unknown;
                }
            }
            if worker.should_apply() {
                worker.apply_imported(self);
            }
            if self.conclude_at.is_some_and(|p| worker.period() >= p) {
                return self.verdict;
            }
        }
    }

    fn apply_imported_clauses(&mut self, _: &[Clause], _: &[Clause]) -> ApplyOutcome {
        ApplyOutcome::Ok
    }

    fn statistics(&self) -> EngineStatistics {
        self.stats
    }
}

fn config(workers: usize, margin: u64) -> ExchangeConfig {
    ExchangeConfig::default()
        .with_workers(workers)
        .with_margin(margin)
        .with_period_length(40)
}

#[test]
fn test_tie_goes_to_lowest_worker_id() {
    for _ in 0..5 {
        let engines = vec![
            ScriptedEngine::endless(),
            ScriptedEngine::endless(),
            ScriptedEngine::concluding(6, SolveResult::Satisfiable),
            ScriptedEngine::endless(),
            ScriptedEngine::concluding(6, SolveResult::Satisfiable),
        ];
        let result = run_portfolio(engines, &config(5, 4), Duration::from_millis(20)).unwrap();
        assert_eq!(result.winner, Some(WinnerSignature { period: 6, worker: 2 }));
        assert_eq!(result.result, SolveResult::Satisfiable);
    }
}

#[test]
fn test_late_starter_with_earlier_period_still_wins() {
    // Worker 3 concludes at period 5 while worker 0 already concluded at 7:
    // the grace window lets the smaller period take over.
    let engines = vec![
        ScriptedEngine::concluding(7, SolveResult::Unsatisfiable),
        ScriptedEngine::endless(),
        ScriptedEngine::endless(),
        ScriptedEngine::concluding(5, SolveResult::Unsatisfiable),
    ];
    let result = run_portfolio(engines, &config(4, 3), Duration::from_millis(20)).unwrap();
    assert_eq!(result.winner, Some(WinnerSignature { period: 5, worker: 3 }));
}

#[test]
fn test_everyone_stops_right_after_the_grace_window() {
    let engines = vec![
        ScriptedEngine::endless(),
        ScriptedEngine::concluding(10, SolveResult::Unsatisfiable),
        ScriptedEngine::endless(),
    ];
    let result = run_portfolio(engines, &config(3, 2), Duration::from_millis(20)).unwrap();
    for id in [0, 2] {
        let stats = &result.worker_statistics[id];
        assert_eq!(stats.result, SolveResult::Unknown);
        assert_eq!(stats.periods, 13, "worker {} stops at period 10 + 2 + 1", id);
        assert!(stats.imported_clauses > 0);
    }
}

#[test]
fn test_single_worker_portfolio() {
    let engines = vec![ScriptedEngine::concluding(3, SolveResult::Satisfiable)];
    let result = run_portfolio(engines, &config(1, 20), Duration::from_millis(20)).unwrap();
    assert_eq!(result.winner, Some(WinnerSignature { period: 3, worker: 0 }));
    assert_eq!(result.worker_statistics[0].imported_clauses, 0);
}

#[test]
fn test_coordinator_laws_through_public_api() {
    let coordinator = Coordinator::new(5, 20, 1000).unwrap();
    coordinator.report_result(SolveResult::Satisfiable, 3, 4);
    coordinator.report_result(SolveResult::Satisfiable, 5, 2);
    coordinator.report_result(SolveResult::Satisfiable, 3, 1);
    assert_eq!(
        coordinator.winner().unwrap().signature,
        WinnerSignature { period: 3, worker: 1 }
    );

    let coordinator = Coordinator::new(4, 20, 1000).unwrap();
    coordinator.report_result(SolveResult::Unsatisfiable, 100, 0);
    assert!(!coordinator.should_terminate(119));
    assert!(coordinator.should_terminate(121));
}

/// Worker 1 keeps exporting the unit `1`; worker 0 already fixed `-1`, so
/// applying that import is a conflict.
struct ContradictedEngine {
    stats: EngineStatistics,
}

impl SolvingEngine for ContradictedEngine {
    fn solve(&mut self, worker: &mut PeriodicWorker) -> SolveResult {
        loop {
            self.stats.conflicts += 1;
            if worker.id() == 1 {
                worker.export_candidate(Clause::from([1]), 1);
            }
            worker.add_work(10);
            while worker.at_boundary() {
                if !worker.check_period(self) {
                    return SolveResult::Unknown;
                }
            }
            if worker.should_apply() && worker.apply_imported(self) == ApplyOutcome::Conflict {
                return SolveResult::Unsatisfiable;
            }
        }
    }

    fn apply_imported_clauses(&mut self, units: &[Clause], _: &[Clause]) -> ApplyOutcome {
        if units.iter().any(|u| u.literals() == [1]) {
            ApplyOutcome::Conflict
        } else {
            ApplyOutcome::Ok
        }
    }

    fn statistics(&self) -> EngineStatistics {
        self.stats
    }
}

#[test]
fn test_import_conflict_is_reported_as_unsat() {
    for _ in 0..3 {
        let engines = (0..2)
            .map(|_| ContradictedEngine {
                stats: EngineStatistics::default(),
            })
            .collect();
        let config = config(2, 1).with_forced_application(0, 0);
        let result = run_portfolio(engines, &config, Duration::from_millis(20)).unwrap();

        // Worker 1's period 0 reaches worker 0 at the end of period 1.
        assert_eq!(result.result, SolveResult::Unsatisfiable);
        assert_eq!(result.winner, Some(WinnerSignature { period: 2, worker: 0 }));
        assert_eq!(result.worker_statistics[0].result, SolveResult::Unsatisfiable);
        assert_eq!(result.worker_statistics[1].result, SolveResult::Unknown);
        assert_eq!(result.worker_statistics[1].periods, 4, "stops past period 2 + 1");
    }
}
