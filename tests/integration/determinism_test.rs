use dps::engine::{SimulatedConfig, SimulatedEngine};
use dps::worker::limits::{MemoryGauge, ResourceLimits};
use dps::{ExchangeConfig, PortfolioResult, SolveResult, run_portfolio};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Memory gauge that never reports a breach but sleeps for a random time,
/// perturbing the thread schedule at every period boundary.
struct JitterGauge;

impl MemoryGauge for JitterGauge {
    fn used_megabytes(&self) -> Option<f64> {
        let micros = rand::rng().random_range(0..300);
        std::thread::sleep(Duration::from_micros(micros));
        Some(0.0)
    }
}

fn exchange_config(jitter: bool) -> ExchangeConfig {
    let mut config = ExchangeConfig::default()
        .with_workers(4)
        .with_margin(3)
        .with_period_length(2_000)
        .with_forced_application(5, 2)
        .with_export_budget(40, 2.0);
    if jitter {
        config = config.with_limits(
            ResourceLimits::default()
                .with_memory_limit(f64::MAX)
                .with_gauge(Arc::new(JitterGauge)),
        );
    }
    config
}

fn run(config: &ExchangeConfig, simulated: &SimulatedConfig) -> PortfolioResult {
    let engines = (0..config.num_workers)
        .map(|id| SimulatedEngine::new(id, simulated.clone()))
        .collect();
    run_portfolio(engines, config, Duration::from_millis(100)).expect("portfolio run failed")
}

/// Everything about a run that must not depend on thread scheduling
fn fingerprint(result: &PortfolioResult) -> Vec<(u64, u64, u64, u64, u64, SolveResult)> {
    result
        .worker_statistics
        .iter()
        .map(|s| {
            (
                s.periods,
                s.engine.conflicts,
                s.engine.propagations,
                s.exported_clauses,
                s.imported_clauses,
                s.result,
            )
        })
        .collect()
}

#[test]
fn test_repeated_runs_are_identical() {
    let simulated = SimulatedConfig::default()
        .with_seed(11)
        .with_verdict(SolveResult::Unsatisfiable, 400, 300);
    let config = exchange_config(false);

    let first = run(&config, &simulated);
    assert!(first.winner.is_some(), "some worker must conclude");
    for attempt in 0..3 {
        let again = run(&config, &simulated);
        assert_eq!(again.winner, first.winner, "winner differs on attempt {}", attempt);
        assert_eq!(again.result, first.result);
        assert_eq!(fingerprint(&again), fingerprint(&first), "attempt {}", attempt);
    }
}

#[test]
fn test_schedule_jitter_does_not_change_the_outcome() {
    let simulated = SimulatedConfig::default()
        .with_seed(3)
        .with_verdict(SolveResult::Satisfiable, 300, 400);

    let calm = run(&exchange_config(false), &simulated);
    let jittery = run(&exchange_config(true), &simulated);

    assert_eq!(jittery.winner, calm.winner);
    assert_eq!(jittery.result, SolveResult::Satisfiable);
    assert_eq!(jittery.model, calm.model);
    assert_eq!(fingerprint(&jittery), fingerprint(&calm));
}

#[test]
fn test_adaptive_period_length_is_reproducible() {
    let simulated = SimulatedConfig::default()
        .with_seed(17)
        .with_verdict(SolveResult::Unsatisfiable, 500, 300);
    let config = exchange_config(true)
        .with_adaptive_period(10, 0.5)
        .with_adaptive_bounds(500, 8_000);

    let first = run(&config, &simulated);
    let lengths = |r: &PortfolioResult| -> Vec<u64> {
        r.worker_statistics.iter().map(|s| s.period_length).collect()
    };
    assert!(
        lengths(&first).iter().any(|&l| l != 2_000),
        "period length should adapt: {:?}",
        lengths(&first)
    );
    for attempt in 0..2 {
        let again = run(&config, &simulated);
        assert_eq!(again.winner, first.winner, "winner differs on attempt {}", attempt);
        assert_eq!(fingerprint(&again), fingerprint(&first), "attempt {}", attempt);
        assert_eq!(lengths(&again), lengths(&first), "attempt {}", attempt);
    }
}

#[test]
fn test_clauses_flow_between_workers() {
    let simulated = SimulatedConfig::default()
        .with_seed(5)
        .with_verdict(SolveResult::Unsatisfiable, 600, 0);
    let result = run(&exchange_config(false), &simulated);

    assert!(result.total_exported() > 0, "engines should export clauses");
    assert!(result.total_imported() > 0, "workers should import clauses");
    for stats in &result.worker_statistics {
        assert!(stats.periods > 3, "worker {} ran {} periods", stats.worker_id, stats.periods);
    }
}

#[test]
fn test_time_limit_ends_a_run_without_verdict() {
    let simulated = SimulatedConfig::default()
        .with_seed(1)
        .with_verdict(SolveResult::Unknown, u64::MAX / 2, 0);
    let config = ExchangeConfig::default()
        .with_workers(2)
        .with_margin(2)
        .with_period_length(1_000)
        .with_limits(ResourceLimits::default().with_time_limit(Duration::from_millis(200)));

    let result = run(&config, &simulated);
    assert_eq!(result.result, SolveResult::Unknown);
    assert!(result.model.is_none());
}
