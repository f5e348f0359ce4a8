//! Host loop: spawn one thread per engine, wait for them and collect results.

use crate::engine::SolvingEngine;
use crate::error::{ExchangeError, ExchangeResult};
use crate::parallel::channel::{HostChannels, WorkerMessage, create_channels};
use crate::parallel::config::ExchangeConfig;
use crate::parallel::coordinator::Coordinator;
use crate::result::{PortfolioResult, WorkerStatistics};
use crate::worker::PeriodicWorker;
use crossbeam_channel::RecvTimeoutError;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Run one engine per worker until the coordinator holds a final result.
///
/// `engines[i]` is driven by worker `i`; the worker count is taken from
/// `engines.len()` and must match `config.num_workers`. A progress line is
/// logged every `log_interval` while workers are running.
pub fn run_portfolio<E>(
    engines: Vec<E>,
    config: &ExchangeConfig,
    log_interval: Duration,
) -> ExchangeResult<PortfolioResult>
where
    E: SolvingEngine + Send + 'static,
{
    config.validate()?;
    if engines.len() != config.num_workers {
        return Err(ExchangeError::InvalidConfig(format!(
            "{} engines for {} workers",
            engines.len(),
            config.num_workers
        )));
    }

    let start_time = Instant::now();
    let num_workers = config.num_workers;
    let coordinator = Arc::new(Coordinator::new(
        num_workers,
        config.margin,
        config.period_length,
    )?);

    let (host_channels, worker_channels) = create_channels(num_workers);

    let worker_handles: Vec<_> = engines
        .into_iter()
        .zip(worker_channels)
        .enumerate()
        .map(|(worker_id, (mut engine, channels))| {
            let worker = PeriodicWorker::new(worker_id, Arc::clone(&coordinator), config, channels);
            thread::Builder::new()
                .name(format!("dps-worker-{}", worker_id))
                .spawn(move || {
                    let stats = worker.run(&mut engine);
                    (engine, stats)
                })
        })
        .collect::<Result<_, _>>()
        .map_err(|_| ExchangeError::Allocation {
            what: "worker threads",
            count: num_workers,
        })?;

    wait_for_workers(&coordinator, host_channels, log_interval, start_time);

    let mut worker_statistics = Vec::with_capacity(num_workers);
    let mut engines = Vec::with_capacity(num_workers);
    let mut panicked = None;
    for (worker_id, handle) in worker_handles.into_iter().enumerate() {
        match handle.join() {
            Ok((engine, stats)) => {
                engines.push(Some(engine));
                worker_statistics.push(stats);
            }
            Err(_) => {
                panicked.get_or_insert(worker_id);
                engines.push(None);
                worker_statistics.push(WorkerStatistics::new(worker_id));
            }
        }
    }
    if let Some(worker_id) = panicked {
        return Err(ExchangeError::WorkerPanicked(worker_id));
    }

    let winner = coordinator.winner();
    let model = winner
        .filter(|w| w.result.is_conclusive())
        .and_then(|w| engines[w.signature.worker].as_ref())
        .and_then(|engine| engine.model());

    let result = PortfolioResult {
        result: coordinator.result(),
        winner: winner.map(|w| w.signature),
        model,
        worker_statistics,
        elapsed: start_time.elapsed(),
    };
    match winner {
        Some(w) => info!(result = %w.result, winner = %w.signature, "portfolio finished"),
        None => info!("portfolio finished without a result"),
    }
    Ok(result)
}

/// Block until every worker reported `Finished` (or hung up), logging progress.
fn wait_for_workers(
    coordinator: &Coordinator,
    channels: HostChannels,
    log_interval: Duration,
    start_time: Instant,
) {
    let total_workers = channels.progress.len();
    let mut finished_count = 0;

    while finished_count < total_workers {
        match channels.from_workers.recv_timeout(log_interval) {
            Ok(WorkerMessage::Finished {
                worker_id,
                statistics,
            }) => {
                finished_count += 1;
                debug!(
                    worker = worker_id,
                    result = %statistics.result,
                    periods = statistics.periods,
                    "worker finished"
                );
            }
            Err(RecvTimeoutError::Timeout) => {
                if coordinator.live_workers() == Some(0) {
                    break;
                }
                log_progress(coordinator, &channels, start_time);
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn log_progress(coordinator: &Coordinator, channels: &HostChannels, start_time: Instant) {
    let snapshots: Vec<_> = channels.progress.iter().map(|p| p.snapshot()).collect();
    let min_period = snapshots.iter().map(|s| s.period).min().unwrap_or(0);
    let max_period = snapshots.iter().map(|s| s.period).max().unwrap_or(0);
    let conflicts: u64 = snapshots.iter().map(|s| s.conflicts).sum();
    let imported: u64 = snapshots.iter().map(|s| s.imported).sum();
    let exported: u64 = snapshots.iter().map(|s| s.exported).sum();

    info!(
        elapsed = ?start_time.elapsed(),
        live = coordinator.live_workers().unwrap_or(0),
        min_period,
        max_period,
        conflicts,
        exported,
        imported,
        "progress"
    );
}
