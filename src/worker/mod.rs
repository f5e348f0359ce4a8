//! Periodic worker loop.
//!
//! A [`PeriodicWorker`] is the handle an engine drives from inside
//! [`SolvingEngine::solve`]. The engine reports work units with
//! [`PeriodicWorker::add_work`]; once a period's worth has accumulated it calls
//! [`PeriodicWorker::check_period`], which runs one boundary:
//!
//! 1. drain the export buffer into the worker's open period set and adjust the
//!    engine's export threshold to keep the backlog near the literal budget
//! 2. compute this worker's candidate for the next period length
//! 3. complete the period set, opening the next one
//! 4. import every other worker's set for `period - margin`, blocking until
//!    each one is complete
//! 5. move to the next period
//! 6. ask the coordinator and the resource limits whether to stop
//!
//! Imported clauses accumulate in a pending batch until the engine takes them,
//! either on its own schedule or when [`PeriodicWorker::should_apply`] forces it.

pub mod limits;
pub mod timer;

use crate::clause::Clause;
use crate::engine::{ApplyOutcome, ImportBatch, SolvingEngine};
use crate::parallel::channel::{ProgressSnapshot, WorkerChannels, WorkerMessage};
use crate::parallel::config::ExchangeConfig;
use crate::parallel::coordinator::Coordinator;
use crate::period::{ExportBuffer, ProducerMailbox};
use crate::result::WorkerStatistics;
use std::sync::Arc;
use std::time::Instant;
use timer::{Phase, PhaseTimer};
use tracing::{debug, warn};

/// Moving average of the work needed for a fixed number of conflicts.
#[derive(Debug)]
struct AdaptiveLength {
    /// Conflicts per period targeted (0 = fixed length)
    conflicts: u64,
    smoothing: f64,
    average: f64,
    consumed: u64,
    conflicts_at_update: u64,
}

impl AdaptiveLength {
    fn new(config: &ExchangeConfig) -> Self {
        Self {
            conflicts: config.adaptive_conflicts,
            smoothing: config.adaptive_smoothing,
            average: config.period_length as f64,
            consumed: 0,
            conflicts_at_update: 0,
        }
    }

    fn enabled(&self) -> bool {
        self.conflicts > 0
    }

    /// Record a finished period of `length` units and return the next candidate
    fn update(&mut self, length: u64, conflicts: u64) -> u64 {
        if !self.enabled() {
            return length;
        }
        self.consumed += length;
        if conflicts >= self.conflicts_at_update + self.conflicts {
            let needed = self.consumed as f64 / (conflicts - self.conflicts_at_update) as f64
                * self.conflicts as f64;
            self.average = self.smoothing * needed + (1.0 - self.smoothing) * self.average;
            self.consumed = 0;
            self.conflicts_at_update = conflicts;
        }
        (self.average.round() as u64).max(1)
    }
}

/// Export volume tracking for the threshold feedback loop.
#[derive(Debug, Default)]
struct FlowControl {
    conflicts: u64,
    backlog: usize,
}

/// One worker's side of the exchange protocol.
pub struct PeriodicWorker {
    id: usize,
    num_workers: usize,
    coordinator: Arc<Coordinator>,
    config: ExchangeConfig,
    channels: WorkerChannels,

    period: u64,
    period_length: u64,
    work: u64,
    stopped: bool,

    export: ExportBuffer,
    pending: ImportBatch,
    last_forced: u64,

    adaptive: AdaptiveLength,
    flow: FlowControl,

    started: Instant,
    timer: PhaseTimer,
    stats: WorkerStatistics,
}

impl PeriodicWorker {
    pub fn new(
        id: usize,
        coordinator: Arc<Coordinator>,
        config: &ExchangeConfig,
        channels: WorkerChannels,
    ) -> Self {
        assert!(
            id < coordinator.num_workers(),
            "worker {} out of range for {} workers",
            id,
            coordinator.num_workers()
        );
        Self {
            id,
            num_workers: coordinator.num_workers(),
            period_length: coordinator.period_length(),
            coordinator,
            config: config.clone(),
            channels,
            period: 0,
            work: 0,
            stopped: false,
            export: ExportBuffer::new(),
            pending: ImportBatch::default(),
            last_forced: 0,
            adaptive: AdaptiveLength::new(config),
            flow: FlowControl::default(),
            started: Instant::now(),
            timer: PhaseTimer::new(),
            stats: WorkerStatistics::new(id),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Current local period
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Work units making up the current period
    pub fn period_length(&self) -> u64 {
        self.period_length
    }

    /// Whether the worker has told its engine to stop
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Advance the logical clock by `units` of engine work
    pub fn add_work(&mut self, units: u64) {
        self.work = self.work.saturating_add(units);
    }

    /// Whether enough work accumulated to end the current period
    pub fn at_boundary(&self) -> bool {
        self.work >= self.period_length
    }

    /// Stage a learnt clause for export
    pub fn export_candidate(&mut self, clause: Clause, quality: u32) {
        if clause.is_empty() {
            return;
        }
        self.export.add(clause, quality);
    }

    /// Imported clauses not yet taken by the engine
    pub fn pending_imports(&self) -> &ImportBatch {
        &self.pending
    }

    fn mailbox(&self) -> &ProducerMailbox {
        self.coordinator.mailbox(self.id)
    }

    /// Run one period boundary if the work budget is used up.
    ///
    /// Returns `false` once the worker must stop; the engine should then return
    /// from `solve` without further work. Calling it before the boundary is
    /// reached only reports whether the worker is still running.
    pub fn check_period<E: SolvingEngine + ?Sized>(&mut self, engine: &mut E) -> bool {
        if self.stopped {
            return false;
        }
        if !self.at_boundary() {
            return true;
        }

        let engine_stats = engine.statistics();

        self.timer.start(Phase::Exchanging);
        let exported = self.export_clauses(engine, engine_stats.conflicts);

        self.timer.start(Phase::PeriodUpdate);
        let candidate = self
            .adaptive
            .update(self.period_length, engine_stats.conflicts);
        self.mailbox().advance_period(candidate);

        self.timer.start(Phase::Exchanging);
        let (imported, next_length) = self.import_clauses();

        self.timer.start(Phase::PeriodUpdate);
        self.work = self.work.saturating_sub(self.period_length);
        self.period += 1;
        self.period_length = next_length;
        self.stats.periods += 1;

        debug!(
            worker = self.id,
            period = self.period,
            exported,
            imported,
            next_length,
            "period boundary"
        );
        self.channels.progress.publish(ProgressSnapshot {
            period: self.period,
            period_length: self.period_length,
            conflicts: engine_stats.conflicts,
            propagations: engine_stats.propagations,
            imported: self.stats.imported_clauses,
            exported: self.stats.exported_clauses,
        });

        let stop = self.termination_requested();
        self.timer.start(Phase::Running);
        if stop {
            self.stopped = true;
        }
        !stop
    }

    fn export_clauses<E: SolvingEngine + ?Sized>(&mut self, engine: &mut E, conflicts: u64) -> usize {
        let tail = self.mailbox().tail();
        let budget = self.config.export_literal_budget;
        let summary = self.export.drain_into(&tail, budget);

        self.stats.exported_clauses += summary.clauses as u64;
        self.stats.exported_literals += summary.literals as u64;
        if summary.oversized > 0 {
            self.stats.oversized_clauses += summary.oversized as u64;
            warn!(
                worker = self.id,
                dropped = summary.oversized,
                budget,
                "dropped clauses longer than the export budget"
            );
        }

        if budget > 0 && conflicts != self.flow.conflicts {
            let backlog = self.export.num_literals();
            let growing = backlog > self.flow.backlog;
            let target = budget as f64 * self.config.export_literal_margin;
            if (backlog as f64) < target && !growing {
                engine.relax_export_threshold();
            } else if (backlog as f64) > target && growing {
                engine.tighten_export_threshold();
            }
            self.flow = FlowControl { conflicts, backlog };
        }

        summary.clauses
    }

    /// Import every other worker's lagged set and return the number of clauses
    /// received together with the next period length.
    fn import_clauses(&mut self) -> (usize, u64) {
        let margin = self.coordinator.margin();
        if self.period < margin {
            return (0, self.period_length);
        }
        let target = self.period - margin;

        let mut imported = 0;
        let mut length_sum = 0u64;
        let mut candidates = 0u64;

        for offset in 1..self.num_workers {
            let producer = (self.id + offset) % self.num_workers;
            let mailbox = self.coordinator.mailbox(producer);

            while let Some(set) = mailbox.fetch(self.id, target) {
                if !set.is_completed() {
                    if self.config.non_deterministic {
                        break;
                    }
                    self.timer.start(Phase::Waiting);
                    set.wait_completed();
                    self.timer.start(Phase::Exchanging);
                }

                if let Some(clauses) = set.clauses() {
                    imported += clauses.len();
                    for clause in clauses {
                        self.pending.push(clause.clone());
                    }
                }
                if set.period() == target
                    && let Some(length) = set.next_length_candidate()
                {
                    length_sum += length;
                    candidates += 1;
                }
                mailbox.acknowledge_fetched(self.id, &set);
            }
        }
        self.stats.imported_clauses += imported as u64;

        if !self.adaptive.enabled() {
            return (imported, self.period_length);
        }

        if let Some(length) = self
            .mailbox()
            .fetch_own(target)
            .and_then(|own| own.next_length_candidate())
        {
            length_sum += length;
            candidates += 1;
        }
        if candidates == 0 {
            return (imported, self.period_length);
        }

        let mut next = length_sum / candidates;
        if self.config.adaptive_lower_bound > 0 {
            next = next.max(self.config.adaptive_lower_bound);
        }
        if self.config.adaptive_upper_bound > 0 {
            next = next.min(self.config.adaptive_upper_bound);
        }
        (imported, next.max(1))
    }

    fn termination_requested(&self) -> bool {
        if self.coordinator.should_terminate(self.period) {
            return true;
        }
        if let Some(breach) = self.config.limits.check(self.started) {
            warn!(worker = self.id, period = self.period, %breach, "stopping");
            return true;
        }
        false
    }

    /// Whether the engine should apply pending imports now.
    ///
    /// Fires when units are pending, or when the pending non-unit clauses per
    /// worker reach the configured threshold, provided at least
    /// `fapp_periods` periods passed since the last forced application.
    pub fn should_apply(&mut self) -> bool {
        if self.period < self.last_forced + self.config.fapp_periods {
            return false;
        }
        let units = !self.pending.units.is_empty();
        let clauses = self.config.fapp_clauses > 0
            && self.pending.clauses.len() / self.num_workers >= self.config.fapp_clauses;
        if units || clauses {
            self.last_forced = self.period;
            self.stats.forced_applications += 1;
            return true;
        }
        false
    }

    /// Move the pending imports out.
    ///
    /// Boundaries reached while the returned batch is being applied collect
    /// into a fresh pending batch.
    pub fn take_imported(&mut self) -> ImportBatch {
        std::mem::take(&mut self.pending)
    }

    /// Take the pending imports and hand them to `engine`
    pub fn apply_imported<E: SolvingEngine + ?Sized>(&mut self, engine: &mut E) -> ApplyOutcome {
        let batch = self.take_imported();
        if batch.is_empty() {
            return ApplyOutcome::Ok;
        }
        engine.apply_imported_clauses(&batch.units, &batch.clauses)
    }

    /// Statistics gathered so far, without engine counters
    pub fn statistics(&self) -> WorkerStatistics {
        let mut stats = self.stats.clone();
        stats.period_length = self.period_length;
        stats.phase_times = self.timer.times();
        stats
    }

    /// Drive `engine` to completion and report to the coordinator and host.
    pub fn run<E: SolvingEngine + ?Sized>(mut self, engine: &mut E) -> WorkerStatistics {
        let guard = StopGuard {
            coordinator: Arc::clone(&self.coordinator),
            worker: self.id,
        };
        self.coordinator.register_start();
        self.timer.start(Phase::Running);

        let result = engine.solve(&mut self);
        self.timer.stop();

        let best = self.coordinator.report_result(result, self.period, self.id);
        debug!(worker = self.id, period = self.period, %result, best, "worker finished");

        self.mailbox().close(self.period_length);
        drop(guard);

        let mut stats = self.statistics();
        stats.result = result;
        stats.engine = engine.statistics();
        stats.export_threshold = engine.export_threshold();

        // The host may already have given up on us.
        let _ = self.channels.to_host.send(WorkerMessage::Finished {
            worker_id: self.id,
            statistics: stats.clone(),
        });
        stats
    }
}

/// Keeps the live count and the worker's mailbox consistent if the engine
/// panics out of `run`.
struct StopGuard {
    coordinator: Arc<Coordinator>,
    worker: usize,
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        let length = self.coordinator.period_length();
        self.coordinator.mailbox(self.worker).close(length);
        self.coordinator.register_stop();
    }
}
