//! Notification channel between workers and the host thread.
//!
//! The host takes no part in the exchange protocol. It only needs to wake up
//! when a worker finishes and, between wake-ups, read progress counters for
//! its periodic log line.

use crate::result::WorkerStatistics;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Message sent from a worker to the host.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// Worker has stopped and reported its result to the coordinator.
    Finished {
        worker_id: usize,
        statistics: WorkerStatistics,
    },
}

/// Counters a worker publishes at every period boundary.
#[derive(Debug, Default)]
pub struct WorkerProgress {
    period: AtomicU64,
    period_length: AtomicU64,
    conflicts: AtomicU64,
    propagations: AtomicU64,
    imported: AtomicU64,
    exported: AtomicU64,
}

/// Point-in-time copy of [`WorkerProgress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub period: u64,
    pub period_length: u64,
    pub conflicts: u64,
    pub propagations: u64,
    pub imported: u64,
    pub exported: u64,
}

impl WorkerProgress {
    pub fn publish(&self, snapshot: ProgressSnapshot) {
        self.period.store(snapshot.period, Ordering::Relaxed);
        self.period_length
            .store(snapshot.period_length, Ordering::Relaxed);
        self.conflicts.store(snapshot.conflicts, Ordering::Relaxed);
        self.propagations
            .store(snapshot.propagations, Ordering::Relaxed);
        self.imported.store(snapshot.imported, Ordering::Relaxed);
        self.exported.store(snapshot.exported, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            period: self.period.load(Ordering::Relaxed),
            period_length: self.period_length.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            propagations: self.propagations.load(Ordering::Relaxed),
            imported: self.imported.load(Ordering::Relaxed),
            exported: self.exported.load(Ordering::Relaxed),
        }
    }
}

/// Channel endpoints for a worker.
#[derive(Debug, Clone)]
pub struct WorkerChannels {
    /// Send messages to the host.
    pub to_host: Sender<WorkerMessage>,
    /// Progress counters read by the host.
    pub progress: Arc<WorkerProgress>,
}

/// Channel endpoints for the host.
#[derive(Debug)]
pub struct HostChannels {
    /// Receive messages from workers.
    pub from_workers: Receiver<WorkerMessage>,
    /// Progress counters, indexed by worker id.
    pub progress: Vec<Arc<WorkerProgress>>,
}

/// Create channels for the given number of workers.
pub fn create_channels(num_workers: usize) -> (HostChannels, Vec<WorkerChannels>) {
    // Unbounded: a finishing worker must never block on the host.
    let (worker_tx, host_rx) = unbounded();

    let progress: Vec<_> = (0..num_workers)
        .map(|_| Arc::new(WorkerProgress::default()))
        .collect();
    let worker_channels = progress
        .iter()
        .map(|p| WorkerChannels {
            to_host: worker_tx.clone(),
            progress: Arc::clone(p),
        })
        .collect();

    let host = HostChannels {
        from_workers: host_rx,
        progress,
    };

    (host, worker_channels)
}
