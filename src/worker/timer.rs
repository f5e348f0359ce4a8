//! Wall-time accounting per worker phase

use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Inside the engine's own search
    Running,
    /// Blocked on another worker's period set
    Waiting,
    /// Exporting and importing clauses
    Exchanging,
    /// Period length computation and bookkeeping
    PeriodUpdate,
}

impl Phase {
    const ALL: [Phase; 4] = [
        Phase::Running,
        Phase::Waiting,
        Phase::Exchanging,
        Phase::PeriodUpdate,
    ];

    fn index(self) -> usize {
        match self {
            Phase::Running => 0,
            Phase::Waiting => 1,
            Phase::Exchanging => 2,
            Phase::PeriodUpdate => 3,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Running => write!(f, "running"),
            Phase::Waiting => write!(f, "waiting"),
            Phase::Exchanging => write!(f, "exchanging"),
            Phase::PeriodUpdate => write!(f, "period-update"),
        }
    }
}

/// Accumulated time per phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimes([Duration; 4]);

impl PhaseTimes {
    pub fn get(&self, phase: Phase) -> Duration {
        self.0[phase.index()]
    }

    pub fn total(&self) -> Duration {
        self.0.iter().sum()
    }

    /// Everything except time spent blocked on other workers
    pub fn non_waiting(&self) -> Duration {
        self.total() - self.get(Phase::Waiting)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Phase, Duration)> + '_ {
        Phase::ALL.iter().map(|&p| (p, self.get(p)))
    }
}

/// Stopwatch that charges elapsed time to one phase at a time
#[derive(Debug, Default)]
pub struct PhaseTimer {
    times: PhaseTimes,
    current: Option<(Phase, Instant)>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the running phase (if any) and start `phase`
    pub fn start(&mut self, phase: Phase) {
        self.stop();
        self.current = Some((phase, Instant::now()));
    }

    pub fn stop(&mut self) {
        if let Some((phase, since)) = self.current.take() {
            self.times.0[phase.index()] += since.elapsed();
        }
    }

    /// Phase currently being charged
    pub fn current(&self) -> Option<Phase> {
        self.current.map(|(p, _)| p)
    }

    pub fn times(&self) -> PhaseTimes {
        let mut times = self.times;
        if let Some((phase, since)) = self.current {
            times.0[phase.index()] += since.elapsed();
        }
        times
    }
}
