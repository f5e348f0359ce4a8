//! Configuration for the deterministic clause exchange.

use crate::error::{ExchangeError, ExchangeResult};
use crate::worker::limits::ResourceLimits;

/// Configuration shared by the coordinator and every worker.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Number of worker threads to spawn.
    pub num_workers: usize,
    /// Import lag in periods, also the termination grace window.
    pub margin: u64,
    /// Default period length in engine work units.
    pub period_length: u64,
    /// Skip incomplete sets instead of waiting (breaks reproducibility).
    pub non_deterministic: bool,
    /// Pending non-unit clauses per worker that force an application (0 = rule disabled).
    pub fapp_clauses: usize,
    /// Minimum periods between two forced applications.
    pub fapp_periods: u64,
    /// Conflicts per period targeted by adaptive period length (0 = fixed length).
    pub adaptive_conflicts: u64,
    /// Lower clamp on the adaptive period length (0 = none).
    pub adaptive_lower_bound: u64,
    /// Upper clamp on the adaptive period length (0 = none).
    pub adaptive_upper_bound: u64,
    /// Smoothing factor of the period length moving average.
    pub adaptive_smoothing: f64,
    /// Literals exported per period (0 = unlimited).
    pub export_literal_budget: usize,
    /// Allowed export backlog as a multiple of the literal budget.
    pub export_literal_margin: f64,
    /// Time and memory limits checked at every period boundary.
    pub limits: ResourceLimits,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            margin: 20,
            period_length: 1_000_000,
            non_deterministic: false,
            fapp_clauses: 10_000,
            fapp_periods: 50,
            adaptive_conflicts: 0,
            adaptive_lower_bound: 0,
            adaptive_upper_bound: 0,
            adaptive_smoothing: 0.1,
            export_literal_budget: 150,
            export_literal_margin: 3.0,
            limits: ResourceLimits::default(),
        }
    }
}

impl ExchangeConfig {
    /// Set the number of workers (at least one).
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    pub fn with_margin(mut self, margin: u64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_period_length(mut self, period_length: u64) -> Self {
        self.period_length = period_length;
        self
    }

    /// Enable the fast, non-reproducible import mode.
    pub fn with_non_deterministic(mut self, enabled: bool) -> Self {
        self.non_deterministic = enabled;
        self
    }

    pub fn with_forced_application(mut self, clauses: usize, periods: u64) -> Self {
        self.fapp_clauses = clauses;
        self.fapp_periods = periods;
        self
    }

    /// Enable adaptive period length targeting `conflicts` conflicts per period.
    pub fn with_adaptive_period(mut self, conflicts: u64, smoothing: f64) -> Self {
        self.adaptive_conflicts = conflicts;
        self.adaptive_smoothing = smoothing;
        self
    }

    pub fn with_adaptive_bounds(mut self, lower: u64, upper: u64) -> Self {
        self.adaptive_lower_bound = lower;
        self.adaptive_upper_bound = upper;
        self
    }

    pub fn with_export_budget(mut self, literals: usize, margin: f64) -> Self {
        self.export_literal_budget = literals;
        self.export_literal_margin = margin;
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn adaptive_enabled(&self) -> bool {
        self.adaptive_conflicts > 0
    }

    /// Check value ranges before any thread is started.
    pub fn validate(&self) -> ExchangeResult<()> {
        if self.num_workers == 0 {
            return Err(ExchangeError::NoWorkers);
        }
        if self.period_length == 0 {
            return Err(ExchangeError::InvalidConfig(
                "period length must be positive".to_string(),
            ));
        }
        if !(self.adaptive_smoothing > 0.0 && self.adaptive_smoothing <= 1.0) {
            return Err(ExchangeError::InvalidConfig(format!(
                "adaptive smoothing must be in (0, 1], got {}",
                self.adaptive_smoothing
            )));
        }
        if self.export_literal_margin.is_nan() || self.export_literal_margin < 0.0 {
            return Err(ExchangeError::InvalidConfig(format!(
                "export literal margin must be non-negative, got {}",
                self.export_literal_margin
            )));
        }
        if self.adaptive_lower_bound > 0
            && self.adaptive_upper_bound > 0
            && self.adaptive_lower_bound > self.adaptive_upper_bound
        {
            return Err(ExchangeError::InvalidConfig(format!(
                "adaptive period bounds are inverted: {} > {}",
                self.adaptive_lower_bound, self.adaptive_upper_bound
            )));
        }
        Ok(())
    }
}

/// Reduce the worker count so that the estimated solving memory fits the limit.
///
/// Only applies when the loaded input is large (at least 250 MB); the memory a
/// worker needs is estimated as `used_after_load_mb * factor`.
pub fn adjust_worker_count(
    requested: usize,
    memory_limit_mb: f64,
    used_after_load_mb: f64,
    factor: u32,
) -> usize {
    if factor == 0 || memory_limit_mb <= 0.0 || used_after_load_mb < 250.0 {
        return requested;
    }
    let affordable = (memory_limit_mb / (used_after_load_mb * factor as f64)) as usize;
    affordable.clamp(1, requested.max(1))
}
