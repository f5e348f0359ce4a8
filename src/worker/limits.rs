//! Externally injected resource limits
//!
//! Breaching a limit is not an error: the worker simply stops at its next
//! period boundary, exactly as if the coordinator had told it to.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the process's current memory usage
pub trait MemoryGauge: Send + Sync {
    /// Resident memory in megabytes, or `None` if it cannot be measured
    fn used_megabytes(&self) -> Option<f64>;
}

/// Reads resident set size from `/proc/self/status`
///
/// `VmRSS` is reported in kB by the kernel, so the figure does not depend on
/// the page size.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcStatusGauge;

impl MemoryGauge for ProcStatusGauge {
    fn used_megabytes(&self) -> Option<f64> {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        parse_vm_rss(&status)
    }
}

/// Resident set size in megabytes from the contents of a `status` file
fn parse_vm_rss(status: &str) -> Option<f64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let mut fields = line["VmRSS:".len()..].split_whitespace();
    let kilobytes: f64 = fields.next()?.parse().ok()?;
    if fields.next() != Some("kB") {
        return None;
    }
    Some(kilobytes / 1024.0)
}

/// Why a worker stopped for resource reasons
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitBreach {
    Time { elapsed: Duration },
    Memory { used_mb: f64 },
}

impl fmt::Display for LimitBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitBreach::Time { elapsed } => write!(f, "time limit exceeded after {:.2?}", elapsed),
            LimitBreach::Memory { used_mb } => write!(f, "memory limit exceeded ({:.1} MB)", used_mb),
        }
    }
}

#[derive(Clone)]
pub struct ResourceLimits {
    pub time_limit: Option<Duration>,
    pub memory_limit_mb: Option<f64>,
    pub gauge: Arc<dyn MemoryGauge>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            time_limit: None,
            memory_limit_mb: None,
            gauge: Arc::new(ProcStatusGauge),
        }
    }
}

impl fmt::Debug for ResourceLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLimits")
            .field("time_limit", &self.time_limit)
            .field("memory_limit_mb", &self.memory_limit_mb)
            .finish_non_exhaustive()
    }
}

impl ResourceLimits {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_memory_limit(mut self, megabytes: f64) -> Self {
        self.memory_limit_mb = Some(megabytes);
        self
    }

    pub fn with_gauge(mut self, gauge: Arc<dyn MemoryGauge>) -> Self {
        self.gauge = gauge;
        self
    }

    /// First limit breached since `started`, if any
    pub fn check(&self, started: Instant) -> Option<LimitBreach> {
        if let Some(limit) = self.time_limit {
            let elapsed = started.elapsed();
            if elapsed > limit {
                return Some(LimitBreach::Time { elapsed });
            }
        }
        if let Some(limit) = self.memory_limit_mb
            && let Some(used_mb) = self.gauge.used_megabytes()
            && used_mb > limit
        {
            return Some(LimitBreach::Memory { used_mb });
        }
        None
    }
}
