//! Performance instrumentation for the drag pipeline's hot paths.
//!
//! `Location` notifications arrive at input rate, so hit testing and the
//! content round trip are timed. Slow operations are reported via `tracing`.
//!
//! ```ignore
//! fn resolve(&self) {
//!     profile_scope!("hit_test");  // no-op unless built with `profiling`
//! }
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};
#[cfg(not(feature = "profiling"))]
use tracing::warn;
#[cfg(feature = "profiling")]
use tracing::trace;

/// Number of samples kept for rolling statistics
const SAMPLE_COUNT: usize = 100;

/// Profile a scope with the given name. Zero-cost when profiling is disabled.
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        #[cfg(feature = "profiling")]
        let _timer = $crate::perf::ScopedTimer::for_profiling($name);
        #[cfg(not(feature = "profiling"))]
        let _ = $name;
    };
}

pub use crate::profile_scope;

// ============================================================================
// Scoped Timer
// ============================================================================

/// Logs a warning on drop when the scope took longer than its threshold.
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
    threshold_ms: f64,
}

impl ScopedTimer {
    pub fn new(name: &'static str, threshold_ms: f64) -> Self {
        Self {
            name,
            start: Instant::now(),
            threshold_ms,
        }
    }

    /// Timer with a 1ms threshold, used by `profile_scope!`
    pub fn for_profiling(name: &'static str) -> Self {
        Self::new(name, 1.0)
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        if elapsed_ms <= self.threshold_ms {
            return;
        }

        #[cfg(feature = "profiling")]
        trace!("[PERF] {}: {:.2}ms", self.name, elapsed_ms);

        #[cfg(not(feature = "profiling"))]
        warn!(
            operation = self.name,
            elapsed_ms = format!("{:.2}", elapsed_ms),
            threshold_ms = format!("{:.2}", self.threshold_ms),
            "Slow operation"
        );
    }
}

// ============================================================================
// Latency statistics
// ============================================================================

/// Rolling latency statistics (content acknowledgement round trips).
#[derive(Debug, Clone)]
pub struct LatencyStats {
    samples: VecDeque<f64>,
    count: u64,
    max_ms: f64,
    sum_ms: f64,
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            samples: VecDeque::with_capacity(SAMPLE_COUNT),
            count: 0,
            max_ms: 0.0,
            sum_ms: 0.0,
        }
    }
}

impl LatencyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        if self.samples.len() >= SAMPLE_COUNT {
            if let Some(old) = self.samples.pop_front() {
                self.sum_ms -= old;
            }
        }
        self.samples.push_back(ms);
        self.sum_ms += ms;
        self.count += 1;
        self.max_ms = self.max_ms.max(ms);
    }

    /// Total number of recorded samples, including evicted ones
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum_ms / self.samples.len() as f64
        }
    }

    pub fn p95(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((sorted.len() as f64) * 0.95).floor() as usize;
        sorted.get(idx.min(sorted.len() - 1)).copied().unwrap_or(0.0)
    }

    /// Largest sample ever recorded
    pub fn max(&self) -> f64 {
        self.max_ms
    }
}
