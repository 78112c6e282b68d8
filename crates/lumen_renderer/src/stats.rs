//! Render telemetry.

use std::time::Duration;

/// Progress and throughput of the current trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStats {
    /// Samples per pixel accumulated so far
    pub accumulated_samples: u32,
    /// Batches completed since the trace started
    pub batch_count: u32,
    /// Rays cast by the last batch, summed over all pixels
    pub last_batch_rays: u64,
    pub last_batch_duration: Duration,
    /// Wall time of the last completed trace, first batch to target
    pub last_trace_duration: Option<Duration>,
    /// Throughput of the last batch in millions of rays per second
    pub million_rays_per_second: f64,
    /// Mean throughput over the current trace
    pub average_million_rays_per_second: f64,
}

/// Millions of rays per second for `rays` cast in `elapsed`.
pub fn million_rays_per_second(rays: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if seconds <= 0.0 {
        return 0.0;
    }
    rays as f64 / seconds / 1e6
}

/// Running mean of batch throughput.
///
/// The first batch after the engine is created pays for thread-pool spin-up
/// and cold caches, so it is skipped.
#[derive(Debug, Clone)]
pub(crate) struct ThroughputHistory {
    warmup_pending: bool,
    sum: f64,
    count: u32,
}

impl ThroughputHistory {
    pub fn new() -> Self {
        Self {
            warmup_pending: true,
            sum: 0.0,
            count: 0,
        }
    }

    /// Forget the previous trace. The warm-up batch is not repeated.
    pub fn clear(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }

    /// Record one batch and return the updated mean.
    pub fn record(&mut self, mrays: f64) -> f64 {
        if self.warmup_pending {
            self.warmup_pending = false;
        } else {
            self.sum += mrays;
            self.count += 1;
        }
        self.mean()
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_million_rays_per_second() {
        let mrays = million_rays_per_second(3_000_000, Duration::from_millis(500));
        assert!((mrays - 6.0).abs() < 1e-9);
        assert_eq!(million_rays_per_second(10, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_history_skips_warmup_batch() {
        let mut history = ThroughputHistory::new();
        assert_eq!(history.record(1.0), 0.0);
        assert_eq!(history.record(4.0), 4.0);
        assert_eq!(history.record(2.0), 3.0);

        history.clear();
        assert_eq!(history.mean(), 0.0);
        // Warm-up only applies once per engine
        assert_eq!(history.record(5.0), 5.0);
    }
}
