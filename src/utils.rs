use std::time::{Duration, Instant};

/// Simple stopwatch for per-stage timings
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_us(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1_000_000.0
    }
}

/// Timing measurements for a single tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickTiming {
    pub capture_us: f64,
    pub match_us: f64,
    pub total_us: f64,
}

impl TickTiming {
    pub fn total_ms(&self) -> f64 {
        self.total_us / 1000.0
    }
}

/// Per-stage summary: mean, p50, p95, p99 (microseconds)
pub type StageSummary = (f64, f64, f64, f64);

/// Statistics collector for tick latency over one session
#[derive(Debug, Default)]
pub struct TickStats {
    timings: Vec<TickTiming>,
    skipped: usize,
}

impl TickStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, timing: TickTiming) {
        self.timings.push(timing);
    }

    /// Count a tick that produced no match result (capture failure etc.)
    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx]
    }

    /// Calculate statistics for a specific stage
    pub fn stage_summary(&self, extract: impl Fn(&TickTiming) -> f64) -> StageSummary {
        if self.timings.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let mut values: Vec<f64> = self.timings.iter().map(&extract).collect();
        values.sort_by(|a, b| a.total_cmp(b));

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let p50 = Self::percentile(&values, 50.0);
        let p95 = Self::percentile(&values, 95.0);
        let p99 = Self::percentile(&values, 99.0);

        (mean, p50, p95, p99)
    }

    /// Log a session summary through tracing
    pub fn log_report(&self) {
        if self.timings.is_empty() {
            tracing::info!("No tick timings collected ({} skipped)", self.skipped);
            return;
        }

        tracing::info!(
            "Match session: {} ticks, {} skipped",
            self.timings.len(),
            self.skipped
        );
        Self::log_row("Capture", self.stage_summary(|t| t.capture_us));
        Self::log_row("Match", self.stage_summary(|t| t.match_us));
        Self::log_row("Total", self.stage_summary(|t| t.total_us));
    }

    fn log_row(name: &str, stats: StageSummary) {
        tracing::info!(
            "  {:<8} mean {:>8.0} µs | p50 {:>8.0} µs | p95 {:>8.0} µs | p99 {:>8.0} µs",
            name,
            stats.0,
            stats.1,
            stats.2,
            stats.3
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(total_us: f64) -> TickTiming {
        TickTiming {
            capture_us: total_us / 4.0,
            match_us: total_us / 2.0,
            total_us,
        }
    }

    #[test]
    fn test_tick_timing_total_ms() {
        let timing = timing(50_000.0);
        assert_eq!(timing.total_ms(), 50.0);
    }

    #[test]
    fn test_tick_stats_empty() {
        let stats = TickStats::new();
        assert_eq!(stats.stage_summary(|t| t.total_us), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_tick_stats_percentiles() {
        let mut stats = TickStats::new();
        for total in (1..=100).rev() {
            stats.add(timing(f64::from(total)));
        }
        stats.add_skipped();

        let (mean, p50, p95, p99) = stats.stage_summary(|t| t.total_us);
        assert!((mean - 50.5).abs() < 1e-9);
        assert_eq!(p50, 51.0);
        assert_eq!(p95, 95.0);
        assert_eq!(p99, 99.0);
    }

    #[test]
    fn test_timer_measures_elapsed() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed() >= Duration::from_millis(5));
        assert!(timer.elapsed_us() >= 5_000.0);
    }
}
