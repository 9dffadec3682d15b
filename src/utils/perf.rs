use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lightweight packing profiling that accumulates per-stage timing
/// and logs a summary periodically.
pub struct PackStats {
    pub capture_us: AtomicU64,
    pub color_us: AtomicU64,
    pub depth_us: AtomicU64,
    pub frames_packed: AtomicU64,
    pub unsupported_topology: AtomicU64,
    pub map_failures: AtomicU64,
    pub missing_depth: AtomicU64,
    label: String,
}

/// Which step of a packing call a duration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackStep {
    Capture,
    Color,
    Depth,
}

impl PackStats {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            capture_us: AtomicU64::new(0),
            color_us: AtomicU64::new(0),
            depth_us: AtomicU64::new(0),
            frames_packed: AtomicU64::new(0),
            unsupported_topology: AtomicU64::new(0),
            map_failures: AtomicU64::new(0),
            missing_depth: AtomicU64::new(0),
            label: label.into(),
        }
    }

    pub fn record_step(&self, step: PackStep, elapsed: Duration) {
        let counter = match step {
            PackStep::Capture => &self.capture_us,
            PackStep::Color => &self.color_us,
            PackStep::Depth => &self.depth_us,
        };
        counter.fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames_packed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unsupported_topology(&self) {
        self.unsupported_topology.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_map_failure(&self) {
        self.map_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missing_depth(&self) {
        self.missing_depth.fetch_add(1, Ordering::Relaxed);
    }

    /// Frames that produced no output since the last reset.
    pub fn frames_failed(&self) -> u64 {
        self.unsupported_topology.load(Ordering::Relaxed)
            + self.map_failures.load(Ordering::Relaxed)
            + self.missing_depth.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> PackSummary {
        let n = self.frames_packed.load(Ordering::Relaxed).max(1) as f64;
        PackSummary {
            frames_packed: self.frames_packed.load(Ordering::Relaxed),
            frames_failed: self.frames_failed(),
            capture_ms: self.capture_us.load(Ordering::Relaxed) as f64 / n / 1000.0,
            color_ms: self.color_us.load(Ordering::Relaxed) as f64 / n / 1000.0,
            depth_ms: self.depth_us.load(Ordering::Relaxed) as f64 / n / 1000.0,
        }
    }

    pub fn log_summary(&self) {
        log::info!("Packer [{}]: {}", self.label, self.summary());

        // Reset counters for next interval
        self.capture_us.store(0, Ordering::Relaxed);
        self.color_us.store(0, Ordering::Relaxed);
        self.depth_us.store(0, Ordering::Relaxed);
        self.frames_packed.store(0, Ordering::Relaxed);
        self.unsupported_topology.store(0, Ordering::Relaxed);
        self.map_failures.store(0, Ordering::Relaxed);
        self.missing_depth.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of packing metrics, timings averaged per packed frame
#[derive(Debug, Clone)]
pub struct PackSummary {
    pub frames_packed: u64,
    pub frames_failed: u64,
    pub capture_ms: f64,
    pub color_ms: f64,
    pub depth_ms: f64,
}

impl std::fmt::Display for PackSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "packed={} failed={} | capture={:.2}ms color={:.2}ms depth={:.2}ms",
            self.frames_packed, self.frames_failed, self.capture_ms, self.color_ms, self.depth_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_averages() {
        let stats = PackStats::new("test");
        stats.record_frame();
        stats.record_frame();
        stats.record_step(PackStep::Color, Duration::from_millis(4));
        stats.record_map_failure();
        stats.record_unsupported_topology();

        let summary = stats.summary();
        assert_eq!(summary.frames_packed, 2);
        assert_eq!(summary.frames_failed, 2);
        assert!((summary.color_ms - 2.0).abs() < 1e-9);
        assert_eq!(summary.depth_ms, 0.0);
    }

    #[test]
    fn test_log_summary_resets() {
        let stats = PackStats::new("test");
        stats.record_frame();
        stats.record_missing_depth();
        stats.log_summary();

        assert_eq!(stats.summary().frames_packed, 0);
        assert_eq!(stats.frames_failed(), 0);
    }
}
