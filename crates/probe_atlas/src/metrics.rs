//! Engine-agnostic metrics for probe drawing.
//!
//! Feature-gated and runtime-toggled; with the `metrics` feature off,
//! [`is_enabled`] is always false and nothing is recorded.
//!
//! # Usage
//!
//! ```ignore
//! use probe_atlas::metrics::COLLECT_METRICS;
//!
//! // Compile with --features metrics
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! let report = driver.draw_frame(&mut probes, &mut atlases, &mut binder, &mut renderer);
//! let avg = driver.metrics().avg_frame_us();
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

use crate::probe::DrawReport;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// True when metrics are compiled in and switched on.
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Fixed-capacity history, oldest values dropped first.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl RollingWindow<u64> {
    pub fn sum(&self) -> u64 {
        self.buffer.iter().sum()
    }

    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = self.buffer.iter().min()?;
        let max = self.buffer.iter().max()?;
        Some((*min, *max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128) // ~2 seconds at 60fps
    }
}

/// Probe drawing statistics, updated once per `draw_frame`.
#[derive(Debug, Clone, Default)]
pub struct DriverMetrics {
    /// Last frame's totals.
    pub last_frame: DrawReport,
    /// Rolling window of frame draw times in microseconds.
    pub frame_timings: RollingWindow<u64>,
    /// Frames recorded this session.
    pub frames: u64,
    /// Faces rendered this session.
    pub total_faces_rendered: u64,
    /// Faces that could not be drawn this session.
    pub total_failures: u64,
    /// Probe skips (static, already rendered) this session.
    pub total_skipped: u64,
}

impl DriverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame. No-op when metrics are disabled.
    pub fn record_frame(&mut self, report: &DrawReport, timing_us: u64) {
        if !is_enabled() {
            return;
        }
        self.last_frame = *report;
        self.frame_timings.push(timing_us);
        self.frames += 1;
        self.total_faces_rendered += report.faces_rendered as u64;
        self.total_failures += report.faces_failed as u64;
        self.total_skipped += report.probes_skipped as u64;
    }

    pub fn avg_frame_us(&self) -> f64 {
        self.frame_timings.average()
    }

    /// Clear per-session counters; the timing window is kept.
    pub fn reset(&mut self) {
        self.last_frame = DrawReport::default();
        self.frames = 0;
        self.total_faces_rendered = 0;
        self.total_failures = 0;
        self.total_skipped = 0;
    }
}
