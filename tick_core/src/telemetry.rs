use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Instrumentation side channel.
///
/// Controllers report every invoked record as `"<owner>.<method>()"`.
/// Nothing here may influence scheduling.
pub trait TickProfiler: Send + Sync {
    fn begin_scope(&self, _label: &str) {}
    fn end_scope(&self, label: &str, elapsed: Duration);
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScopeStats {
    pub calls: u64,
    pub total: Duration,
    pub max: Duration,
}

/// Per-label timing accumulator shared with the controllers.
#[derive(Default)]
pub struct ScopeTimings {
    scopes: Mutex<HashMap<String, ScopeStats>>,
}

impl ScopeTimings {
    pub fn record(&self, label: &str, elapsed: Duration) {
        let mut scopes = self.scopes.lock();
        if !scopes.contains_key(label) {
            scopes.insert(label.to_string(), ScopeStats::default());
        }
        if let Some(stats) = scopes.get_mut(label) {
            stats.calls += 1;
            stats.total += elapsed;
            stats.max = stats.max.max(elapsed);
        }
    }

    pub fn get(&self, label: &str) -> Option<ScopeStats> {
        self.scopes.lock().get(label).copied()
    }

    /// Label with the largest accumulated time.
    pub fn slowest(&self) -> Option<(String, ScopeStats)> {
        self.scopes
            .lock()
            .iter()
            .max_by_key(|(_, s)| s.total)
            .map(|(k, s)| (k.clone(), *s))
    }

    pub fn reset(&self) {
        self.scopes.lock().clear();
    }
}

impl TickProfiler for ScopeTimings {
    #[inline]
    fn end_scope(&self, label: &str, elapsed: Duration) {
        self.record(label, elapsed);
    }
}

/// Frame-level counters owned by the host driver.
pub struct Telemetry {
    timings: Arc<ScopeTimings>,

    pub tick_rate: f32,
    pub dt_ms: f32,
    pub fixed_alpha: f32,
    pub fixed_tick: u64,

    rate_last: Instant,
    rate_frames: u32,
    rate_period_sec: f32,
    rate_enabled: bool,
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            timings: Arc::new(ScopeTimings::default()),
            tick_rate: 0.0,
            dt_ms: 0.0,
            fixed_alpha: 0.0,
            fixed_tick: 0,
            rate_last: Instant::now(),
            rate_frames: 0,
            rate_period_sec: 1.0,
            rate_enabled: true,
        }
    }

    /// Profiler to hand to the tick service.
    pub fn profiler(&self) -> Arc<dyn TickProfiler> {
        self.timings.clone()
    }

    #[inline]
    pub fn timings(&self) -> &ScopeTimings {
        &self.timings
    }

    pub fn configure_rate_logging(&mut self, enabled: bool, period_sec: f32) {
        self.rate_enabled = enabled;
        self.rate_period_sec = period_sec.max(0.25);
    }

    #[inline]
    pub fn record_scope(&mut self, name: &str, dur: Duration) {
        self.timings.record(name, dur);
    }

    pub fn frame_tick(&mut self, dt: Duration, fixed_alpha: f32, fixed_tick: u64) {
        self.dt_ms = dt.as_secs_f32() * 1000.0;
        self.fixed_alpha = fixed_alpha;
        self.fixed_tick = fixed_tick;

        if !self.rate_enabled {
            return;
        }

        self.rate_frames += 1;
        let elapsed = self.rate_last.elapsed().as_secs_f32();
        if elapsed < self.rate_period_sec {
            return;
        }

        self.tick_rate = (self.rate_frames as f32) / elapsed.max(0.0001);

        match self.timings.slowest() {
            Some((label, s)) => log::info!(
                "frames/s={:.1} dt_ms={:.2} fixed_alpha={:.2} fixed_tick={} slowest={} ({} calls, {:.3} ms max)",
                self.tick_rate,
                self.dt_ms,
                self.fixed_alpha,
                self.fixed_tick,
                label,
                s.calls,
                s.max.as_secs_f64() * 1000.0
            ),
            None => log::info!(
                "frames/s={:.1} dt_ms={:.2} fixed_alpha={:.2} fixed_tick={}",
                self.tick_rate,
                self.dt_ms,
                self.fixed_alpha,
                self.fixed_tick
            ),
        }

        self.timings.reset();
        self.rate_frames = 0;
        self.rate_last = Instant::now();
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}
