use std::time::{Duration, Instant};

use crate::{
    config::TickConfig,
    error::{TickError, TickResult},
    frame::FrameConstitution,
    phase::TickPhase,
    service::TickService,
    telemetry::Telemetry,
};

/// Timing snapshot maintained by the frame driver.
#[derive(Debug, Clone, Default)]
pub struct Time {
    /// Clamped real delta of the last frame.
    pub dt_sec: f32,
    pub t_sec: f64,
    pub frame_index: u64,

    pub fixed_tick_index: u64,
    /// Accumulator remainder after the fixed steps of the last frame, in `[0..1]`.
    pub fixed_alpha: f32,
}

/// What one [`FrameDriver::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub fixed_steps: u32,
    pub dt_sec: f32,
    pub fixed_alpha: f32,
    /// The fixed-step cap was hit and the accumulator dropped.
    pub capped: bool,
}

/// Host binding: turns elapsed real time into phase occurrences.
///
/// Every frame runs `FixedUpdate` zero or more times with the fixed step,
/// then `Update` and `LateUpdate` once with the clamped real delta.
pub struct FrameDriver {
    service: TickService,
    constitution: FrameConstitution,
    time: Time,
    telemetry: Telemetry,

    accumulator: f32,
    shut_down: bool,
}

impl FrameDriver {
    pub fn new(service: TickService, constitution: FrameConstitution, mut telemetry: Telemetry) -> Self {
        telemetry.configure_rate_logging(
            constitution.log_tick_rate,
            constitution.tick_rate_log_period_sec,
        );

        Self {
            service,
            time: Time::default(),
            constitution,
            telemetry,
            accumulator: 0.0,
            shut_down: false,
        }
    }

    /// Builds a profiled service and a driver for it from `cfg`.
    pub fn from_config(cfg: &TickConfig) -> Self {
        let telemetry = Telemetry::new();
        let service = TickService::with_profiler(telemetry.profiler());
        Self::new(service, FrameConstitution::from(&cfg.frame), telemetry)
    }

    #[inline]
    pub fn service(&self) -> &TickService {
        &self.service
    }

    #[inline]
    pub fn time(&self) -> &Time {
        &self.time
    }

    #[inline]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    #[inline]
    pub fn constitution(&self) -> &FrameConstitution {
        &self.constitution
    }

    /// Runs one logical frame for `raw_dt` of elapsed real time.
    ///
    /// A failing callback only cuts short its own phase occurrence; the rest of
    /// the frame still runs and the first failure is returned afterwards.
    pub fn advance(&mut self, raw_dt: Duration) -> TickResult<FrameReport> {
        if self.shut_down {
            log::warn!("advance after shutdown");
            return Err(TickError::Disposed);
        }

        let mut dt_sec = raw_dt.as_secs_f32();
        if !dt_sec.is_finite() || dt_sec < 0.0 {
            dt_sec = 0.0;
        }
        dt_sec = dt_sec.min(self.constitution.max_dt_sec);

        self.time.dt_sec = dt_sec;
        self.time.t_sec += raw_dt.as_secs_f64();
        self.time.frame_index += 1;

        self.accumulator += dt_sec;

        let fixed_dt = self.constitution.fixed_dt_sec;
        let mut first_err: Option<TickError> = None;
        let mut steps: u32 = 0;
        let mut capped = false;

        // Spiral-of-death guard: drop the backlog instead of catching up.
        while self.accumulator >= fixed_dt {
            if steps >= self.constitution.max_fixed_steps_per_frame {
                self.accumulator = 0.0;
                capped = true;
                log::warn!("fixed step cap reached (spiral prevented)");
                break;
            }

            self.time.fixed_tick_index += 1;
            self.run_phase(TickPhase::FixedUpdate, fixed_dt, &mut first_err);

            self.accumulator -= fixed_dt;
            steps += 1;

            if self.time.fixed_tick_index % 600 == 0 {
                log::debug!("fixed tick {}", self.time.fixed_tick_index);
            }
        }

        self.time.fixed_alpha = (self.accumulator / fixed_dt).clamp(0.0, 1.0);

        self.run_phase(TickPhase::Update, dt_sec, &mut first_err);
        self.run_phase(TickPhase::LateUpdate, dt_sec, &mut first_err);

        self.telemetry
            .frame_tick(raw_dt, self.time.fixed_alpha, self.time.fixed_tick_index);

        match first_err {
            Some(e) => Err(e),
            None => Ok(FrameReport {
                fixed_steps: steps,
                dt_sec,
                fixed_alpha: self.time.fixed_alpha,
                capped,
            }),
        }
    }

    /// Disposes the service once; later `advance` calls fail.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.service.dispose();
        log::info!(
            "shutdown after {} frames / {} fixed ticks",
            self.time.frame_index,
            self.time.fixed_tick_index
        );
    }

    /// A controller disposed on its own is detached: its phase is skipped.
    fn run_phase(&mut self, phase: TickPhase, dt: f32, first_err: &mut Option<TickError>) {
        if self.service.controller(phase).is_disposed() {
            return;
        }

        let t0 = Instant::now();
        let r = self.service.invoke(phase, dt);
        self.telemetry.record_scope(phase.as_str(), t0.elapsed());

        if let Err(e) = r {
            log::error!("{e}");
            first_err.get_or_insert(e);
        }
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameConfig;
    use crate::phase::PhaseSet;
    use crate::tickable::{shared, Tickable};
    use std::sync::Arc;

    #[derive(Default)]
    struct Trace {
        calls: Vec<(TickPhase, f32)>,
        fail_fixed: bool,
    }

    impl Tickable for Trace {
        const PHASES: PhaseSet = PhaseSet::ALL;

        fn fixed_tick(&mut self, dt: f32) -> TickResult<()> {
            self.calls.push((TickPhase::FixedUpdate, dt));
            if self.fail_fixed {
                return Err("fixed failed".into());
            }
            Ok(())
        }

        fn tick(&mut self, dt: f32) -> TickResult<()> {
            self.calls.push((TickPhase::Update, dt));
            Ok(())
        }

        fn late_tick(&mut self, dt: f32) -> TickResult<()> {
            self.calls.push((TickPhase::LateUpdate, dt));
            Ok(())
        }
    }

    fn driver(fixed_hz: u32, max_steps: u32) -> FrameDriver {
        let cfg = FrameConfig {
            fixed_hz,
            max_fixed_steps_per_frame: max_steps,
            max_dt_ms: 250,
            log_tick_rate: false,
            tick_rate_log_period_ms: 1000,
        };
        FrameDriver::new(TickService::new(), FrameConstitution::from(&cfg), Telemetry::new())
    }

    #[test]
    fn phases_run_in_frame_order_with_their_deltas() {
        let mut d = driver(100, 8);
        let e = shared(Trace::default());
        let _h = d.service().register(&e);

        let report = d.advance(Duration::from_millis(25)).unwrap();
        assert_eq!(report.fixed_steps, 2);
        assert!(!report.capped);
        assert!((report.fixed_alpha - 0.5).abs() < 1e-3);

        let phases: Vec<_> = e.lock().calls.iter().map(|(p, _)| *p).collect();
        assert_eq!(
            phases,
            vec![
                TickPhase::FixedUpdate,
                TickPhase::FixedUpdate,
                TickPhase::Update,
                TickPhase::LateUpdate
            ]
        );

        let trace = e.lock();
        let calls = &trace.calls;
        assert!((calls[0].1 - 0.01).abs() < 1e-6);
        assert!((calls[2].1 - 0.025).abs() < 1e-6);
        assert_eq!(d.time().fixed_tick_index, 2);
        assert_eq!(d.time().frame_index, 1);
    }

    #[test]
    fn long_frames_are_clamped_and_capped() {
        let mut d = driver(60, 8);
        let report = d.advance(Duration::from_secs(3)).unwrap();
        assert!((report.dt_sec - 0.25).abs() < 1e-6);
        assert_eq!(report.fixed_steps, 8);
        assert!(report.capped);
        assert_eq!(report.fixed_alpha, 0.0);
    }

    #[test]
    fn fixed_failure_does_not_skip_later_phases() {
        let mut d = driver(100, 8);
        let e = shared(Trace {
            fail_fixed: true,
            ..Trace::default()
        });
        d.service().register(&e);

        let err = d.advance(Duration::from_millis(15)).unwrap_err();
        assert!(matches!(err, TickError::Callback { phase: TickPhase::FixedUpdate, .. }));

        let phases: Vec<_> = e.lock().calls.iter().map(|(p, _)| *p).collect();
        assert_eq!(
            phases,
            vec![TickPhase::FixedUpdate, TickPhase::Update, TickPhase::LateUpdate]
        );
    }

    #[test]
    fn shutdown_disposes_service_once() {
        let mut d = driver(60, 8);
        let e = shared(Trace::default());
        let h = d.service().register(&e);
        d.advance(Duration::from_millis(20)).unwrap();

        d.shutdown();
        d.shutdown();

        assert!(h.is_disposed());
        assert!(d.service().is_disposed());
        assert!(matches!(d.advance(Duration::from_millis(20)), Err(TickError::Disposed)));
        assert_eq!(Arc::strong_count(&e), 1);
    }

    #[test]
    fn phase_scopes_reach_telemetry() {
        let mut cfg = TickConfig::default();
        cfg.frame.log_tick_rate = false;
        let mut d = FrameDriver::from_config(&cfg);
        d.telemetry().timings().reset();
        let e = shared(Trace::default());
        d.service().register(&e);

        d.advance(Duration::from_millis(5)).unwrap();
        assert_eq!(d.telemetry().timings().get("Update").map(|s| s.calls), Some(1));
        assert_eq!(d.telemetry().timings().get("Trace.tick()").map(|s| s.calls), Some(1));
    }

    #[test]
    fn disposed_controller_is_detached_from_the_frame() {
        let mut d = driver(100, 8);
        let e = shared(Trace::default());
        d.service().register(&e);
        d.service().controller(TickPhase::Update).dispose();

        for _ in 0..3 {
            let report = d.advance(Duration::from_millis(12)).unwrap();
            assert_eq!(report.fixed_steps, 1);
        }

        let phases: Vec<_> = e.lock().calls.iter().map(|(p, _)| *p).collect();
        assert_eq!(phases.len(), 6);
        assert!(!phases.contains(&TickPhase::Update));
        assert_eq!(&phases[..2], &[TickPhase::FixedUpdate, TickPhase::LateUpdate]);
        assert_eq!(d.time().frame_index, 3);
    }
}
