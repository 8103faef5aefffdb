//! Demo tickables.

use tick_core::{shared, PhaseSet, Shared, TickHandle, TickResult, TickService, Tickable};

/// Integrates a position at the fixed step and reports it late in the frame.
pub struct Orbit {
    angle: f32,
    speed: f32,
    frames: u64,
}

impl Tickable for Orbit {
    const PHASES: PhaseSet = PhaseSet::ALL;

    fn tick_order() -> Option<i32> {
        Some(-10)
    }

    fn fixed_tick(&mut self, dt: f32) -> TickResult<()> {
        self.angle = (self.angle + self.speed * dt) % std::f32::consts::TAU;
        Ok(())
    }

    fn tick(&mut self, _dt: f32) -> TickResult<()> {
        self.frames += 1;
        Ok(())
    }

    fn late_tick(&mut self, _dt: f32) -> TickResult<()> {
        if self.frames % 120 == 0 {
            log::info!("orbit angle={:.3} rad after {} frames", self.angle, self.frames);
        }
        Ok(())
    }
}

/// Spawns a short-lived spark every `period` seconds.
pub struct Spawner {
    service: TickService,
    period: f32,
    elapsed: f32,
    spawned: u32,
}

impl Tickable for Spawner {
    const PHASES: PhaseSet = PhaseSet::UPDATE;

    fn tick(&mut self, dt: f32) -> TickResult<()> {
        self.elapsed += dt;
        if self.elapsed < self.period {
            return Ok(());
        }
        self.elapsed = 0.0;
        self.spawned += 1;

        let spark = shared(Spark {
            id: self.spawned,
            ttl: 0.5,
            handle: None,
        });
        let handle = self.service.register(&spark);
        spark.lock().handle = Some(handle);
        log::debug!("spark #{} spawned", self.spawned);
        Ok(())
    }
}

/// Lives for `ttl` seconds, then disposes its own registration.
pub struct Spark {
    id: u32,
    ttl: f32,
    handle: Option<TickHandle>,
}

impl Tickable for Spark {
    const PHASES: PhaseSet = PhaseSet::UPDATE.union(PhaseSet::LATE);

    fn tick(&mut self, dt: f32) -> TickResult<()> {
        self.ttl -= dt;
        Ok(())
    }

    fn late_tick(&mut self, _dt: f32) -> TickResult<()> {
        if self.ttl <= 0.0 {
            if let Some(h) = self.handle.take() {
                h.dispose();
                log::debug!("spark #{} expired", self.id);
            }
        }
        Ok(())
    }
}

/// Registers the demo set and returns the handles to keep alive.
pub fn spawn_demo(service: &TickService) -> Vec<TickHandle> {
    let orbit: Shared<Orbit> = shared(Orbit {
        angle: 0.0,
        speed: 1.5,
        frames: 0,
    });
    let spawner = shared(Spawner {
        service: service.clone(),
        period: 1.0,
        elapsed: 0.0,
        spawned: 0,
    });

    vec![service.register(&orbit), service.register_with_order(&spawner, 0)]
}
