use crate::config::FrameConfig;

/// Frame-loop rules derived from [`FrameConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameConstitution {
    pub fixed_dt_sec: f32,
    pub max_fixed_steps_per_frame: u32,
    pub max_dt_sec: f32,

    pub log_tick_rate: bool,
    pub tick_rate_log_period_sec: f32,
}

impl Default for FrameConstitution {
    fn default() -> Self {
        Self::from(&FrameConfig::default())
    }
}

impl From<&FrameConfig> for FrameConstitution {
    fn from(cfg: &FrameConfig) -> Self {
        Self {
            fixed_dt_sec: 1.0 / (cfg.fixed_hz.max(1) as f32),
            max_fixed_steps_per_frame: cfg.max_fixed_steps_per_frame.max(1),
            max_dt_sec: (cfg.max_dt_ms as f32 / 1000.0).max(0.001),
            log_tick_rate: cfg.log_tick_rate,
            tick_rate_log_period_sec: (cfg.tick_rate_log_period_ms as f32 / 1000.0).max(0.25),
        }
    }
}
