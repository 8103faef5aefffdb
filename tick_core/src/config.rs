use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickConfig {
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl TickConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid tick config")
    }

    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in '{}'", path.display()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    #[serde(default = "default_fixed_hz")]
    pub fixed_hz: u32,
    #[serde(default = "default_max_fixed_steps")]
    pub max_fixed_steps_per_frame: u32,
    #[serde(default = "default_max_dt_ms")]
    pub max_dt_ms: u32,
    #[serde(default = "default_true")]
    pub log_tick_rate: bool,
    #[serde(default = "default_rate_period_ms")]
    pub tick_rate_log_period_ms: u32,
}

fn default_fixed_hz() -> u32 { 60 }
fn default_max_fixed_steps() -> u32 { 8 }
fn default_max_dt_ms() -> u32 { 250 }
fn default_rate_period_ms() -> u32 { 1000 }
fn default_true() -> bool { true }

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            fixed_hz: default_fixed_hz(),
            max_fixed_steps_per_frame: default_max_fixed_steps(),
            max_dt_ms: default_max_dt_ms(),
            log_tick_rate: true,
            tick_rate_log_period_ms: default_rate_period_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `log` level filter: "off", "error", "warn", "info", "debug", "trace".
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub colors: bool,
}

fn default_level() -> String { "info".to_string() }

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_level(), colors: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// 0 runs until interrupted.
    #[serde(default = "default_max_frames")]
    pub max_frames: u64,
    #[serde(default = "default_frame_sleep_ms")]
    pub frame_sleep_ms: u64,
}

fn default_max_frames() -> u64 { 600 }
fn default_frame_sleep_ms() -> u64 { 16 }

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { max_frames: default_max_frames(), frame_sleep_ms: default_frame_sleep_ms() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = TickConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.frame.fixed_hz, 60);
        assert_eq!(cfg.frame.max_fixed_steps_per_frame, 8);
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.runtime.max_frames, 600);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = TickConfig::from_toml_str(
            r#"
            [frame]
            fixed_hz = 50

            [log]
            level = "debug"
            colors = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.frame.fixed_hz, 50);
        assert_eq!(cfg.frame.max_dt_ms, 250);
        assert!(cfg.frame.log_tick_rate);
        assert_eq!(cfg.log.level, "debug");
        assert!(!cfg.log.colors);
    }

    #[test]
    fn wrong_type_is_an_error() {
        assert!(TickConfig::from_toml_str("[frame]\nfixed_hz = \"fast\"").is_err());
    }

    #[test]
    fn missing_file_mentions_path() {
        let err = TickConfig::load_toml("/definitely/not/here.toml").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.toml"));
    }
}
