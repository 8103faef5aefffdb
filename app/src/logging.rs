use std::io::Write;

use anyhow::{anyhow, Result};
use env_logger::{Builder, WriteStyle};
use log::LevelFilter;
use tick_core::config::LogConfig;

/// Installs the console logger.
///
/// `TICK_LOG` overrides the configured level, `TICK_LOG_COLORS=0` disables colors.
pub fn init(cfg: &LogConfig) -> Result<()> {
    let level = std::env::var("TICK_LOG")
        .ok()
        .unwrap_or_else(|| cfg.level.clone())
        .parse::<LevelFilter>()
        .map_err(|e| anyhow!("invalid log level: {e}"))?;
    let colors = std::env::var("TICK_LOG_COLORS")
        .ok()
        .map(|v| v != "0")
        .unwrap_or(cfg.colors);

    let mut builder = Builder::new();
    builder.filter_level(level);
    builder.write_style(if colors { WriteStyle::Auto } else { WriteStyle::Never });

    builder.format(|buf, record| {
        let style = buf.default_level_style(record.level());
        writeln!(
            buf,
            "[{style}{:<5}{style:#}] {:<22} {}",
            record.level(),
            record.target(),
            record.args()
        )
    });

    builder
        .try_init()
        .map_err(|e| anyhow!("logger init failed: {e}"))
}
