mod entities;
mod logging;

use std::time::{Duration, Instant};

use anyhow::Result;
use tick_core::{signals::ExitSignal, FrameDriver, TickConfig};

fn main() -> Result<()> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => TickConfig::load_toml(path)?,
        None => TickConfig::default(),
    };
    logging::init(&cfg.log)?;

    let exit = ExitSignal::new();
    if let Err(e) = exit.install_ctrlc_handler() {
        log::warn!("{e:#}");
    }

    let mut driver = FrameDriver::from_config(&cfg);
    let handles = entities::spawn_demo(driver.service());
    log::info!("boot: {} tickables registered", handles.len());

    let sleep = Duration::from_millis(cfg.runtime.frame_sleep_ms);
    let max_frames = cfg.runtime.max_frames;
    let mut last = Instant::now();

    while !exit.is_exit_requested() {
        if max_frames != 0 && driver.time().frame_index >= max_frames {
            break;
        }

        std::thread::sleep(sleep);
        let now = Instant::now();
        let raw_dt = now.duration_since(last);
        last = now;

        match driver.advance(raw_dt) {
            Ok(report) if report.capped => {
                log::debug!("frame {} capped at {} fixed steps", driver.time().frame_index, report.fixed_steps);
            }
            Ok(_) => {}
            // Already logged by the driver; keep running.
            Err(_) => {}
        }
    }

    driver.shutdown();
    Ok(())
}
