use std::path::PathBuf;

use anyhow::{Context, Result};

use orbwatch_core::{logger, settings::Settings};
use orbwatch_core::monitor::Monitor;
use orbwatch_core::platform::{create_platform, ensure_elevated, interrupt, Elevation};
use orbwatch_core::sleep::ThreadSleeper;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let force_stub = args.iter().any(|a| a == "--stub");
    let init_config = args.iter().any(|a| a == "--init-config");

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.join("orbwatch.json"));

    if init_config {
        Settings::default().save(&config_path)?;
        println!("wrote default settings to {}", config_path.display());
        return Ok(());
    }

    logger::init(&cwd.join("logs"), true)?;

    let settings = Settings::load(&config_path)?;
    if config_path.exists() {
        logger::info(&format!("settings from {}", config_path.display()));
    } else {
        logger::info(&format!("no {}, using built-in defaults", config_path.display()));
    }

    let mut platform = create_platform(force_stub);
    logger::info(&format!("platform: {}", platform.name()));

    if settings.require_elevation {
        match ensure_elevated(platform.as_ref()).context("cannot obtain input privileges")? {
            Elevation::Held => {}
            Elevation::Relaunched => {
                logger::info("elevated instance started, exiting");
                return Ok(());
            }
        }
    }

    interrupt::install()?;
    logger::info("orbwatch started, press Ctrl+C to stop");
    if settings.debug.enabled {
        logger::info(&format!("debug screenshots go to {}", cwd.join(&settings.debug.dir).display()));
    }

    Monitor::new(&settings).run(platform.as_mut(), &mut ThreadSleeper, interrupt::stop_flag());

    logger::info("orbwatch stopped");
    Ok(())
}
