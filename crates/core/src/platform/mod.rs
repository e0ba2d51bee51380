pub mod stub;
pub mod interrupt;

#[cfg(target_os = "macos")]
pub mod darwin;

#[cfg(target_os = "windows")]
pub mod win32;

use anyhow::Result;

use crate::types::*;
use crate::logger;

/// Reads pixels from the primary display.
pub trait ScreenCapture {
    /// Visible size of the primary display in pixels.
    fn screen_size(&mut self) -> Result<(u32, u32)>;
    fn capture(&mut self, rect: CaptureRect) -> Result<Capture>;
}

/// Sends synthetic key events. No feedback channel.
pub trait InputInjector {
    /// Press and release `key` (a single character, or a name like `space`, `f1`).
    fn tap(&mut self, key: &str) -> Result<()>;
}

/// Checks for, and obtains, the privileges key injection needs.
pub trait PrivilegeChecker {
    fn is_elevated(&self) -> bool;
    /// Start a new elevated instance of this process. The caller exits afterwards.
    fn relaunch_elevated(&self) -> Result<()>;
}

pub trait Platform: ScreenCapture + InputInjector + PrivilegeChecker + Send {
    fn name(&self) -> &'static str;
}

/// Outcome of the startup privilege check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// Already privileged; carry on.
    Held,
    /// An elevated instance was started; this one should exit.
    Relaunched,
}

/// Ensure key injection will be accepted. Failing to relaunch is fatal.
pub fn ensure_elevated<C: PrivilegeChecker + ?Sized>(checker: &C) -> Result<Elevation> {
    if checker.is_elevated() {
        return Ok(Elevation::Held);
    }
    logger::warn("not running elevated, requesting privileges");
    checker.relaunch_elevated()?;
    Ok(Elevation::Relaunched)
}

/// Create the platform appropriate for the current OS.
pub fn create_platform(force_stub: bool) -> Box<dyn Platform> {
    if force_stub {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        return Box::new(stub::StubPlatform::default());
    }
    #[cfg(target_os = "macos")]
    {
        logger::register_prefix("darwin", logger::COLOR_GRAY);
        return Box::new(darwin::DarwinPlatform::new());
    }
    #[cfg(target_os = "windows")]
    {
        logger::register_prefix("windows", logger::COLOR_GRAY);
        return Box::new(win32::WindowsPlatform::new());
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        logger::warn("no native backend for this OS, using stub platform");
        return Box::new(stub::StubPlatform::default());
    }
}
