use anyhow::{bail, Result};

use crate::types::*;
use crate::logger;
use super::{InputInjector, Platform, PrivilegeChecker, ScreenCapture};

type Painter = Box<dyn Fn(i32, i32) -> [u8; 3] + Send>;

/// Synthetic screen and a key sink that only records.
/// `paint` receives screen coordinates and returns the RGB value there.
pub struct StubPlatform {
    screen: (u32, u32),
    paint: Painter,
    fail_capture: bool,
    elevated: bool,
    taps: Vec<String>,
    captures: Vec<CaptureRect>,
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self {
            screen: (2560, 1440),
            paint: Box::new(|_, _| [128, 128, 128]),
            fail_capture: false,
            elevated: true,
            taps: Vec::new(),
            captures: Vec::new(),
        }
    }
}

impl StubPlatform {
    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen = (width, height);
        self
    }

    pub fn with_paint(mut self, paint: impl Fn(i32, i32) -> [u8; 3] + Send + 'static) -> Self {
        self.paint = Box::new(paint);
        self
    }

    pub fn filled(self, rgb: [u8; 3]) -> Self {
        self.with_paint(move |_, _| rgb)
    }

    pub fn set_paint(&mut self, paint: impl Fn(i32, i32) -> [u8; 3] + Send + 'static) {
        self.paint = Box::new(paint);
    }

    pub fn set_fail_capture(&mut self, fail: bool) {
        self.fail_capture = fail;
    }

    pub fn with_elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    pub fn taps(&self) -> &[String] {
        &self.taps
    }

    pub fn captures(&self) -> &[CaptureRect] {
        &self.captures
    }
}

impl ScreenCapture for StubPlatform {
    fn screen_size(&mut self) -> Result<(u32, u32)> {
        Ok(self.screen)
    }

    fn capture(&mut self, rect: CaptureRect) -> Result<Capture> {
        if self.fail_capture {
            bail!("stub capture failure at {:?}", rect);
        }
        self.captures.push(rect);
        let paint = &self.paint;
        Ok(Capture::from_fn(rect.w.max(0) as u32, rect.h.max(0) as u32, |x, y| {
            paint(rect.l + x as i32, rect.t + y as i32)
        }))
    }
}

impl InputInjector for StubPlatform {
    fn tap(&mut self, key: &str) -> Result<()> {
        logger::info_p("stub", &format!("tap(\"{}\")", key));
        self.taps.push(key.to_string());
        Ok(())
    }
}

impl PrivilegeChecker for StubPlatform {
    fn is_elevated(&self) -> bool {
        self.elevated
    }

    fn relaunch_elevated(&self) -> Result<()> {
        bail!("stub platform cannot relaunch elevated")
    }
}

impl Platform for StubPlatform {
    fn name(&self) -> &'static str {
        "stub"
    }
}
