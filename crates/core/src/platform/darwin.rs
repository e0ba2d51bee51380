use anyhow::{anyhow, bail, Result};
use core_graphics::display::CGDisplay;
use core_graphics::event::*;
use core_graphics::event_source::*;
use core_graphics::geometry::*;
use core_graphics::window::*;

use crate::types::*;
use crate::logger;
use super::{InputInjector, Platform, PrivilegeChecker, ScreenCapture};

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
}

// ANSI virtual key codes (kVK_*)
fn key_code(key: &str) -> Option<CGKeyCode> {
    let code = match key {
        "enter" | "return" => 36,
        "escape" | "esc" => 53,
        "delete" | "backspace" => 51,
        "tab" => 48,
        "space" => 49,
        "up" => 126,
        "down" => 125,
        "left" => 123,
        "right" => 124,
        "f1" => 122, "f2" => 120, "f3" => 99, "f4" => 118,
        "f5" => 96, "f6" => 97, "f7" => 98, "f8" => 100,
        "f9" => 101, "f10" => 109, "f11" => 103, "f12" => 111,
        "0" => 29, "1" => 18, "2" => 19, "3" => 20, "4" => 21,
        "5" => 23, "6" => 22, "7" => 26, "8" => 28, "9" => 25,
        "a" => 0, "b" => 11, "c" => 8, "d" => 2, "e" => 14, "f" => 3,
        "g" => 5, "h" => 4, "i" => 34, "j" => 38, "k" => 40, "l" => 37,
        "m" => 46, "n" => 45, "o" => 31, "p" => 35, "q" => 12, "r" => 15,
        "s" => 1, "t" => 17, "u" => 32, "v" => 9, "w" => 13, "x" => 7,
        "y" => 16, "z" => 6,
        _ => return None,
    };
    Some(code)
}

pub struct DarwinPlatform;

impl DarwinPlatform {
    pub fn new() -> Self {
        DarwinPlatform
    }
}

impl ScreenCapture for DarwinPlatform {
    fn screen_size(&mut self) -> Result<(u32, u32)> {
        let bounds = CGDisplay::main().bounds();
        Ok((bounds.size.width as u32, bounds.size.height as u32))
    }

    fn capture(&mut self, rect: CaptureRect) -> Result<Capture> {
        let cg_rect = CGRect::new(
            &CGPoint::new(rect.l as f64, rect.t as f64),
            &CGSize::new(rect.w as f64, rect.h as f64),
        );

        let image = create_image(
            cg_rect,
            kCGWindowListOptionOnScreenOnly,
            kCGNullWindowID,
            kCGWindowImageNominalResolution,
        )
        .ok_or_else(|| anyhow!("CGWindowListCreateImage failed for {:?} (screen recording permission?)", rect))?;

        let bpr = image.bytes_per_row() as u32;
        let width = image.width() as u32;
        let height = image.height() as u32;
        if image.bits_per_pixel() != 32 {
            bail!("unexpected pixel format: {} bits per pixel", image.bits_per_pixel());
        }

        let cf_data = image.data();
        Ok(Capture {
            data: cf_data.bytes().to_vec(),
            width,
            height,
            bytes_per_row: bpr,
        })
    }
}

impl InputInjector for DarwinPlatform {
    fn tap(&mut self, key: &str) -> Result<()> {
        let Some(code) = key_code(&key.to_lowercase()) else {
            bail!("unknown key: {}", key);
        };
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| anyhow!("failed to create event source"))?;

        for down in [true, false] {
            let event = CGEvent::new_keyboard_event(source.clone(), code, down)
                .map_err(|_| anyhow!("failed to create key event for {}", key))?;
            event.post(CGEventTapLocation::HID);
            std::thread::sleep(std::time::Duration::from_millis(15));
        }
        Ok(())
    }
}

impl PrivilegeChecker for DarwinPlatform {
    fn is_elevated(&self) -> bool {
        unsafe { AXIsProcessTrusted() }
    }

    fn relaunch_elevated(&self) -> Result<()> {
        logger::error_p("darwin", "key events need Accessibility permission for this terminal");
        bail!("grant Accessibility permission in System Settings > Privacy & Security, then restart")
    }
}

impl Platform for DarwinPlatform {
    fn name(&self) -> &'static str {
        "darwin"
    }
}
