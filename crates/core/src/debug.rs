use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::types::{Capture, Resource};

/// Rate limiter for debug screenshots, owned by the monitor state.
#[derive(Debug, Clone, Default)]
pub struct DebugCapture {
    last_saved: Option<Instant>,
}

impl DebugCapture {
    /// True when at least `interval` has passed since the last save (or none happened yet).
    pub fn due(&self, now: Instant, interval: Duration) -> bool {
        self.last_saved.map_or(true, |t| now.saturating_duration_since(t) >= interval)
    }

    pub fn mark_saved(&mut self, now: Instant) {
        self.last_saved = Some(now);
    }
}

/// `<dir>/<resource>_circle_<YYYYmmdd_HHMMSS_mmm>.png`
pub fn screenshot_path(dir: &Path, resource: Resource, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}_circle_{}.png", resource, at.format("%Y%m%d_%H%M%S_%3f")))
}

#[cfg(feature = "debug-capture")]
pub fn save_capture(capture: &Capture, path: &Path) -> Result<()> {
    use anyhow::{anyhow, Context};

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut rgba = Vec::with_capacity((capture.width * capture.height * 4) as usize);
    for y in 0..capture.height {
        for x in 0..capture.width {
            let [r, g, b] = capture.rgb_at(x, y);
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }
    let img = image::RgbaImage::from_raw(capture.width, capture.height, rgba)
        .ok_or_else(|| anyhow!("capture buffer does not match {}x{}", capture.width, capture.height))?;
    img.save(path).with_context(|| format!("saving {}", path.display()))?;
    Ok(())
}

#[cfg(not(feature = "debug-capture"))]
pub fn save_capture(_capture: &Capture, _path: &Path) -> Result<()> {
    anyhow::bail!("built without the debug-capture feature")
}
