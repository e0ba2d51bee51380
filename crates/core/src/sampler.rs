use anyhow::{anyhow, Result};

use crate::color::{Classification, ColorStats};
use crate::platform::ScreenCapture;
use crate::settings::RegionSettings;
use crate::types::*;

/// Everything one tick learns about one region.
#[derive(Debug, Clone)]
pub struct SampleResult {
    pub resource: Resource,
    pub rect: CaptureRect,
    pub classification: Classification,
    /// In-circle pixels that matched the rule (in the region's color space)
    pub in_range: Vec<[u8; 3]>,
    /// Every in-circle pixel (in the region's color space)
    pub pixels: Vec<[u8; 3]>,
    pub capture: Capture,
}

impl SampleResult {
    pub fn ratio(&self) -> f64 {
        self.classification.ratio
    }

    pub fn in_range_stats(&self) -> Option<ColorStats> {
        ColorStats::from_pixels(&self.in_range)
    }
}

/// Bounding square `(x - r, y - r, 2r, 2r)` of a circle, clamped to the screen.
/// A clamped square yields a truncated circle; `None` if nothing is on-screen.
pub fn capture_rect(center: Point, radius: i32, screen: (u32, u32)) -> Option<CaptureRect> {
    let (cx, cy, radius) = (center.x as i64, center.y as i64, radius as i64);
    let l = (cx - radius).max(0);
    let t = (cy - radius).max(0);
    let r = (cx + radius).min(screen.0 as i64);
    let b = (cy + radius).min(screen.1 as i64);
    if r <= l || b <= t {
        return None;
    }
    // bounded by the screen size, which fits i32
    Some(CaptureRect {
        l: i32::try_from(l).ok()?,
        t: i32::try_from(t).ok()?,
        w: i32::try_from(r - l).ok()?,
        h: i32::try_from(b - t).ok()?,
    })
}

/// Planar distance test in screen coordinates.
pub fn in_circle(x: i32, y: i32, center: Point, radius: i32) -> bool {
    let dx = x as i64 - center.x as i64;
    let dy = y as i64 - center.y as i64;
    let r = radius as i64;
    dx * dx + dy * dy <= r * r
}

/// Mask, convert and classify a capture of `rect`.
pub fn sample(capture: Capture, rect: CaptureRect, region: &RegionSettings) -> SampleResult {
    let w = capture.width.min(rect.w.max(0) as u32);
    let h = capture.height.min(rect.h.max(0) as u32);

    let mut pixels = Vec::new();
    let mut in_range = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if !in_circle(rect.l + x as i32, rect.t + y as i32, region.center, region.radius) {
                continue;
            }
            let px = region.color_space.convert(capture.rgb_at(x, y));
            if region.ranges.matches(px) {
                in_range.push(px);
            }
            pixels.push(px);
        }
    }

    SampleResult {
        resource: region.resource,
        rect,
        classification: Classification::new(in_range.len(), pixels.len()),
        in_range,
        pixels,
        capture,
    }
}

/// Capture the region's bounding square from `screen` and sample it.
pub fn sample_region<S: ScreenCapture + ?Sized>(screen: &mut S, region: &RegionSettings) -> Result<SampleResult> {
    let size = screen.screen_size()?;
    let rect = capture_rect(region.center, region.radius, size)
        .ok_or_else(|| anyhow!("{} circle lies entirely off-screen {:?}", region.resource, size))?;
    let capture = screen.capture(rect)?;
    Ok(sample(capture, rect, region))
}
