use std::fmt;

use serde::{Deserialize, Serialize};

/// Color space a region's ranges are expressed in.
///
/// `Hsv` uses the 8-bit convention: hue in `0..=179` (degrees halved),
/// saturation and value in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Rgb,
    Hsv,
}

impl ColorSpace {
    pub fn convert(self, rgb: [u8; 3]) -> [u8; 3] {
        match self {
            ColorSpace::Rgb => rgb,
            ColorSpace::Hsv => rgb_to_hsv(rgb),
        }
    }
}

fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v == 0.0 { 0.0 } else { 255.0 * diff / v };

    let mut h = if diff == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h = ((h / 2.0).round() as u16 % 180) as u8;
    [h, s.round() as u8, v as u8]
}

/// Inclusive per-channel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub min: [u8; 3],
    pub max: [u8; 3],
}

impl ColorRange {
    pub const fn new(min: [u8; 3], max: [u8; 3]) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, px: [u8; 3]) -> bool {
        (0..3).all(|c| self.min[c] <= px[c] && px[c] <= self.max[c])
    }
}

impl fmt::Display for ColorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}-{:?}", self.min, self.max)
    }
}

/// Union of ranges; a pixel matches if any range contains it.
/// Split ranges cover hues that wrap around 0, e.g. red `[0,10] ∪ [160,179]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorRule(pub Vec<ColorRange>);

impl ColorRule {
    pub fn single(range: ColorRange) -> Self {
        Self(vec![range])
    }

    pub fn ranges(&self) -> &[ColorRange] {
        &self.0
    }

    pub fn matches(&self, px: [u8; 3]) -> bool {
        self.0.iter().any(|r| r.contains(px))
    }
}

impl fmt::Display for ColorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", r)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub matched: usize,
    pub total: usize,
    pub ratio: f64,
}

impl Classification {
    pub fn new(matched: usize, total: usize) -> Self {
        let ratio = if total == 0 { 0.0 } else { matched as f64 / total as f64 };
        Self { matched, total, ratio }
    }
}

/// Classify already-converted pixels against `rule`.
pub fn classify(pixels: &[[u8; 3]], rule: &ColorRule) -> Classification {
    let matched = pixels.iter().filter(|px| rule.matches(**px)).count();
    Classification::new(matched, pixels.len())
}

/// Per-channel min / max / mean of a pixel set, in whatever space the pixels are in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStats {
    pub min: [u8; 3],
    pub max: [u8; 3],
    pub mean: [u8; 3],
}

impl ColorStats {
    pub fn from_pixels(pixels: &[[u8; 3]]) -> Option<Self> {
        let first = *pixels.first()?;
        let mut min = first;
        let mut max = first;
        let mut sum = [0u64; 3];
        for px in pixels {
            for c in 0..3 {
                min[c] = min[c].min(px[c]);
                max[c] = max[c].max(px[c]);
                sum[c] += px[c] as u64;
            }
        }
        let n = pixels.len() as u64;
        let mean = [(sum[0] / n) as u8, (sum[1] / n) as u8, (sum[2] / n) as u8];
        Some(Self { min, max, mean })
    }
}

impl fmt::Display for ColorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}-{}] [{}-{}] [{}-{}] avg {:?}",
            self.min[0], self.max[0], self.min[1], self.max[1], self.min[2], self.max[2], self.mean
        )
    }
}
