use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::{ColorRange, ColorRule, ColorSpace};
use crate::types::{Point, Resource};

/// Largest accepted circle radius, in pixels.
pub const MAX_RADIUS: i32 = 1 << 15;

/// One monitored circle on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSettings {
    pub resource: Resource,
    pub center: Point,
    pub radius: i32,
    #[serde(default)]
    pub color_space: ColorSpace,
    pub ranges: ColorRule,
    /// Act when the healthy ratio drops strictly below this.
    pub threshold: f64,
    pub key: String,
    /// Overrides the global cooldown for this region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub enabled: bool,
    pub interval_ms: u64,
    pub dir: String,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 5000,
            dir: "screenshots".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub poll_interval_ms: u64,
    pub cooldown_ms: u64,
    /// Random +/- fraction applied to every cooldown (0 = exact).
    pub cooldown_jitter: f64,
    /// Skip the trailing poll sleep when a tick already slept through a cooldown.
    pub skip_poll_after_action: bool,
    pub require_elevation: bool,
    /// Print the status line every N ticks (0 = never).
    pub status_every: u64,
    pub debug: DebugSettings,
    pub regions: Vec<RegionSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            cooldown_ms: 1000,
            cooldown_jitter: 0.0,
            skip_poll_after_action: false,
            require_elevation: true,
            status_every: 1,
            debug: DebugSettings::default(),
            regions: vec![
                RegionSettings {
                    resource: Resource::Health,
                    center: Point::new(186, 1301),
                    radius: 80,
                    color_space: ColorSpace::Rgb,
                    ranges: ColorRule::single(ColorRange::new([100, 0, 0], [255, 50, 50])),
                    threshold: 0.3,
                    key: "1".into(),
                    cooldown_ms: None,
                },
                RegionSettings {
                    resource: Resource::Mana,
                    center: Point::new(2379, 1301),
                    radius: 80,
                    color_space: ColorSpace::Rgb,
                    ranges: ColorRule::single(ColorRange::new([0, 0, 100], [50, 110, 255])),
                    threshold: 0.2,
                    key: "2".into(),
                    cooldown_ms: None,
                },
            ],
        }
    }
}

impl Settings {
    /// Load and validate settings. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    /// Reject configurations that would make the monitor misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than 0");
        }
        if !(0.0..1.0).contains(&self.cooldown_jitter) {
            bail!("cooldown_jitter must be in [0, 1), got {}", self.cooldown_jitter);
        }
        if self.debug.enabled && self.debug.interval_ms == 0 {
            bail!("debug.interval_ms must be greater than 0 when debug capture is enabled");
        }
        if self.regions.is_empty() {
            bail!("no regions configured");
        }

        for (i, region) in self.regions.iter().enumerate() {
            let name = region.resource;
            if self.regions[..i].iter().any(|r| r.resource == name) {
                bail!("{} is configured more than once", name);
            }
            if region.radius <= 0 {
                bail!("{}: radius must be positive, got {}", name, region.radius);
            }
            if region.radius > MAX_RADIUS {
                bail!("{}: radius {} exceeds {}", name, region.radius, MAX_RADIUS);
            }
            if !(0.0..=1.0).contains(&region.threshold) {
                bail!("{}: threshold must be in [0, 1], got {}", name, region.threshold);
            }
            if region.key.trim().is_empty() {
                bail!("{}: key is empty", name);
            }
            if region.ranges.ranges().is_empty() {
                bail!("{}: at least one color range is required", name);
            }
            for range in region.ranges.ranges() {
                if (0..3).any(|c| range.min[c] > range.max[c]) {
                    bail!("{}: range {} has min above max", name, range);
                }
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cooldown_for(&self, region: &RegionSettings) -> Duration {
        Duration::from_millis(region.cooldown_ms.unwrap_or(self.cooldown_ms))
    }

    pub fn debug_interval(&self) -> Duration {
        Duration::from_millis(self.debug.interval_ms)
    }
}
