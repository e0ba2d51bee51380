use std::fmt;

use serde::{Deserialize, Serialize};

/// Screen coordinate in pixels (primary display, origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Screen rectangle to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRect {
    pub l: i32,
    pub t: i32,
    pub w: i32,
    pub h: i32,
}

/// Raw screenshot pixel data (BGRA)
#[derive(Debug, Clone)]
pub struct Capture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
}

impl Capture {
    /// Build a tightly packed capture by asking `paint` for the RGB value of every pixel.
    pub fn from_fn(width: u32, height: u32, mut paint: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let bytes_per_row = width * 4;
        let mut data = Vec::with_capacity((bytes_per_row * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let [r, g, b] = paint(x, y);
                data.extend_from_slice(&[b, g, r, 255]);
            }
        }
        Self { data, width, height, bytes_per_row }
    }

    /// RGB value of the pixel at (x, y). Caller keeps x/y inside the capture.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y * self.bytes_per_row + x * 4) as usize;
        [self.data[idx + 2], self.data[idx + 1], self.data[idx]]
    }
}

/// The two monitored resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Health,
    Mana,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Health => "health",
            Resource::Mana => "mana",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the monitor loop currently is within a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Sampling,
    Acting,
}
