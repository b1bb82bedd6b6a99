use std::time::Duration;

use crate::foundation::error::{ReelError, ReelResult};

pub use kurbo::{Affine, Rect, Vec2};

/// Absolute 0-based frame index in output timeline space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> ReelResult<Self> {
        if den == 0 {
            return Err(ReelError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ReelError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole frames per second.
    pub fn whole(frame_rate: u32) -> ReelResult<Self> {
        Self::new(frame_rate, 1)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Wall-clock interval between two paced frames.
    pub fn frame_interval(self) -> Duration {
        Duration::from_secs_f64(self.frame_duration_secs())
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (u128::from(frames) * u128::from(self.den)) as f64 / f64::from(self.num)
    }

    /// Convert seconds to a frame count, rounding to the nearest frame.
    ///
    /// Every timed run is rounded on its own; callers sum the rounded counts.
    pub fn secs_to_frames_round(self, secs: f64) -> u64 {
        (secs * self.as_f64()).round().max(0.0) as u64
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Portrait 9:16 canvas used for short-form story videos.
    pub const PORTRAIT_720P: Canvas = Canvas {
        width: 720,
        height: 1280,
    };

    /// Create a validated canvas.
    ///
    /// Dimensions must be non-zero, even (yuv420p output), and fit the `u16` raster limits.
    pub fn new(width: u32, height: u32) -> ReelResult<Self> {
        let c = Self { width, height };
        c.validate()?;
        Ok(c)
    }

    pub(crate) fn validate(self) -> ReelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::validation("canvas width/height must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(ReelError::validation(
                "canvas width/height must be even (required for yuv420p output)",
            ));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(ReelError::validation("canvas width/height must fit in u16"));
        }
        Ok(())
    }

    /// Number of bytes in one RGBA8 frame of this canvas.
    pub fn rgba8_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::PORTRAIT_720P
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
