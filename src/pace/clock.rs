//! Time sources for frame pacing.
//!
//! Pacing is deadline based: frame `n` is due `n` frame intervals after the ticker started,
//! computed from the rational frame rate so long runs do not drift.

use std::time::{Duration, Instant};

use crate::foundation::core::Fps;

/// Monotonic time source with a blocking wait.
pub trait FrameClock {
    /// Time elapsed since the clock's epoch.
    fn now(&self) -> Duration;
    /// Block until `now() >= deadline`. Returns immediately when already past it.
    fn sleep_until(&mut self, deadline: Duration);
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl FrameClock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep_until(&mut self, deadline: Duration) {
        let now = self.now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// Clock that only moves when slept on, for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Duration,
    sleeps: u64,
}

impl VirtualClock {
    /// Clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without sleeping, e.g. to simulate slow frames.
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Number of `sleep_until` calls that actually waited.
    pub fn sleeps(&self) -> u64 {
        self.sleeps
    }
}

impl FrameClock for VirtualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep_until(&mut self, deadline: Duration) {
        if deadline > self.now {
            self.now = deadline;
            self.sleeps += 1;
        }
    }
}

/// Hands out per-frame deadlines relative to the first tick.
#[derive(Debug, Clone)]
pub struct FrameTicker {
    fps: Fps,
    origin: Option<Duration>,
    ticks: u64,
}

impl FrameTicker {
    /// Ticker for `fps`.
    pub fn new(fps: Fps) -> Self {
        Self {
            fps,
            origin: None,
            ticks: 0,
        }
    }

    /// Offset of frame `n` from the origin.
    pub fn offset_of(&self, n: u64) -> Duration {
        let nanos = u128::from(n) * u128::from(self.fps.den) * 1_000_000_000 / u128::from(self.fps.num);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Suspend until the next frame is due.
    ///
    /// The first call anchors the origin and returns at once. Returns how late the frame is
    /// relative to its deadline (zero when on time).
    pub fn wait_next(&mut self, clock: &mut dyn FrameClock) -> Duration {
        let Some(origin) = self.origin else {
            self.origin = Some(clock.now());
            return Duration::ZERO;
        };
        self.ticks += 1;
        let deadline = origin + self.offset_of(self.ticks);
        let now = clock.now();
        if now >= deadline {
            return now - deadline;
        }
        clock.sleep_until(deadline);
        Duration::ZERO
    }

    /// Frames ticked since the origin.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pace/clock.rs"]
mod tests;
