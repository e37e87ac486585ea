use std::fmt;
use std::time::{Duration, Instant};

use crate::constants::FPS_UPDATE_INTERVAL_US;

/// Frames per second, kept in tenths to print one decimal without float drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Fps(u64);

impl Fps {
    pub fn from_tenths(tenths: u64) -> Self {
        Self(tenths)
    }

    pub fn tenths(self) -> u64 {
        self.0
    }

    pub fn as_f32(self) -> f32 {
        self.0 as f32 / 10.0
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

/// Result of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTick {
    /// Time since the previous frame
    pub frame_duration_us: u64,
    /// Set once per update interval
    pub fps: Option<Fps>,
}

pub struct FrameClock {
    frame_count: u64,
    prev_fps_update: Instant,
    prev_frame: Instant,
    update_interval: Duration,
}

impl FrameClock {
    pub fn new(start: Instant) -> Self {
        Self {
            frame_count: 0,
            prev_fps_update: start,
            prev_frame: start,
            update_interval: Duration::from_micros(FPS_UPDATE_INTERVAL_US),
        }
    }

    pub fn tick(&mut self, now: Instant) -> FrameTick {
        self.frame_count += 1;

        let elapsed_fps = now.saturating_duration_since(self.prev_fps_update);
        let frame_duration = now.saturating_duration_since(self.prev_frame);
        self.prev_frame = now;

        let fps = if elapsed_fps >= self.update_interval {
            let elapsed_us = elapsed_fps.as_micros().max(1) as u64;
            // frames/s * 10, rounded to the nearest tenth
            let tenths = (self.frame_count * 10_000_000 + elapsed_us / 2) / elapsed_us;
            self.prev_fps_update = now;
            self.frame_count = 0;
            Some(Fps(tenths))
        } else {
            None
        };

        FrameTick {
            frame_duration_us: frame_duration.as_micros() as u64,
            fps,
        }
    }

    pub fn frames_since_update(&self) -> u64 {
        self.frame_count
    }
}
