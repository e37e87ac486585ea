use crate::constants::{
    FRAME_HISTORY_SIZE, GRAPH_MAX_HEIGHT, GRAPH_MIN_HEIGHT, GRAPH_MAX_US, GRAPH_MIN_US,
    GRAPH_TARGET_US,
};
use crate::renderer::HudNormColor;

/// Fixed size ring of frame durations in microseconds
pub struct FrameTimeHistory {
    data_points: [u64; FRAME_HISTORY_SIZE],
    cursor: usize,
}

impl FrameTimeHistory {
    pub fn new() -> Self {
        Self {
            data_points: [0; FRAME_HISTORY_SIZE],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        FRAME_HISTORY_SIZE
    }

    pub fn record(&mut self, duration_us: u64) {
        self.data_points[self.cursor] = duration_us;
        self.cursor = (self.cursor + 1) % FRAME_HISTORY_SIZE;
    }

    /// Oldest sample first
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..FRAME_HISTORY_SIZE)
            .map(move |i| self.data_points[(self.cursor + i) % FRAME_HISTORY_SIZE])
    }

    /// Minimum and maximum over the whole window, in tenths of a millisecond
    pub fn window_min_max(&self) -> (u64, u64) {
        self.iter().fold((u64::MAX, 0), |(min, max), us| {
            let tenths = us / 100;
            (min.min(tenths), max.max(tenths))
        })
    }

    /// Graph bar height and colour per sample, oldest first
    pub fn renderable_series(&self) -> Vec<(f32, HudNormColor)> {
        self.iter()
            .map(|us| (bar_height(us as f32), bar_color(us as f32)))
            .collect()
    }
}

impl Default for FrameTimeHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Log-scaled bar height: 2 at or below the lower bound, 40 at or above the upper one
pub fn bar_height(us: f32) -> f32 {
    if !us.is_finite() {
        return GRAPH_MIN_HEIGHT;
    }
    let h_val = ((us - GRAPH_MIN_US) / GRAPH_TARGET_US + 1.0).max(1.0).log2()
        / ((GRAPH_MAX_US - GRAPH_MIN_US) / GRAPH_TARGET_US).log2();
    (GRAPH_MAX_HEIGHT * h_val).clamp(GRAPH_MIN_HEIGHT, GRAPH_MAX_HEIGHT)
}

/// Green for fast frames, turning red past twice the target
pub fn bar_color(us: f32) -> HudNormColor {
    let ratio = if us.is_finite() { us / GRAPH_TARGET_US } else { 0.0 };
    let r = (-1.0 + ratio).clamp(0.0, 1.0);
    let g = (3.0 - ratio).clamp(0.0, 1.0);
    let l = (r * r + g * g).sqrt();
    let (r, g) = if l > 0.0 { (r / l, g / l) } else { (0.0, 1.0) };

    HudNormColor {
        r: (255.0 * r) as u8,
        g: (255.0 * g) as u8,
        b: 0,
        a: 255,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_keeps_last_samples() {
        let mut history = FrameTimeHistory::new();
        for us in 1..=301u64 {
            history.record(us);
        }
        let window: Vec<u64> = history.iter().collect();
        assert_eq!(window.len(), 300);
        assert_eq!(window.first(), Some(&2));
        assert_eq!(window.last(), Some(&301));
        assert!(!window.contains(&1));
        assert!(window.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unfilled_window_starts_with_zeros() {
        let mut history = FrameTimeHistory::new();
        history.record(16_000);
        let window: Vec<u64> = history.iter().collect();
        assert_eq!(window[299], 16_000);
        assert!(window[..299].iter().all(|us| *us == 0));
    }

    #[test]
    fn test_window_min_max() {
        let mut history = FrameTimeHistory::new();
        for _ in 0..FRAME_HISTORY_SIZE {
            history.record(16_666);
        }
        history.record(8_349);
        history.record(33_399);
        assert_eq!(history.window_min_max(), (83, 333));
    }

    #[test]
    fn test_height_bounds() {
        assert_eq!(bar_height(0.0), 2.0);
        assert_eq!(bar_height(5_000.0), 2.0);
        assert_eq!(bar_height(100_000.0), 40.0);
        assert_eq!(bar_height(250_000.0), 40.0);
        assert_eq!(bar_height(f32::NAN), 2.0);

        let at_target = bar_height(16_666.6);
        assert!(at_target > 2.0 && at_target < 40.0, "{at_target}");
        assert!(bar_height(20_000.0) > at_target);
    }

    #[test]
    fn test_color_mapping() {
        let fast = bar_color(5_000.0);
        assert_eq!((fast.r, fast.g, fast.b, fast.a), (0, 255, 0, 255));

        // pure green up to the target, balanced at twice the target
        assert_eq!(bar_color(16_666.6).r, 0);
        let balanced = bar_color(2.0 * 16_666.6);
        assert!(balanced.r.abs_diff(balanced.g) <= 1);

        let slow = bar_color(80_000.0);
        assert!(slow.r > slow.g);
        assert_eq!(slow.r, 255);
    }

    #[test]
    fn test_series_is_oldest_first() {
        let mut history = FrameTimeHistory::new();
        for _ in 0..FRAME_HISTORY_SIZE - 1 {
            history.record(16_666);
        }
        history.record(200_000);
        let series = history.renderable_series();
        assert_eq!(series.len(), 300);
        assert_eq!(series[299].0, 40.0);
        assert!(series[..299].iter().all(|(h, _)| *h == series[0].0));
    }
}
