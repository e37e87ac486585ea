// Public modules
pub mod cpu_load;
pub mod cpu_worker;
pub mod error;
pub mod frame_clock;
pub mod frame_history;
pub mod hotkey;
pub mod hud_config;
pub mod logging_session;
pub mod overlay;
pub mod renderer;

pub use error::{OverlayError, Result};
pub use hud_config::{HudConfig, HudElements};
pub use overlay::{FrameInput, TelemetryOverlay};

// Re-export constants commonly used
pub mod constants {
    pub const FPS_UPDATE_INTERVAL_US: u64 = 500_000;
    pub const CPU_SAMPLE_WINDOW_MS: u64 = 100;
    pub const TOGGLE_DEBOUNCE_MS: u64 = 500;
    pub const LOG_INTERVAL_MS: u64 = 1000;

    pub const FRAME_HISTORY_SIZE: usize = 300;
    // 60 FPS = optimal, 10 FPS = worst
    pub const GRAPH_TARGET_US: f32 = 16_666.6;
    pub const GRAPH_MIN_US: f32 = 5_000.0;
    pub const GRAPH_MAX_US: f32 = 100_000.0;
    pub const GRAPH_MIN_HEIGHT: f32 = 2.0;
    pub const GRAPH_MAX_HEIGHT: f32 = 40.0;

    pub const LOAD_LINE_WIDTH: usize = 10;

    pub const HUD_MARGIN_X: f32 = 8.0;
    pub const HUD_MARGIN_Y: f32 = 24.0;
    pub const TEXT_SIZE: f32 = 16.0;
    pub const LINE_HEIGHT: f32 = 24.0;
    pub const GRAPH_HEIGHT: f32 = 66.0;
    pub const GRAPH_LABEL_OFFSET: f32 = 44.0;
    pub const GRAPH_LABEL_SIZE: f32 = 14.0;
    pub const GRAPH_MAX_LABEL_X: f32 = 150.0;
    pub const LOGGING_INDICATOR_TEXT: &str = "Logging...";
    pub const LOGGING_INDICATOR_INSET_X: f32 = 150.0;
    pub const LOGGING_INDICATOR_INSET_Y: f32 = 24.0;
}
