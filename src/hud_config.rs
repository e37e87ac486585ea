use std::path::{Path, PathBuf};
use std::time::Duration;

use bitflags::bitflags;
use toml::Table;
use tracing::{info, warn};

use crate::constants::LOG_INTERVAL_MS;
use crate::error::Result;
use crate::renderer::HudPos;

bitflags! {
    /// Overlay elements, drawn top to bottom in declaration order
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HudElements: u32 {
        const GPU_LOAD = 1 << 0;
        const CPU_LOAD = 1 << 1;
        const FRAMERATE = 1 << 2;
        const FRAMETIMES = 1 << 3;
        const LOGGING = 1 << 4;
    }
}

impl HudElements {
    /// Parse a comma separated element list such as `fps,frametimes`.
    ///
    /// `full` enables everything, `1` only the framerate. Unknown names are
    /// reported and skipped.
    pub fn parse_list(list: &str) -> Self {
        let mut elements = HudElements::empty();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match Self::from_element_name(name) {
                Some(e) => elements |= e,
                None => warn!("unknown hud element {name:?}, ignored"),
            }
        }
        elements
    }

    fn from_element_name(name: &str) -> Option<Self> {
        Some(match name {
            "full" => HudElements::all(),
            "1" | "fps" => HudElements::FRAMERATE,
            "frametimes" => HudElements::FRAMETIMES,
            "cpu_load" | "cpu" => HudElements::CPU_LOAD,
            "gpu_load" | "gpu" => HudElements::GPU_LOAD,
            "logging" => HudElements::LOGGING,
            _ => return None,
        })
    }
}

/// Everything the overlay reads from the outside world at creation
#[derive(Debug, Clone, PartialEq)]
pub struct HudConfig {
    pub elements: HudElements,
    pub offset: HudPos,
    pub log_base_path: Option<PathBuf>,
    pub log_interval: Duration,
}

impl Default for HudConfig {
    fn default() -> Self {
        Self {
            elements: HudElements::empty(),
            offset: HudPos::default(),
            log_base_path: None,
            log_interval: Duration::from_millis(LOG_INTERVAL_MS),
        }
    }
}

pub const ENV_ELEMENTS: &str = "PERF_HUD";
pub const ENV_OFFSET_X: &str = "PERF_HUD_OFFSET_X";
pub const ENV_OFFSET_Y: &str = "PERF_HUD_OFFSET_Y";
pub const ENV_LOG_FILE: &str = "PERF_HUD_LOG_FILE";
pub const ENV_LOG_INTERVAL: &str = "PERF_HUD_LOG_INTERVAL_MS";
pub const ENV_CONFIG_FILE: &str = "PERF_HUD_CONFIG";

impl HudConfig {
    pub fn is_enabled(&self) -> bool {
        !self.elements.is_empty()
    }

    /// Config file first, environment on top. A missing file is not an error.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(ENV_CONFIG_FILE)
            .map(PathBuf::from)
            .or_else(default_config_path);

        let config = match path {
            Some(path) if path.exists() => {
                info!("found config file: {}", path.display());
                Self::from_toml_file(&path)?
            }
            _ => Self::default(),
        };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = content.parse::<Table>()?;
        let defaults = Self::default();

        let elements = match config.get("elements") {
            None => defaults.elements,
            Some(toml::Value::String(list)) => HudElements::parse_list(list),
            Some(toml::Value::Array(names)) => {
                let names: Vec<&str> = names
                    .iter()
                    .filter_map(|v| {
                        v.as_str().or_else(|| {
                            warn!("elements entries must be strings, {v} ignored");
                            None
                        })
                    })
                    .collect();
                HudElements::parse_list(&names.join(","))
            }
            Some(_) => {
                warn!("elements must be a string or an array of strings, overlay disabled");
                defaults.elements
            }
        };

        let offset = config.get("offset").and_then(|t| t.as_table());
        let offset_x = offset_coordinate(offset, "x", defaults.offset.x);
        let offset_y = offset_coordinate(offset, "y", defaults.offset.y);

        let logging = config.get("logging").and_then(|t| t.as_table());
        let log_base_path = logging
            .and_then(|t| t.get("path"))
            .ok_or("is missing")
            .and_then(|v| v.as_str().ok_or("must be a string"))
            .and_then(|v| (!v.is_empty()).then_some(v).ok_or("must not be empty"))
            .map(|v| Some(PathBuf::from(v)))
            .unwrap_or_else(|s| {
                if logging.is_some() {
                    warn!("logging.path {s}, session logging disabled");
                }
                None
            });
        // ms
        let log_interval = logging
            .and_then(|t| t.get("interval-ms"))
            .ok_or("is missing")
            .and_then(|v| v.as_integer().ok_or("must be an integer"))
            .and_then(|v| v.is_positive().then_some(v).ok_or("must be positive"))
            .map(|v| Duration::from_millis(v as u64))
            .unwrap_or_else(|s| {
                if logging.is_some() {
                    warn!(
                        "logging.interval-ms {s}, replaced with the default of {LOG_INTERVAL_MS} ms"
                    );
                }
                defaults.log_interval
            });

        Ok(Self {
            elements,
            offset: HudPos::new(offset_x, offset_y),
            log_base_path,
            log_interval,
        })
    }

    /// Override with environment style variables read through `var`
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(list) = var(ENV_ELEMENTS) {
            self.elements = HudElements::parse_list(&list);
        }
        if let Some(x) = var(ENV_OFFSET_X) {
            match x.trim().parse::<f32>() {
                Ok(x) => self.offset.x = x,
                Err(_) => warn!("{ENV_OFFSET_X}={x:?} is not a number, ignored"),
            }
        }
        if let Some(y) = var(ENV_OFFSET_Y) {
            match y.trim().parse::<f32>() {
                Ok(y) => self.offset.y = y,
                Err(_) => warn!("{ENV_OFFSET_Y}={y:?} is not a number, ignored"),
            }
        }
        if let Some(path) = var(ENV_LOG_FILE) {
            self.log_base_path = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(interval) = var(ENV_LOG_INTERVAL) {
            match interval.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.log_interval = Duration::from_millis(ms),
                _ => warn!("{ENV_LOG_INTERVAL}={interval:?} must be a positive integer, ignored"),
            }
        }
        self
    }
}

/// `offset.<key>` as an integer or float, `default` when absent or invalid
fn offset_coordinate(offset: Option<&Table>, key: &str, default: f32) -> f32 {
    offset
        .and_then(|t| t.get(key))
        .ok_or("is missing")
        .and_then(|v| {
            v.as_float()
                .or_else(|| v.as_integer().map(|v| v as f64))
                .ok_or("must be a number")
        })
        .map(|v| v as f32)
        .unwrap_or_else(|s| {
            if offset.is_some() {
                warn!("offset.{key} {s}, replaced with the default of {default}");
            }
            default
        })
}

fn default_config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("perf-overlay");
    path.push("config.toml");
    Some(path)
}
