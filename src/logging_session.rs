use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use tracing::{debug, info};

use crate::constants::LOG_INTERVAL_MS;
use crate::error::{OverlayError, Result};
use crate::frame_clock::Fps;

/// One line of the session log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogEntry {
    pub fps: Fps,
    /// Aggregate cpu utilization in percent
    pub cpu: f32,
    pub gpu_load: f32,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.fps, self.cpu, self.gpu_load)
    }
}

/// `<base>_<Y>-<M>-<D>_<H>-<Min>-<S>`, fields not zero padded
pub fn session_file_name(base: &Path, started: &NaiveDateTime) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(
        "_{}-{}-{}_{}-{}-{}",
        started.year(),
        started.month(),
        started.day(),
        started.hour(),
        started.minute(),
        started.second()
    ));
    PathBuf::from(name)
}

#[derive(Debug)]
enum SessionState {
    /// No base path configured
    Disabled,
    Idle,
    Recording {
        file: File,
        path: PathBuf,
        last_entry: Instant,
    },
}

/// Hotkey driven recording of periodic samples to a timestamped file.
///
/// Entries stay in memory while recording and are written in one go when
/// the session stops.
#[derive(Debug)]
pub struct LoggingSession {
    base_path: Option<PathBuf>,
    interval: Duration,
    state: SessionState,
    entries: Vec<LogEntry>,
}

impl LoggingSession {
    pub fn new(base_path: Option<PathBuf>) -> Self {
        Self::with_interval(base_path, Duration::from_millis(LOG_INTERVAL_MS))
    }

    pub fn with_interval(base_path: Option<PathBuf>, interval: Duration) -> Self {
        let state = if base_path.is_some() {
            SessionState::Idle
        } else {
            SessionState::Disabled
        };
        Self {
            base_path,
            interval,
            state,
            entries: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.state, SessionState::Disabled)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, SessionState::Recording { .. })
    }

    pub fn current_path(&self) -> Option<&Path> {
        match &self.state {
            SessionState::Recording { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Flip between idle and recording, using the local wall clock for the file name.
    pub fn toggle(&mut self, now: Instant) -> Result<()> {
        self.toggle_at(now, Local::now().naive_local())
    }

    pub fn toggle_at(&mut self, now: Instant, wall_clock: NaiveDateTime) -> Result<()> {
        match self.state {
            SessionState::Disabled => Ok(()),
            SessionState::Idle => self.start(now, wall_clock),
            SessionState::Recording { .. } => self.stop(),
        }
    }

    fn start(&mut self, now: Instant, wall_clock: NaiveDateTime) -> Result<()> {
        let Some(base) = &self.base_path else {
            return Ok(());
        };
        let path = session_file_name(base, &wall_clock);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| OverlayError::LogOpen {
                path: path.clone(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| OverlayError::LogOpen {
                path: path.clone(),
                source,
            })?;

        info!("logging session started: {}", path.display());
        self.entries.clear();
        self.state = SessionState::Recording {
            file,
            path,
            last_entry: now,
        };
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let (file, path) = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Recording { file, path, .. } => (file, path),
            other => {
                self.state = other;
                return Ok(());
            }
        };

        let entries = std::mem::take(&mut self.entries);
        let mut writer = BufWriter::new(file);
        let written = entries
            .iter()
            .try_for_each(|entry| writeln!(writer, "{entry}"))
            .and_then(|()| writer.flush());
        written.map_err(|source| OverlayError::LogWrite {
            path: path.clone(),
            source,
        })?;

        info!(
            "logging session stopped: {} entries written to {}",
            entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Append one entry if recording and the log interval elapsed since the last one.
    pub fn maybe_record(&mut self, now: Instant, entry: impl FnOnce() -> LogEntry) -> bool {
        let SessionState::Recording { last_entry, .. } = &mut self.state else {
            return false;
        };
        if now.saturating_duration_since(*last_entry) < self.interval {
            return false;
        }
        *last_entry = now;

        let entry = entry();
        debug!("log entry {entry}");
        self.entries.push(entry);
        true
    }
}
