use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, OverlayError>;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Input output error: {0}")]
    Io(#[from] io::Error),
    #[error("No usable cpu lines in kernel counters: {0}")]
    MalformedStat(String),
    #[error("Could not open log file `{}`: {source}", .path.display())]
    LogOpen { path: PathBuf, source: io::Error },
    #[error("Could not write log file `{}`: {source}", .path.display())]
    LogWrite { path: PathBuf, source: io::Error },
    #[error("Configuration file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}
