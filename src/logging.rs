//! Tracing setup.
//!
//! The TUI owns stdout, so records go to a log file under the user cache
//! directory. `RUST_LOG` selects the filter; the default is `info`.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_NAME: &str = "lms-dashboard.log";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("No cache directory available for logs")]
    NoCacheDir,
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber and return the log file path. Callers may
/// carry on without logging if this fails.
pub fn init() -> Result<PathBuf, LoggingError> {
    let dir = dirs::cache_dir()
        .ok_or(LoggingError::NoCacheDir)?
        .join("lms-dashboard");
    std::fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
        path: dir.clone(),
        source,
    })?;

    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::OpenFile {
            path: path.clone(),
            source,
        })?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()?;

    tracing::info!("logging to {}", path.display());
    Ok(path)
}
