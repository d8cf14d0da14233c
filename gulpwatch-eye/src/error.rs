//! Error types for gulpwatch-eye

use gulpwatch_core::Error as CoreError;
use thiserror::Error;

/// Errors at the perception and worker boundaries.
///
/// The per-tick detector itself never fails; these only surface from
/// adapters, the worker lifecycle and configuration.
#[derive(Error, Debug)]
pub enum EyeError {
    #[error("Perception error: {0}")]
    Perception(String),

    #[error("Perception sample timed out after {0} ms")]
    Timeout(u64),

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<EyeError> for CoreError {
    fn from(err: EyeError) -> Self {
        match err {
            EyeError::Config(msg) => CoreError::Configuration(msg),
            other => CoreError::Processing(format!("Detector error: {}", other)),
        }
    }
}
