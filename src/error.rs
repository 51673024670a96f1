use std::io;
use thiserror::Error;

/// Every failure is fatal to a conversion run; nothing is retried.
#[derive(Error, Debug)]
pub enum BvpError {
    /// The input stream did not carry exactly `width * height * depth` bytes.
    #[error("Input size mismatch: expected {expected} bytes, got {actual}")]
    InputSizeMismatch { expected: usize, actual: InputExtent },
    #[error("Buffer size mismatch: expected {expected} bytes, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How much input actually arrived. Reading stops as soon as the stream
/// overruns, so the exact excess is not known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputExtent {
    Exactly(usize),
    MoreThanExpected,
}

impl std::fmt::Display for InputExtent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputExtent::Exactly(n)       => write!(f, "{n} bytes (not enough data for this volume size)"),
            InputExtent::MoreThanExpected => write!(f, "more (too much data for this volume size)"),
        }
    }
}

pub type Result<T> = std::result::Result<T, BvpError>;
