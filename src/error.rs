//! Error types for the viewer pipeline.
//!
//! Every error is fatal: the viewer performs one bounded run per invocation,
//! so failures are surfaced to the caller immediately and never retried.

use std::path::PathBuf;
use thiserror::Error;

/// The error type for viewer and learner operations.
#[derive(Error, Debug)]
pub enum ViewerError {
    /// A configuration value would make the pipeline ill-defined.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The input image is missing or cannot be decoded.
    #[error("Failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The encoded vector length does not match the learner's input length.
    #[error("Configuration mismatch: learner expects {expected} inputs, encoder produces {actual}")]
    ConfigurationMismatch { expected: usize, actual: usize },

    /// Writing a frame or screenshot failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// A `Result` alias using [`ViewerError`].
pub type Result<T> = std::result::Result<T, ViewerError>;
