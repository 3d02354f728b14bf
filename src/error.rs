//! Error types for the topic-tracking segmentation engines.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for topictrack operations.
#[derive(Error, Debug)]
pub enum TopicTrackError {
    /// Invalid configuration (prior, beam width, topic cap, document count).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corpus shape does not match what the engine was told to expect.
    #[error("Shape error: {0}")]
    Shape(String),

    /// A log-likelihood turned out NaN or infinite.
    #[error("Numeric error: {0}")]
    Numeric(String),

    /// A worker of the parallel beam expansion failed.
    #[error("Worker error: {0}")]
    Worker(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Empty input.
    #[error("Empty input: {0}")]
    EmptyInput(String),
}

/// Result type alias for topictrack operations.
pub type Result<T> = std::result::Result<T, TopicTrackError>;

impl From<serde_json::Error> for TopicTrackError {
    fn from(err: serde_json::Error) -> Self {
        TopicTrackError::Serialization(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for TopicTrackError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        TopicTrackError::Worker(err.to_string())
    }
}
