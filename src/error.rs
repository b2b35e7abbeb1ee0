//! Error types for zsc-eval
//!
//! Only conditions that must stop a sweep are errors. Missing metrics,
//! failed reference episodes and bound inconsistencies are reported through
//! `tracing` and surface as `Option`s in the metric APIs.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// zsc-eval error types
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed sweep configuration (fatal, raised before any file is read)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Episode present in one dataset but absent from the one joined against
    /// (only raised with the strict missing-episode policy)
    #[error("Episode {episode_id} missing from {dataset} results\nRe-run with the `skip` missing-episode policy to ignore it")]
    MissingEpisode {
        /// Episode identifier
        episode_id: i64,
        /// Dataset the episode was looked up in
        dataset: String,
    },

    /// Aggregation called on an episode without samples (caller bug)
    #[error("Episode `{0}` has no samples to aggregate. Please report this issue.")]
    EmptyEpisode(String),

    /// Binary result file could not be decoded
    #[error("Failed to decode {path}: {message}")]
    Decode {
        /// File being decoded
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// Worker pool could not be built
    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Directory listing failed
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Heatmap rendering failed
    #[error("Render error: {0}")]
    Render(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
