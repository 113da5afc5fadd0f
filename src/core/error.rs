//! Error types shared across the geomail core library.

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors produced by the discovery and aggregation pipeline.
///
/// Only `Config` is fatal to a run: it is raised before any entity
/// processing starts. Everything else is recovered at the smallest
/// affected unit (one pagination step, one adapter call, one validation
/// batch) and folded into the run summary.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid configuration detected at startup. Halts the run.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A call into an external capability failed (network, process,
    /// endpoint error). Retried by the owning layer, then degraded.
    #[error("External capability failure: {0}")]
    Capability(String),

    /// An external capability returned malformed or unexpected data.
    /// Logged and treated as an empty result for that call.
    #[error("Structural failure in external data: {0}")]
    Structural(String),

    /// A retry budget was spent without success. Recorded per query or
    /// per entity; never stops the run.
    #[error("Retry budget exhausted: {0}")]
    Exhausted(String),

    /// The entity store rejected an operation.
    #[error("Store error: {0}")]
    Store(String),

    /// A usable domain could not be extracted from the given input.
    #[error("Failed to extract domain: {0}")]
    DomainExtraction(String),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
