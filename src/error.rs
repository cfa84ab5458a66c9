// In: src/error.rs

//! This module defines the single, unified error type for the entire stagepipe library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

/// Shorthand used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    // =========================================================================
    // === Construction Errors
    // =========================================================================
    #[error("A pipeline needs at least one transform stage")]
    EmptyPipeline,

    #[error("Failed to spawn worker thread for stage '{stage}': {source}")]
    WorkerSpawn {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // === Runtime Errors
    // =========================================================================
    /// `submit` was called after the shutdown signal was sent.
    #[error("Pipeline is closed and accepts no further items")]
    Closed,

    /// A hand-off failed because the worker on the other side is gone.
    #[error("Stage '{stage}' is no longer running")]
    Disconnected { stage: String },

    /// The item behind a completion handle was dropped by a failed stage.
    #[error("Item was abandoned before reaching the end of the pipeline")]
    Abandoned,

    #[error("Worker for stage '{stage}' terminated abnormally")]
    StageFailed { stage: String },

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error from the Serde JSON library, typically while loading a config.
    #[error("Serde JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error originating from the underlying I/O subsystem (e.g., a config file not found).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
