//! Error types for the pipeline.
//!
//! - [`LlmError`]: failures of any LLM-bound call (generation, judging, tool turns)
//! - [`RegistryError`]: company registry could not be read
//! - [`PipelineError`]: input/output failures around the core

use std::time::Duration;
use thiserror::Error;

/// Failure of a single call to an LLM capability.
///
/// Timeouts are kept apart from provider and parse failures so callers can
/// tell "took too long" from "answered badly", even when both end in the same
/// fallback.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LlmError {
    #[error("LLM call timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("Malformed LLM response: {0}")]
    Malformed(String),
}

impl LlmError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Provider(_))
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read registry {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
