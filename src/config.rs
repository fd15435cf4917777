//! Pipeline settings.
//!
//! LLM endpoints and models live in the `awful_aj` `config.yaml`; this file
//! holds everything the pipeline itself decides: thresholds, retry ceilings,
//! concurrency, and languages. Every field has a default, so an empty or
//! partial YAML file is valid.
//!
//! ```yaml
//! threshold: 0.8
//! max_retries: 3
//! concurrency: 12
//! target_language: "Simplified Chinese (Malaysia)"
//! ```

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum score every metric must reach.
    pub threshold: f64,
    /// Refinements after the initial draft.
    pub max_retries: u32,
    /// Articles processed at the same time.
    pub concurrency: usize,
    /// Articles with this many characters or fewer are skipped.
    pub min_content_chars: usize,
    /// Wall-clock limit for one LLM call, backoff retries included.
    pub llm_timeout_secs: u64,
    /// Backoff retries of transient provider errors per LLM call.
    pub llm_max_retries: usize,
    /// Upper bound on terminology tool-call turns.
    pub max_tool_turns: usize,
    pub source_language: String,
    /// Translation is skipped when unset.
    pub target_language: Option<String>,
    pub writer_template: String,
    pub judge_template: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            max_retries: 3,
            concurrency: 12,
            min_content_chars: 50,
            llm_timeout_secs: 300,
            llm_max_retries: 5,
            max_tool_turns: 10,
            source_language: "English".to_string(),
            target_language: Some("Simplified Chinese (Malaysia)".to_string()),
            writer_template: "market_watch_writer".to_string(),
            judge_template: "market_watch_judge".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml(text: &str) -> Result<Self, PipelineError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    #[instrument(level = "info", skip_all, fields(%path))]
    pub async fn load(path: &str) -> Result<Self, PipelineError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|source| PipelineError::Io {
                path: path.to_string(),
                source,
            })?;
        let config = Self::from_yaml(&text)?;
        info!(?config, "Loaded pipeline configuration");
        Ok(config)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}
