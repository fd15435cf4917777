//! LLM capability with retry and timeout decorators.
//!
//! Every LLM-bound call in the pipeline (draft generation, refinement,
//! metric judging, terminology tool turns) goes through [`AskAsync`].
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`AwfulAsk`]: wraps the `awful_aj` library's `ask` function
//! - [`RetryAsk`]: decorator that retries transient provider failures
//! - [`TimeoutAsk`]: decorator that bounds a whole call, retries included
//!
//! The production stack is `TimeoutAsk<RetryAsk<AwfulAsk>>`, built by
//! [`build_client`].
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//! - Only [`LlmError::Provider`] is retried; timeouts and malformed
//!   responses surface immediately

use crate::error::LlmError;
use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{rng, Rng};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{error, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors send a fully rendered prompt to an LLM and return its reply.
/// Decorators ([`RetryAsk`], [`TimeoutAsk`]) implement it too, so they stack.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, LlmError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    ///
    /// ```ignore
    /// let client = AwfulAsk { config: &config, template: &template };
    /// let retry_client = RetryAsk::new(client, 5, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, LlmError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_transient() {
                        warn!(attempt, error = %e, "ask() failed with a non-retryable error");
                        return Err(e);
                    }

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Bounds every call to the inner capability by a wall-clock limit.
///
/// An expired call is dropped and reported as [`LlmError::Timeout`].
#[derive(Debug)]
pub struct TimeoutAsk<T> {
    inner: T,
    limit: StdDuration,
}

impl<T> TimeoutAsk<T> {
    pub fn new(inner: T, limit: StdDuration) -> Self {
        Self { inner, limit }
    }
}

impl<T> AskAsync for TimeoutAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    async fn ask(&self, text: &str) -> Result<Self::Response, LlmError> {
        match timeout(self.limit, self.inner.ask(text)).await {
            Ok(res) => res,
            Err(_) => {
                warn!(limit = ?self.limit, "LLM call timed out");
                Err(LlmError::Timeout { after: self.limit })
            }
        }
    }
}

/// Wrapper around `awful_aj::api::ask` that implements [`AskAsync`].
///
/// The template supplies the system prompt; the rendered CO-STAR prompt is
/// sent as the user message.
#[derive(Debug)]
pub struct AwfulAsk<'a> {
    /// LLM configuration (API keys, endpoints, model settings).
    pub config: &'a AwfulJadeConfig,
    /// Chat template defining the conversation structure.
    pub template: &'a ChatTemplate,
}

impl<'a> AskAsync for AwfulAsk<'a> {
    type Response = String;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, LlmError> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None)
            .await
            .map_err(|e| LlmError::Provider(e.to_string()));
        let dt = t0.elapsed();

        if let Err(e) = &res {
            warn!(elapsed_ms = dt.as_millis(), error = %e, "API call failed");
        }
        res
    }
}

/// The production client: `awful_aj` with retries, bounded by a timeout.
pub type LlmClient<'a> = TimeoutAsk<RetryAsk<AwfulAsk<'a>>>;

/// Build the production client for one chat template.
pub fn build_client<'a>(
    config: &'a AwfulJadeConfig,
    template: &'a ChatTemplate,
    max_retries: usize,
    limit: StdDuration,
) -> LlmClient<'a> {
    let client = AwfulAsk { config, template };
    TimeoutAsk::new(
        RetryAsk::new(client, max_retries, StdDuration::from_secs(1)),
        limit,
    )
}
