//! In-memory test doubles for the LLM and scoring capabilities.

use crate::api::AskAsync;
use crate::error::LlmError;
use crate::judge::{EvaluationCase, Metric, MetricScore, MetricScorer};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Replays a fixed script of replies, then repeats `fallback` forever.
pub struct ScriptedAsk {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Result<String, LlmError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAsk {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Err(LlmError::Provider("script exhausted".into())),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::new(vec![]).with_fallback(Ok(reply.to_string()))
    }

    pub fn always_err(e: LlmError) -> Self {
        Self::new(vec![]).with_fallback(Err(e))
    }

    pub fn with_fallback(mut self, fallback: Result<String, LlmError>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl AskAsync for ScriptedAsk {
    type Response = String;

    async fn ask(&self, text: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(text.to_string());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Answers every prompt through a closure.
pub struct FnAsk<F>(pub F);

impl<F> AskAsync for FnAsk<F>
where
    F: Fn(&str) -> Result<String, LlmError>,
{
    type Response = String;

    async fn ask(&self, text: &str) -> Result<String, LlmError> {
        (self.0)(text)
    }
}

/// Scores every metric through a closure and counts invocations.
pub struct FnScorer<F> {
    f: F,
    calls: AtomicUsize,
}

impl<F> FnScorer<F>
where
    F: Fn(Metric, &EvaluationCase) -> Result<MetricScore, LlmError>,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> MetricScorer for FnScorer<F>
where
    F: Fn(Metric, &EvaluationCase) -> Result<MetricScore, LlmError>,
{
    async fn score(&self, metric: Metric, case: &EvaluationCase) -> Result<MetricScore, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.f)(metric, case)
    }
}

/// A scorer that gives every metric the same score.
pub fn flat_scorer(
    score: f64,
) -> FnScorer<impl Fn(Metric, &EvaluationCase) -> Result<MetricScore, LlmError>> {
    FnScorer::new(move |_, _| {
        Ok(MetricScore {
            score,
            reason: format!("flat {score}"),
        })
    })
}
