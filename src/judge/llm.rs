//! LLM-as-judge implementation of [`MetricScorer`].

use super::rubrics::SCORE_BANDS;
use super::{EvaluationCase, Metric, MetricScore, MetricScorer};
use crate::api::AskAsync;
use crate::error::LlmError;
use crate::prompt::CostarPrompt;
use crate::utils::{extract_json_object, truncate_for_log};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument, warn};

static SCORE_IN_REASON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:score is|score of)\s*([\d.]+)").expect("score pattern is valid")
});

/// Scores metrics by asking a judge model to apply the metric's rubric.
///
/// The model must reply with a JSON object `{"score": n, "reason": "..."}`.
/// Scores are on the 0-10 scale and rescaled to [0, 1].
pub struct LlmJudge<'a, A> {
    ask: &'a A,
}

impl<'a, A> LlmJudge<'a, A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(ask: &'a A) -> Self {
        Self { ask }
    }

    fn prompt(metric: Metric, case: &EvaluationCase) -> String {
        let rubric = metric.rubric();
        let steps = rubric
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, s))
            .collect::<Vec<_>>()
            .join("\n");

        let mut prompt = CostarPrompt::new()
            .context(format!(
                "You are a strict evaluator of financial news writing, scoring the metric '{}'.",
                metric.name()
            ))
            .objective(format!("{}\n\nEvaluation steps:\n{}", rubric.criteria, steps))
            .audience("An automated quality gate that parses your answer as JSON.")
            .response(format!(
                "Reply with only a JSON object {{\"score\": <integer 0-10>, \"reason\": \"<one paragraph>\"}}. Score bands: {SCORE_BANDS}."
            ))
            .section("INPUT", &case.input)
            .section("ACTUAL OUTPUT", &case.actual_output);

        if case.retrieval_context.iter().any(|c| c != &case.input) {
            prompt = prompt.section("RETRIEVAL CONTEXT", case.retrieval_context.join("\n---\n"));
        }
        if rubric.uses_context && !case.context.is_empty() {
            prompt = prompt.section("CONTEXT", &case.context);
        }
        prompt.to_string()
    }
}

/// Read a judge reply into a normalized score.
pub fn parse_verdict(reply: &str) -> Result<MetricScore, LlmError> {
    let obj = extract_json_object(reply).ok_or_else(|| {
        LlmError::Malformed(format!("no JSON object in judge reply: {}", truncate_for_log(reply, 200)))
    })?;

    let reason = obj
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let raw = match obj.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .or_else(|| {
        SCORE_IN_REASON
            .captures(&reason)
            .and_then(|c| c[1].trim_end_matches('.').parse::<f64>().ok())
    })
    .filter(|v| v.is_finite())
    .ok_or_else(|| LlmError::Malformed("judge reply has no numeric score".into()))?;

    // The judge is asked for 0-10.
    Ok(MetricScore {
        score: (raw / 10.0).clamp(0.0, 1.0),
        reason,
    })
}

impl<'a, A> MetricScorer for LlmJudge<'a, A>
where
    A: AskAsync<Response = String>,
{
    #[instrument(level = "debug", skip_all, fields(metric = %metric))]
    async fn score(&self, metric: Metric, case: &EvaluationCase) -> Result<MetricScore, LlmError> {
        let reply = self.ask.ask(&Self::prompt(metric, case)).await?;
        match parse_verdict(&reply) {
            Ok(v) => {
                debug!(score = v.score, "Judge verdict parsed");
                Ok(v)
            }
            Err(e) => {
                warn!(error = %e, reply = %truncate_for_log(&reply, 300), "Unusable judge reply");
                Err(e)
            }
        }
    }
}
