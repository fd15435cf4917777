//! Quality judging of generated drafts.
//!
//! A [`Judge`] runs every [`Metric`] of its [`TaskProfile`] concurrently
//! against one [`EvaluationCase`] and folds the per-metric results into an
//! [`EvaluationSummary`]. The scoring itself is delegated to a
//! [`MetricScorer`] (in production, [`LlmJudge`]).
//!
//! A metric whose scorer fails is recorded with score `0.0` and the failure
//! as its feedback; it never aborts the evaluation.

mod llm;
mod rubrics;

pub use llm::LlmJudge;
pub use rubrics::Rubric;

use crate::error::LlmError;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{error, info, instrument};

/// A named quality metric with a fixed rubric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    FactualFidelity,
    ContentRelevance,
    ToneAndGrammar,
    ExecutiveWritingQuality,
    TranslationCompleteness,
    EntityLocalization,
    CoherenceAndFlow,
}

impl Metric {
    /// Display name, also the key in [`EvaluationSummary::metrics`].
    pub fn name(self) -> &'static str {
        match self {
            Metric::FactualFidelity => "Factual Fidelity",
            Metric::ContentRelevance => "Content Importance & Relevance",
            Metric::ToneAndGrammar => "Professional Tone & Grammar",
            Metric::ExecutiveWritingQuality => "Executive Writing Quality",
            Metric::TranslationCompleteness => "Translation Accuracy & Completeness",
            Metric::EntityLocalization => "Translation Financial Entity Localization",
            Metric::CoherenceAndFlow => "Summary Coherence & Flow",
        }
    }

    pub fn rubric(self) -> &'static Rubric {
        rubrics::for_metric(self)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const COMMON: &[Metric] = &[
    Metric::FactualFidelity,
    Metric::ContentRelevance,
    Metric::ToneAndGrammar,
    Metric::ExecutiveWritingQuality,
];

const TRANSLATION: &[Metric] = &[
    Metric::FactualFidelity,
    Metric::ContentRelevance,
    Metric::ToneAndGrammar,
    Metric::ExecutiveWritingQuality,
    Metric::TranslationCompleteness,
    Metric::EntityLocalization,
];

const SUMMARIZATION: &[Metric] = &[
    Metric::FactualFidelity,
    Metric::ContentRelevance,
    Metric::ToneAndGrammar,
    Metric::ExecutiveWritingQuality,
    Metric::CoherenceAndFlow,
];

const RECOVERY: &[Metric] = &[Metric::ExecutiveWritingQuality, Metric::CoherenceAndFlow];

/// Selects which metrics a [`Judge`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TaskProfile {
    General,
    Translation,
    Summarization,
    RecoverySummarization,
}

impl TaskProfile {
    pub fn metrics(self) -> &'static [Metric] {
        match self {
            TaskProfile::General => COMMON,
            TaskProfile::Translation => TRANSLATION,
            TaskProfile::Summarization => SUMMARIZATION,
            TaskProfile::RecoverySummarization => RECOVERY,
        }
    }
}

/// The single input every metric of one evaluation sees.
#[derive(Debug, Clone)]
pub struct EvaluationCase {
    /// Source text the candidate was produced from.
    pub input: String,
    /// The candidate under evaluation.
    pub actual_output: String,
    /// Passages the candidate may draw on. Defaults to the source text.
    pub retrieval_context: Vec<String>,
    /// Free-form context tag, e.g. a localization map.
    pub context: String,
}

impl EvaluationCase {
    pub fn new(candidate: &str, source: &str, context_tag: &str) -> Self {
        Self {
            input: source.to_string(),
            actual_output: candidate.to_string(),
            retrieval_context: vec![source.to_string()],
            context: context_tag.to_string(),
        }
    }
}

/// Raw judgement from a scorer, before threshold comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricScore {
    pub score: f64,
    pub reason: String,
}

/// Scores one metric against one case.
pub trait MetricScorer {
    async fn score(&self, metric: Metric, case: &EvaluationCase) -> Result<MetricScore, LlmError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub name: String,
    pub score: f64,
    pub threshold: f64,
    pub passed: bool,
    pub feedback: String,
}

impl MetricResult {
    fn new(metric: Metric, score: f64, threshold: f64, feedback: String) -> Self {
        Self {
            name: metric.name().to_string(),
            score,
            threshold,
            passed: score >= threshold,
            feedback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub timestamp: DateTime<Utc>,
    pub context_tag: String,
    pub metrics: BTreeMap<String, MetricResult>,
    pub overall_pass: bool,
    pub average_score: f64,
}

impl EvaluationSummary {
    pub fn from_results(context_tag: &str, results: Vec<MetricResult>) -> Self {
        let overall_pass = results.iter().all(|r| r.passed);
        let average_score = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64
        };
        Self {
            timestamp: Utc::now(),
            context_tag: context_tag.to_string(),
            metrics: results.into_iter().map(|r| (r.name.clone(), r)).collect(),
            overall_pass,
            average_score,
        }
    }

    /// Feedback of every failing metric, one `- name (score): feedback` line each.
    pub fn failing_feedback(&self) -> String {
        self.metrics
            .values()
            .filter(|m| !m.passed)
            .map(|m| format!("- {} ({:.2}): {}", m.name, m.score, m.feedback))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs a task profile's metrics through a scorer.
pub struct Judge<'a, S> {
    scorer: &'a S,
    profile: TaskProfile,
    metrics: &'a [Metric],
    threshold: f64,
}

impl<'a, S> Judge<'a, S>
where
    S: MetricScorer,
{
    pub fn new(scorer: &'a S, profile: TaskProfile, threshold: f64) -> Self {
        Self {
            scorer,
            profile,
            metrics: profile.metrics(),
            threshold,
        }
    }

    /// Replace the profile's metric set with an explicit one.
    #[cfg(test)]
    pub fn with_metrics(mut self, metrics: &'a [Metric]) -> Self {
        self.metrics = metrics;
        self
    }

    /// Evaluate `candidate` against `source` with every metric of the profile.
    #[instrument(level = "info", skip_all, fields(profile = ?self.profile))]
    pub async fn evaluate(&self, candidate: &str, source: &str, context_tag: &str) -> EvaluationSummary {
        let case = EvaluationCase::new(candidate, source, context_tag);
        self.evaluate_case(&case).await
    }

    pub async fn evaluate_case(&self, case: &EvaluationCase) -> EvaluationSummary {
        let results = join_all(
            self.metrics
                .iter()
                .map(|&metric| self.run_metric(metric, case)),
        )
        .await;

        let summary = EvaluationSummary::from_results(&case.context, results);
        info!(
            overall_pass = summary.overall_pass,
            average_score = summary.average_score,
            "Evaluation complete"
        );
        summary
    }

    async fn run_metric(&self, metric: Metric, case: &EvaluationCase) -> MetricResult {
        match self.scorer.score(metric, case).await {
            Ok(s) => {
                let result = MetricResult::new(metric, s.score, self.threshold, s.reason);
                info!(
                    metric = %metric,
                    score = result.score,
                    passed = result.passed,
                    "Metric scored"
                );
                result
            }
            Err(e) => {
                error!(metric = %metric, error = %e, "Metric execution failed");
                MetricResult::new(metric, 0.0, self.threshold, format!("Execution Failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{flat_scorer, FnScorer};
    use proptest::prelude::*;
    use std::time::Duration;

    fn result(score: f64, threshold: f64) -> MetricResult {
        MetricResult::new(Metric::FactualFidelity, score, threshold, String::new())
    }

    #[test]
    fn profiles_select_fixed_metric_sets() {
        assert_eq!(TaskProfile::General.metrics().len(), 4);
        assert_eq!(TaskProfile::Summarization.metrics().len(), 5);
        assert!(TaskProfile::Summarization.metrics().contains(&Metric::CoherenceAndFlow));
        assert_eq!(TaskProfile::Translation.metrics().len(), 6);
        assert!(TaskProfile::Translation.metrics().contains(&Metric::EntityLocalization));
        assert_eq!(
            TaskProfile::RecoverySummarization.metrics(),
            &[Metric::ExecutiveWritingQuality, Metric::CoherenceAndFlow]
        );
    }

    #[test]
    fn pass_is_score_at_or_above_threshold() {
        assert!(result(0.8, 0.8).passed);
        assert!(!result(0.79, 0.8).passed);
    }

    #[test]
    fn summary_aggregates_and_and_mean() {
        let grids: &[&[f64]] = &[&[1.0, 1.0, 1.0], &[0.9, 0.5, 0.85], &[0.0], &[0.8, 0.81, 0.99, 0.2]];
        for scores in grids {
            let results: Vec<MetricResult> = scores
                .iter()
                .zip(TaskProfile::Translation.metrics())
                .map(|(&s, &m)| MetricResult::new(m, s, 0.8, String::new()))
                .collect();
            let want_pass = results.iter().all(|r| r.passed);
            let want_mean = scores.iter().sum::<f64>() / scores.len() as f64;

            let summary = EvaluationSummary::from_results("General", results);
            assert_eq!(summary.overall_pass, want_pass);
            assert!((summary.average_score - want_mean).abs() < 1e-12);
            assert_eq!(summary.metrics.len(), scores.len());
        }
    }

    #[test]
    fn failing_feedback_lists_only_failures() {
        let summary = EvaluationSummary::from_results(
            "General",
            vec![
                MetricResult::new(Metric::ToneAndGrammar, 0.9, 0.8, "fine".into()),
                MetricResult::new(Metric::CoherenceAndFlow, 0.4, 0.8, "jumbled".into()),
            ],
        );
        let fb = summary.failing_feedback();
        assert!(fb.contains("Summary Coherence & Flow (0.40): jumbled"));
        assert!(!fb.contains("fine"));
    }

    #[tokio::test]
    async fn all_metrics_passing_passes_overall() {
        let scorer = flat_scorer(0.9);
        let judge = Judge::new(&scorer, TaskProfile::Summarization, 0.8);

        let summary = judge.evaluate("draft", "source", "General").await;
        assert!(summary.overall_pass);
        assert_eq!(summary.metrics.len(), 5);
        assert_eq!(scorer.calls(), 5);
        assert!((summary.average_score - 0.9).abs() < 1e-12);
    }

    #[tokio::test]
    async fn failing_metric_is_zeroed_not_fatal() {
        let scorer = FnScorer::new(|metric, _| {
            if metric == Metric::ContentRelevance {
                Err(LlmError::Timeout {
                    after: Duration::from_secs(300),
                })
            } else {
                Ok(MetricScore {
                    score: 1.0,
                    reason: "ok".into(),
                })
            }
        });
        let judge = Judge::new(&scorer, TaskProfile::General, 0.5);

        let summary = judge.evaluate("draft", "source", "General").await;
        assert_eq!(summary.metrics.len(), 4);
        let failed = &summary.metrics[Metric::ContentRelevance.name()];
        assert_eq!(failed.score, 0.0);
        assert!(!failed.passed);
        assert!(failed.feedback.contains("timed out"));
        assert!(!summary.overall_pass);
        assert!((summary.average_score - 0.75).abs() < 1e-12);
    }

    #[tokio::test]
    async fn three_metrics_with_one_raising() {
        let scorer = FnScorer::new(|metric, _| match metric {
            Metric::ToneAndGrammar => Err(LlmError::Provider("judge model unavailable".into())),
            _ => Ok(MetricScore {
                score: 0.95,
                reason: "solid".into(),
            }),
        });
        let metrics = [
            Metric::FactualFidelity,
            Metric::ToneAndGrammar,
            Metric::CoherenceAndFlow,
        ];
        let judge = Judge::new(&scorer, TaskProfile::General, 0.8).with_metrics(&metrics);

        let summary = judge.evaluate("draft", "source", "General").await;
        assert_eq!(summary.metrics.len(), 3);
        let failed = &summary.metrics["Professional Tone & Grammar"];
        assert_eq!(failed.score, 0.0);
        assert!(!failed.feedback.is_empty());
        assert!(!summary.overall_pass);
    }

    #[tokio::test]
    async fn case_carries_source_candidate_and_context() {
        let scorer = FnScorer::new(|_, case: &EvaluationCase| {
            assert_eq!(case.input, "the source");
            assert_eq!(case.actual_output, "the draft");
            assert_eq!(case.retrieval_context, vec!["the source".to_string()]);
            assert_eq!(case.context, "Localization Map: Bursa => 马股");
            Ok(MetricScore {
                score: 1.0,
                reason: String::new(),
            })
        });
        let judge = Judge::new(&scorer, TaskProfile::RecoverySummarization, 0.8);

        let summary = judge
            .evaluate("the draft", "the source", "Localization Map: Bursa => 马股")
            .await;
        assert_eq!(summary.context_tag, "Localization Map: Bursa => 马股");
        assert!(summary.overall_pass);
    }

    proptest! {
        #[test]
        fn summary_is_and_of_passes_and_mean_of_scores(
            scores in prop::collection::vec(0.0f64..=1.0, 1..=6),
            threshold in 0.0f64..=1.0,
        ) {
            let results: Vec<MetricResult> = scores
                .iter()
                .zip(TaskProfile::Translation.metrics())
                .map(|(&s, &m)| MetricResult::new(m, s, threshold, String::new()))
                .collect();

            let summary = EvaluationSummary::from_results("General", results);
            let want_mean = scores.iter().sum::<f64>() / scores.len() as f64;
            prop_assert_eq!(summary.overall_pass, scores.iter().all(|&s| s >= threshold));
            prop_assert!((summary.average_score - want_mean).abs() < 1e-9);
            prop_assert!((0.0..=1.0).contains(&summary.average_score));
            prop_assert_eq!(summary.metrics.len(), scores.len());
        }
    }
}
