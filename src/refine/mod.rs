//! The self-correcting draft loop.
//!
//! ```text
//! Initial ──► Evaluating ──► Done
//!                 ▲   │
//!                 │   ▼
//!              Refining
//! ```
//!
//! A first draft is generated from the source, judged, and regenerated from
//! the latest failing feedback until it passes or `max_retries` refinements
//! have been spent. The loop always ends with a draft: a failing draft after
//! the last refinement is returned as a best effort, not an error.

mod glossary;

pub use glossary::{render_terms, GlossaryScanner, TermPair};

use crate::api::AskAsync;
use crate::error::LlmError;
use crate::judge::{EvaluationSummary, Judge, MetricScorer, TaskProfile};
use crate::prompt::CostarPrompt;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Initial,
    Evaluating,
    Refining,
    Done,
}

impl LoopState {
    /// The state that follows `self`, given the draft state after `self` ran.
    pub fn next(self, draft: &DraftState) -> LoopState {
        match self {
            LoopState::Initial => LoopState::Evaluating,
            LoopState::Evaluating if draft.is_passing => LoopState::Done,
            LoopState::Evaluating if draft.retry_count >= draft.max_retries => LoopState::Done,
            LoopState::Evaluating => LoopState::Refining,
            LoopState::Refining => LoopState::Evaluating,
            LoopState::Done => LoopState::Done,
        }
    }
}

/// Everything one loop run knows about its draft.
#[derive(Debug, Clone)]
pub struct DraftState {
    source: String,
    pub current_draft: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub feedback: String,
    pub score: f64,
    pub is_passing: bool,
}

impl DraftState {
    fn new(source: &str, max_retries: u32) -> Self {
        Self {
            source: source.to_string(),
            current_draft: String::new(),
            retry_count: 0,
            max_retries,
            feedback: String::new(),
            score: 0.0,
            is_passing: false,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn start(&mut self, draft: String) {
        self.current_draft = draft;
        self.retry_count = 0;
        self.feedback.clear();
    }

    fn record(&mut self, summary: &EvaluationSummary) {
        self.score = summary.average_score;
        self.is_passing = summary.overall_pass;
        self.feedback = summary.failing_feedback();
    }

    /// Count one refinement; a failed regeneration keeps the previous draft.
    fn refined(&mut self, draft: Option<String>) {
        if let Some(d) = draft {
            self.current_draft = d;
        }
        self.retry_count += 1;
    }
}

/// What to produce from the source text.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftTask {
    Summarize,
    Translate {
        source_lang: String,
        target_lang: String,
    },
}

impl DraftTask {
    pub fn profile(&self) -> TaskProfile {
        match self {
            DraftTask::Summarize => TaskProfile::Summarization,
            DraftTask::Translate { .. } => TaskProfile::Translation,
        }
    }

    fn context_tag(&self, terms: &[TermPair]) -> String {
        match self {
            DraftTask::Summarize => "General".to_string(),
            DraftTask::Translate { target_lang, .. } if terms.is_empty() => {
                format!("Translation to {target_lang}")
            }
            DraftTask::Translate { target_lang, .. } => format!(
                "Translation to {target_lang}\nLocalization Map:\n{}",
                render_terms(terms)
            ),
        }
    }

    fn initial_prompt(&self, source: &str) -> String {
        match self {
            DraftTask::Summarize => CostarPrompt::new()
                .context("You are a corporate news analyst preparing brief updates for an investment report.")
                .objective("Analyze the full corporate news article and write a concise abstractive summary.")
                .style("Financial news brief.")
                .tone("Neutral, professional financial journalism.")
                .audience("A senior investment editor or portfolio manager who needs quick, factual insights.")
                .response(
                    "A summary that: 1) is 3 to 4 sentences long; 2) presents the key corporate or financial \
developments factually; 3) avoids opinions, redundancy and speculation; 4) uses standard financial \
abbreviations (RM, %, bn, m). Output the summary only.",
                )
                .section("SOURCE ARTICLE", source)
                .to_string(),
            DraftTask::Translate {
                source_lang,
                target_lang,
            } => CostarPrompt::new()
                .context(format!(
                    "You are a translator for a bank, translating investment and corporate news from {source_lang} to {target_lang}."
                ))
                .objective(format!(
                    "Translate the source text from {source_lang} to {target_lang}."
                ))
                .style("A financial report: precise, formal, with official institution names.")
                .audience("The bank's investment report senior editor.")
                .response(format!(
                    "Output only the {target_lang} translation, with no explanation or introduction."
                ))
                .section("SOURCE TEXT", source)
                .to_string(),
        }
    }

    fn refine_prompt(&self, state: &DraftState, terms: &[TermPair]) -> String {
        let base = match self {
            DraftTask::Summarize => CostarPrompt::new()
                .context("You are a corporate news analyst revising a summary after editorial review.")
                .objective(
                    "Rewrite the previous summary so that it resolves every point of the reviewer feedback \
while staying faithful to the source article.",
                )
                .audience("A senior investment editor or portfolio manager.")
                .response("Output the revised 3 to 4 sentence summary only."),
            DraftTask::Translate {
                source_lang,
                target_lang,
            } => CostarPrompt::new()
                .context(format!(
                    "You are a translator for a bank, refining a {source_lang} to {target_lang} translation based on senior editor feedback."
                ))
                .objective("Rework the previous translation so that it resolves every point of the feedback.")
                .audience("The bank's investment report senior editor.")
                .response(format!(
                    "Output the final refined {target_lang} translation only, no explanations."
                )),
        };

        let mut prompt = base
            .section("SOURCE", state.source())
            .section("PREVIOUS DRAFT", &state.current_draft)
            .section("REVIEWER FEEDBACK", &state.feedback);
        if !terms.is_empty() {
            prompt = prompt.section(
                "MANDATORY TERMINOLOGY (use exactly as given)",
                render_terms(terms),
            );
        }
        prompt.to_string()
    }
}

/// Final product of one loop run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementOutcome {
    pub draft: String,
    pub passed: bool,
    pub score: f64,
    /// Generation calls made, initial draft included.
    pub attempts: u32,
    pub feedback: String,
}

pub struct RefinementLoop<'a, G, S> {
    writer: &'a G,
    judge: Judge<'a, S>,
    task: DraftTask,
    max_retries: u32,
    glossary: Option<GlossaryScanner<'a, G>>,
}

impl<'a, G, S> RefinementLoop<'a, G, S>
where
    G: AskAsync<Response = String>,
    S: MetricScorer,
{
    pub fn new(writer: &'a G, judge: Judge<'a, S>, task: DraftTask, max_retries: u32) -> Self {
        Self {
            writer,
            judge,
            task,
            max_retries,
            glossary: None,
        }
    }

    /// Scan for mandatory terminology before the first refinement.
    pub fn with_glossary(mut self, scanner: GlossaryScanner<'a, G>) -> Self {
        self.glossary = Some(scanner);
        self
    }

    /// Drive `source` through the loop to a final draft.
    ///
    /// Fails only when the initial draft cannot be generated; judge and
    /// refinement failures degrade the result instead.
    #[instrument(level = "info", skip_all, fields(profile = ?self.task.profile()))]
    pub async fn run(&self, source: &str) -> Result<RefinementOutcome, LlmError> {
        let mut draft = DraftState::new(source, self.max_retries);
        let mut state = LoopState::Initial;
        let mut terms: Option<Vec<TermPair>> = None;
        let mut attempts = 0u32;

        loop {
            match state {
                LoopState::Done => break,
                LoopState::Initial => {
                    attempts += 1;
                    let first = self.writer.ask(&self.task.initial_prompt(source)).await?;
                    draft.start(first);
                }
                LoopState::Evaluating => {
                    let tag = self.task.context_tag(terms.as_deref().unwrap_or_default());
                    let summary = self.judge.evaluate(&draft.current_draft, source, &tag).await;
                    draft.record(&summary);
                    info!(
                        retry = draft.retry_count,
                        score = draft.score,
                        passing = draft.is_passing,
                        "Draft evaluated"
                    );
                }
                LoopState::Refining => {
                    if terms.is_none() {
                        terms = Some(match &self.glossary {
                            Some(scanner) => scanner.scan(source).await,
                            None => Vec::new(),
                        });
                    }
                    attempts += 1;
                    let prompt = self
                        .task
                        .refine_prompt(&draft, terms.as_deref().unwrap_or_default());
                    match self.writer.ask(&prompt).await {
                        Ok(revised) => draft.refined(Some(revised)),
                        Err(e) => {
                            warn!(retry = draft.retry_count, error = %e, "Refinement failed; keeping previous draft");
                            draft.refined(None);
                        }
                    }
                }
            }
            state = state.next(&draft);
        }

        if !draft.is_passing {
            warn!(
                retries = draft.retry_count,
                score = draft.score,
                "Returning best-effort draft that did not pass"
            );
        }

        Ok(RefinementOutcome {
            draft: draft.current_draft,
            passed: draft.is_passing,
            score: draft.score,
            attempts,
            feedback: draft.feedback,
        })
    }
}
