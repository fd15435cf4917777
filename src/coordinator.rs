//! Fan-out over independent articles.
//!
//! Each admitted article runs the summarization loop and, when a translator
//! is configured and the summary was produced, the translation loop for its
//! title and summary. Articles are processed `concurrency` at a time in no
//! particular order; the collected results are re-sorted by article id.

use crate::api::AskAsync;
use crate::judge::{Judge, MetricScorer};
use crate::models::{ArticleRecord, ArticleStatus, MarketWatchReport, ProcessedArticle, QualityVerdict};
use crate::refine::RefinementLoop;
use crate::resolver::{CompanyRegistry, Resolution};
use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument, warn};

/// Summary text of an article whose summary could not be generated.
pub const SUMMARY_PLACEHOLDER: &str = "[Summarization Failed]";

pub struct Coordinator<'a, G, S> {
    summarizer: RefinementLoop<'a, G, S>,
    translator: Option<RefinementLoop<'a, G, S>>,
    registry: Option<&'a CompanyRegistry>,
    min_content_chars: usize,
    concurrency: usize,
}

impl<'a, G, S> Coordinator<'a, G, S>
where
    G: AskAsync<Response = String>,
    S: MetricScorer,
{
    pub fn new(summarizer: RefinementLoop<'a, G, S>, min_content_chars: usize, concurrency: usize) -> Self {
        Self {
            summarizer,
            translator: None,
            registry: None,
            min_content_chars,
            concurrency: concurrency.max(1),
        }
    }

    pub fn with_translator(mut self, translator: RefinementLoop<'a, G, S>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Only admit articles whose company resolves to a listed company.
    pub fn with_identity_gate(mut self, registry: &'a CompanyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Drop articles without enough content or without a listed company.
    fn admit(&self, articles: Vec<ArticleRecord>) -> Vec<(ArticleRecord, Option<Resolution>)> {
        articles
            .into_iter()
            .filter_map(|article| {
                let chars = article.text.trim().chars().count();
                if chars <= self.min_content_chars {
                    info!(id = article.id, chars, "Skipping article with insufficient content");
                    return None;
                }

                let Some(registry) = self.registry else {
                    return Some((article, None));
                };
                let (name, ticker) = article.identity_query();
                let resolution = registry.resolve(name, ticker);
                if !resolution.is_listed() {
                    info!(id = article.id, ?name, ?ticker, "Skipping article without a listed company");
                    return None;
                }
                Some((article, Some(resolution)))
            })
            .collect()
    }

    /// Process every qualifying article and return the results in id order.
    #[instrument(level = "info", skip_all, fields(total = articles.len(), concurrency = self.concurrency))]
    pub async fn process(&self, articles: Vec<ArticleRecord>) -> Vec<ProcessedArticle> {
        let admitted = self.admit(articles);
        info!(admitted = admitted.len(), "Starting parallel article processing");

        let mut results: Vec<ProcessedArticle> = stream::iter(admitted)
            .map(|(article, company)| self.process_one(article, company))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.sort_by_key(|a| a.id);

        let placeholders = results
            .iter()
            .filter(|a| a.status == ArticleStatus::Placeholder)
            .count();
        info!(
            processed = results.len(),
            placeholders, "Completed parallel article processing"
        );
        results
    }

    async fn process_one(&self, article: ArticleRecord, company: Option<Resolution>) -> ProcessedArticle {
        let mut out = ProcessedArticle {
            id: article.id,
            url: article.url,
            title: article.title,
            company,
            status: ArticleStatus::Complete,
            summary: String::new(),
            summary_quality: None,
            title_translated: None,
            summary_translated: None,
            translation_quality: None,
            recovered_evaluation: None,
            content: article.text,
        };

        match self.summarizer.run(&out.content).await {
            Ok(outcome) => {
                out.summary_quality = Some(QualityVerdict::from(&outcome));
                out.summary = outcome.draft;
            }
            Err(e) => {
                error!(id = out.id, error = %e, "Summary generation failed; using placeholder");
                out.status = ArticleStatus::Placeholder;
                out.summary = SUMMARY_PLACEHOLDER.to_string();
                return out;
            }
        }

        if let Some(translator) = &self.translator {
            let (title, summary) = futures::join!(translator.run(&out.title), translator.run(&out.summary));
            match title {
                Ok(t) => out.title_translated = Some(t.draft),
                Err(e) => warn!(id = out.id, error = %e, "Title translation failed"),
            }
            match summary {
                Ok(t) => {
                    out.translation_quality = Some(QualityVerdict::from(&t));
                    out.summary_translated = Some(t.draft);
                }
                Err(e) => warn!(id = out.id, error = %e, "Summary translation failed"),
            }
        }

        info!(id = out.id, "Successfully processed article");
        out
    }
}

/// Re-evaluate every produced summary of `report` and store the verdicts
/// as `recovered_evaluation`. Placeholder articles are left untouched.
///
/// Returns the number of articles evaluated.
#[instrument(level = "info", skip_all, fields(articles = report.articles.len(), concurrency = concurrency))]
pub async fn rejudge<S: MetricScorer>(
    judge: &Judge<'_, S>,
    report: &mut MarketWatchReport,
    concurrency: usize,
) -> usize {
    let verdicts: Vec<_> = stream::iter(
        report
            .articles
            .iter()
            .enumerate()
            .filter(|(_, a)| a.status == ArticleStatus::Complete),
    )
    .map(|(idx, a)| async move {
        let tag = format!("Reason Recovery: {}", a.title);
        (idx, judge.evaluate(&a.summary, &a.content, &tag).await)
    })
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

    let evaluated = verdicts.len();
    for (idx, summary) in verdicts {
        let article = &mut report.articles[idx];
        info!(id = article.id, score = summary.average_score, passed = summary.overall_pass, "Summary re-evaluated");
        article.recovered_evaluation = Some(summary);
    }
    evaluated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::judge::TaskProfile;
    use crate::refine::DraftTask;
    use crate::resolver::CompanyRecord;
    use crate::test_support::{flat_scorer, FnAsk};

    const BODY: &str = "The company reported a 12% rise in quarterly revenue to RM1.2bn on stronger steel demand.";

    fn article(id: u64, text: &str) -> ArticleRecord {
        ArticleRecord {
            id,
            url: format!("https://theedgemalaysia.com/node/{id}"),
            title: format!("Headline {id}"),
            text: text.to_string(),
            company: None,
            ticker: None,
        }
    }

    fn writer() -> FnAsk<impl Fn(&str) -> Result<String, LlmError>> {
        FnAsk(|prompt: &str| {
            if prompt.contains("ARTICLE THREE") {
                Err(LlmError::Provider("model crashed".into()))
            } else if prompt.contains("Translate") {
                Ok("译文".to_string())
            } else {
                Ok("Revenue rose 12% to RM1.2bn.".to_string())
            }
        })
    }

    #[tokio::test]
    async fn failing_article_becomes_placeholder_in_order() {
        let w = writer();
        let scorer = flat_scorer(0.9);
        let judge = Judge::new(&scorer, TaskProfile::Summarization, 0.8);
        let coordinator = Coordinator::new(RefinementLoop::new(&w, judge, DraftTask::Summarize, 3), 50, 5);

        let articles = (1..=5)
            .rev()
            .map(|id| {
                let text = if id == 3 { format!("ARTICLE THREE {BODY}") } else { BODY.to_string() };
                article(id, &text)
            })
            .collect();

        let out = coordinator.process(articles).await;
        assert_eq!(out.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(out[2].status, ArticleStatus::Placeholder);
        assert_eq!(out[2].summary, SUMMARY_PLACEHOLDER);
        assert!(out[2].summary_quality.is_none());
        assert_eq!(out[0].status, ArticleStatus::Complete);
        assert_eq!(out[0].summary, "Revenue rose 12% to RM1.2bn.");
        assert_eq!(out[0].summary_quality.as_ref().map(|q| q.attempts), Some(1));
    }

    #[tokio::test]
    async fn short_articles_are_filtered_before_fan_out() {
        let w = writer();
        let scorer = flat_scorer(0.9);
        let judge = Judge::new(&scorer, TaskProfile::Summarization, 0.8);
        let coordinator = Coordinator::new(RefinementLoop::new(&w, judge, DraftTask::Summarize, 3), 50, 4);

        let exactly_fifty = "x".repeat(50);
        let out = coordinator
            .process(vec![article(1, BODY), article(2, "too short"), article(3, &exactly_fifty)])
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 1);
    }

    #[tokio::test]
    async fn empty_input_gives_empty_output() {
        let w = writer();
        let scorer = flat_scorer(0.9);
        let judge = Judge::new(&scorer, TaskProfile::Summarization, 0.8);
        let coordinator = Coordinator::new(RefinementLoop::new(&w, judge, DraftTask::Summarize, 3), 50, 4);

        assert!(coordinator.process(Vec::new()).await.is_empty());
        assert_eq!(scorer.calls(), 0);
    }

    #[tokio::test]
    async fn identity_gate_excludes_unlisted_companies() {
        let registry = CompanyRegistry::new(vec![CompanyRecord {
            stock_code: "5168".into(),
            company_long: "Lion Industries Corporation Berhad".into(),
            company_short: "LIONIND".into(),
            aliases: vec!["Lion Industries".into()],
        }]);
        let w = writer();
        let scorer = flat_scorer(0.9);
        let judge = Judge::new(&scorer, TaskProfile::Summarization, 0.8);
        let coordinator = Coordinator::new(RefinementLoop::new(&w, judge, DraftTask::Summarize, 3), 50, 4)
            .with_identity_gate(&registry);

        let mut listed = article(1, BODY);
        listed.company = Some("Lion Industries Corp Bhd".into());
        listed.ticker = Some("KL:LIONIND".into());
        let mut unlisted = article(2, BODY);
        unlisted.company = Some("Acme Widgets Sdn Bhd".into());

        let out = coordinator.process(vec![listed, unlisted]).await;
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].company,
            Some(Resolution::Matched {
                official_name: "Lion Industries Corporation Berhad".into(),
                stock_code: "5168".into(),
            })
        );
    }

    #[tokio::test]
    async fn translator_fills_translated_fields() {
        let w = writer();
        let scorer = flat_scorer(0.9);
        let summary_judge = Judge::new(&scorer, TaskProfile::Summarization, 0.8);
        let task = DraftTask::Translate {
            source_lang: "English".into(),
            target_lang: "Simplified Chinese (Malaysia)".into(),
        };
        let translate_judge = Judge::new(&scorer, task.profile(), 0.8);
        let coordinator = Coordinator::new(RefinementLoop::new(&w, summary_judge, DraftTask::Summarize, 3), 50, 2)
            .with_translator(RefinementLoop::new(&w, translate_judge, task, 3));

        let out = coordinator
            .process(vec![article(1, BODY), article(3, &format!("ARTICLE THREE {BODY}"))])
            .await;
        assert_eq!(out[0].title_translated.as_deref(), Some("译文"));
        assert_eq!(out[0].summary_translated.as_deref(), Some("译文"));
        assert!(out[0].translation_quality.as_ref().is_some_and(|q| q.passed));

        // No summary, no translation.
        assert_eq!(out[1].status, ArticleStatus::Placeholder);
        assert!(out[1].title_translated.is_none());
        assert!(out[1].summary_translated.is_none());
    }

    #[tokio::test]
    async fn rejudge_skips_placeholders() {
        let w = writer();
        let scorer = flat_scorer(0.9);
        let judge = Judge::new(&scorer, TaskProfile::Summarization, 0.8);
        let coordinator = Coordinator::new(RefinementLoop::new(&w, judge, DraftTask::Summarize, 3), 50, 2);
        let articles = coordinator
            .process(vec![article(1, BODY), article(3, &format!("ARTICLE THREE {BODY}"))])
            .await;
        let mut report = MarketWatchReport {
            local_date: "2025-10-06".into(),
            local_time: "08:00:00".into(),
            articles,
        };

        let recovery = flat_scorer(0.5);
        let judge = Judge::new(&recovery, TaskProfile::RecoverySummarization, 0.8);
        assert_eq!(rejudge(&judge, &mut report, 4).await, 1);
        assert_eq!(recovery.calls(), TaskProfile::RecoverySummarization.metrics().len());

        let eval = report.articles[0].recovered_evaluation.as_ref().unwrap();
        assert!(!eval.overall_pass);
        assert_eq!(eval.metrics.len(), 2);
        assert_eq!(eval.context_tag, "Reason Recovery: Headline 1");
        assert!(report.articles[1].recovered_evaluation.is_none());
    }
}
