//! Data models for input articles and the processed report.
//!
//! - [`ArticleRecord`]: a scraped article as handed over by the scraper
//! - [`ProcessedArticle`]: an article after summarization and translation
//! - [`MarketWatchReport`]: one run's ordered collection of processed articles

use crate::error::PipelineError;
use crate::judge::EvaluationSummary;
use crate::refine::RefinementOutcome;
use crate::resolver::Resolution;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, instrument};

/// A scraped article.
///
/// `id` is the stable key the final report is ordered by. `company` and
/// `ticker` are optional hints for identity resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleRecord {
    pub id: u64,
    pub url: String,
    pub title: String,
    #[serde(default, alias = "content")]
    pub text: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
}

impl ArticleRecord {
    /// `(name, ticker)` used for identity resolution.
    ///
    /// The title stands in for the name only when there is neither a company
    /// hint nor a ticker, since a ticker match is confirmed against the name.
    pub fn identity_query(&self) -> (Option<&str>, Option<&str>) {
        let ticker = self.ticker.as_deref();
        let name = match (&self.company, ticker) {
            (Some(c), _) => Some(c.as_str()),
            (None, None) => Some(self.title.as_str()),
            (None, Some(_)) => None,
        };
        (name, ticker)
    }

    /// Load a JSON array of articles.
    #[instrument(level = "info", skip_all, fields(%path))]
    pub async fn load_all(path: &str) -> Result<Vec<ArticleRecord>, PipelineError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|source| PipelineError::Io {
                path: path.to_string(),
                source,
            })?;
        let articles: Vec<ArticleRecord> = serde_json::from_str(&text)?;
        info!(count = articles.len(), "Loaded articles");
        Ok(articles)
    }
}

/// Quality verdict of one refinement loop, as shown in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub passed: bool,
    pub score: f64,
    pub attempts: u32,
}

impl From<&RefinementOutcome> for QualityVerdict {
    fn from(o: &RefinementOutcome) -> Self {
        Self {
            passed: o.passed,
            score: o.score,
            attempts: o.attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Complete,
    /// Summary generation failed; the summary is a placeholder.
    Placeholder,
}

/// An article after it went through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedArticle {
    pub id: u64,
    pub url: String,
    pub title: String,
    /// Registry match, when the identity gate ran.
    pub company: Option<Resolution>,
    pub status: ArticleStatus,
    pub summary: String,
    pub summary_quality: Option<QualityVerdict>,
    pub title_translated: Option<String>,
    pub summary_translated: Option<String>,
    pub translation_quality: Option<QualityVerdict>,
    /// Result of a later `rejudge` pass, if any.
    #[serde(default)]
    pub recovered_evaluation: Option<EvaluationSummary>,
    /// The source text the summary was produced from.
    pub content: String,
}

impl ProcessedArticle {
    /// Extract the domain name (before .com/.org/etc) from the article URL.
    /// For example: "https://theedgemalaysia.com/node/1" -> "theedgemalaysia"
    pub fn source_tag(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.url).ok()?;
        let host = parsed.host_str()?;
        let parts: Vec<&str> = host.split('.').collect();
        if parts.len() >= 2 {
            Some(parts[parts.len() - 2].to_string())
        } else {
            None
        }
    }
}

/// One run's output, ordered by article id.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketWatchReport {
    /// The date of generation in `YYYY-MM-DD` format.
    pub local_date: String,
    /// The local time of generation.
    pub local_time: String,
    pub articles: Vec<ProcessedArticle>,
}
