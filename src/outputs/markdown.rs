//! Markdown rendering of a [`MarketWatchReport`].

use crate::models::{ArticleStatus, MarketWatchReport, ProcessedArticle, QualityVerdict};
use crate::resolver::Resolution;
use std::fmt::Write;

fn verdict(label: &str, q: &QualityVerdict) -> String {
    format!(
        "{label}: {} (score {:.2}, {} attempt{})",
        if q.passed { "passed" } else { "below threshold" },
        q.score,
        q.attempts,
        if q.attempts == 1 { "" } else { "s" }
    )
}

fn article_to_markdown(md: &mut String, a: &ProcessedArticle) {
    let _ = writeln!(md, "## {}\n", a.title);
    if let Some(t) = &a.title_translated {
        let _ = writeln!(md, "### {}\n", t);
    }

    if let Some(Resolution::Matched {
        official_name,
        stock_code,
    }) = &a.company
    {
        let _ = writeln!(md, "**Company:** {} ({})\n", official_name, stock_code);
    }

    if a.status == ArticleStatus::Placeholder {
        let _ = writeln!(md, "> {}\n", a.summary);
    } else {
        let _ = writeln!(md, "{}\n", a.summary);
    }
    if let Some(t) = &a.summary_translated {
        let _ = writeln!(md, "{}\n", t);
    }

    let verdicts: Vec<String> = [
        a.summary_quality.as_ref().map(|q| verdict("Summary", q)),
        a.translation_quality.as_ref().map(|q| verdict("Translation", q)),
        a.recovered_evaluation.as_ref().map(|e| {
            format!(
                "Re-evaluation: {} (score {:.2})",
                if e.overall_pass { "passed" } else { "below threshold" },
                e.average_score
            )
        }),
    ]
    .into_iter()
    .flatten()
    .collect();
    for v in verdicts {
        let _ = writeln!(md, "- {}", v);
    }

    let source = a.source_tag().unwrap_or_else(|| "source".to_string());
    let _ = writeln!(md, "\n[{}]({})\n", source, a.url);
}

/// Render the whole report, one section per article in report order.
pub fn report_to_markdown(report: &MarketWatchReport) -> String {
    let mut md = String::new();
    let _ = writeln!(
        md,
        "# Market Watch for {} at {}\n",
        report.local_date, report.local_time
    );
    if report.articles.is_empty() {
        let _ = writeln!(md, "_No articles qualified for this edition._");
    }
    for a in &report.articles {
        article_to_markdown(&mut md, a);
    }
    md
}
