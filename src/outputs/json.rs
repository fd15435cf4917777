//! JSON report output.
//!
//! Reports are grouped by date:
//! ```text
//! json_output_dir/
//! └── 2025-10-06/
//!     └── market_watch.json
//! ```

use crate::error::PipelineError;
use crate::models::MarketWatchReport;
use tokio::fs;
use tracing::{error, info, instrument};

pub const REPORT_FILENAME: &str = "market_watch.json";

/// Write a [`MarketWatchReport`] to `{json_output_dir}/{date}/market_watch.json`.
///
/// Creates the date directory when missing and returns the written path.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_report(
    report: &MarketWatchReport,
    json_output_dir: &str,
) -> Result<String, PipelineError> {
    let json = serde_json::to_string_pretty(report)?;

    let full_json_dir = format!("{}/{}", json_output_dir, report.local_date);
    info!(%full_json_dir, "Ensuring JSON directory exists");
    if let Err(source) = fs::create_dir_all(&full_json_dir).await {
        error!(%full_json_dir, error = %source, "Failed to create JSON dir");
        return Err(PipelineError::Io {
            path: full_json_dir,
            source,
        });
    }

    let output_json_filename = format!("{}/{}", full_json_dir, REPORT_FILENAME);
    info!(path = %output_json_filename, "Writing JSON");
    overwrite(&output_json_filename, json).await?;
    info!(path = %output_json_filename, articles = report.articles.len(), "Wrote JSON report");

    Ok(output_json_filename)
}

/// Read a report previously written by [`write_report`].
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn load_report(path: &str) -> Result<MarketWatchReport, PipelineError> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|source| PipelineError::Io {
            path: path.to_string(),
            source,
        })?;
    let report: MarketWatchReport = serde_json::from_str(&text)?;
    info!(articles = report.articles.len(), date = %report.local_date, "Loaded report");
    Ok(report)
}

/// Replace the report at `path` in place.
pub async fn rewrite_report(report: &MarketWatchReport, path: &str) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(report)?;
    overwrite(path, json).await?;
    info!(%path, "Rewrote JSON report");
    Ok(())
}

async fn overwrite(path: &str, contents: String) -> Result<(), PipelineError> {
    fs::write(path, contents)
        .await
        .map_err(|source| PipelineError::Io {
            path: path.to_string(),
            source,
        })
}
