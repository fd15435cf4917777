//! # Market Watch
//!
//! Summarizes, translates, and quality-judges financial news about companies
//! listed on Bursa Malaysia. Every draft goes through a self-correcting loop:
//! an LLM writes it, a panel of LLM-judged metrics scores it, and failing
//! drafts are rewritten from the judges' feedback until they pass or the
//! retry budget runs out.
//!
//! ## Usage
//!
//! ```sh
//! market_watch run --articles ./articles.json --registry ./companies.jsonl \
//!     --terminology ./glossary.csv -j ./json -m ./markdown
//! market_watch rejudge --report ./json/2025-10-06/market_watch.json
//! market_watch resolve --registry ./companies.jsonl KL:LIONIND
//! ```
//!
//! ## Architecture
//!
//! 1. **Admission**: drop articles with too little text or without a listed company
//! 2. **Summarization**: refinement loop per article (parallel, 12 at a time)
//! 3. **Translation**: refinement loop over title and summary, with mandatory terminology
//! 4. **Output**: JSON report and Markdown edition

use awful_aj::config::{load_config, AwfulJadeConfig};
use awful_aj::{config_dir, template};
use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod api;
mod cli;
mod config;
mod coordinator;
mod error;
mod judge;
mod models;
mod outputs;
mod prompt;
mod refine;
mod resolver;
mod terminology;
mod utils;

#[cfg(test)]
mod test_support;

use api::build_client;
use cli::{Cli, Command, RejudgeArgs, ResolveArgs, RunArgs};
use config::PipelineConfig;
use coordinator::Coordinator;
use judge::{Judge, LlmJudge, TaskProfile};
use models::{ArticleRecord, MarketWatchReport};
use outputs::{json, markdown};
use refine::{DraftTask, GlossaryScanner, RefinementLoop};
use resolver::CompanyRegistry;
use terminology::TerminologyTable;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("market_watch starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut settings = match &args.settings {
        Some(path) => PipelineConfig::load(path).await?,
        None => PipelineConfig::default(),
    };

    match &args.command {
        Command::Run(run_args) => {
            run_args.apply(&mut settings);
            run(args.config.as_deref(), &settings, run_args).await?;
        }
        Command::Rejudge(rejudge_args) => {
            if let Some(t) = rejudge_args.threshold {
                settings.threshold = t;
            }
            rejudge(args.config.as_deref(), &settings, rejudge_args).await?;
        }
        Command::Resolve(resolve_args) => resolve(resolve_args).await?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Load the `awful_aj` configuration from `path` or the default config dir.
fn load_llm_config(path: Option<&str>) -> Result<AwfulJadeConfig, Box<dyn Error>> {
    let config_path = match path {
        Some(p) => p.to_string(),
        None => config_dir()?
            .join("config.yaml")
            .to_str()
            .ok_or("Not a valid config filename")?
            .to_string(),
    };
    let config = load_config(&config_path)?;
    info!(%config_path, "Loaded configuration");
    Ok(config)
}

#[instrument(level = "info", skip_all, fields(articles = %args.articles))]
async fn run(
    llm_config_path: Option<&str>,
    settings: &PipelineConfig,
    args: &RunArgs,
) -> Result<(), Box<dyn Error>> {
    // Early check: ensure output dirs are writable
    for dir in [&args.json_output_dir, &args.markdown_output_dir] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Output directory is not writable (fix perms or choose a different path)");
            return Err(e);
        }
    }

    let articles = ArticleRecord::load_all(&args.articles).await?;
    if articles.is_empty() {
        warn!(path = %args.articles, "No articles to process; nothing to do");
        return Ok(());
    }

    let registry = match &args.registry {
        Some(path) => Some(CompanyRegistry::load(path).await),
        None => None,
    };
    if registry.as_ref().is_some_and(CompanyRegistry::is_empty) {
        warn!("Company registry is empty; every article will be skipped");
    }
    let terminology = match (&args.terminology, &settings.target_language) {
        (Some(path), Some(_)) => Some(TerminologyTable::load(path).await?),
        _ => None,
    };
    if terminology.as_ref().is_some_and(TerminologyTable::is_empty) {
        warn!("Terminology table is empty; translations get no mandatory terminology");
    }

    // ---- Load templates & config ----
    let llm_config = load_llm_config(llm_config_path)?;
    let writer_template = template::load_template(&settings.writer_template).await?;
    info!(template = %settings.writer_template, "Loaded writer template");
    let judge_template = template::load_template(&settings.judge_template).await?;
    info!(template = %settings.judge_template, "Loaded judge template");

    let writer = build_client(
        &llm_config,
        &writer_template,
        settings.llm_max_retries,
        settings.llm_timeout(),
    );
    let judge_client = build_client(
        &llm_config,
        &judge_template,
        settings.llm_max_retries,
        settings.llm_timeout(),
    );
    let scorer = LlmJudge::new(&judge_client);

    let summarizer = RefinementLoop::new(
        &writer,
        Judge::new(&scorer, TaskProfile::Summarization, settings.threshold),
        DraftTask::Summarize,
        settings.max_retries,
    );
    let mut coordinator = Coordinator::new(summarizer, settings.min_content_chars, settings.concurrency);

    if let Some(target_lang) = &settings.target_language {
        let task = DraftTask::Translate {
            source_lang: settings.source_language.clone(),
            target_lang: target_lang.clone(),
        };
        let judge = Judge::new(&scorer, task.profile(), settings.threshold);
        let mut translator = RefinementLoop::new(&writer, judge, task, settings.max_retries);
        if let Some(table) = &terminology {
            translator = translator.with_glossary(GlossaryScanner::new(
                &writer,
                table,
                target_lang,
                settings.max_tool_turns,
            ));
        }
        coordinator = coordinator.with_translator(translator);
        info!(%target_lang, glossary = terminology.is_some(), "Translation enabled");
    }
    if let Some(registry) = &registry {
        coordinator = coordinator.with_identity_gate(registry);
    }

    let now = Local::now();
    let mut report = MarketWatchReport {
        local_date: now.date_naive().to_string(),
        local_time: now.time().format("%H:%M:%S").to_string(),
        articles: Vec::new(),
    };
    info!(local_date = %report.local_date, local_time = %report.local_time, "Report initialized");

    report.articles = coordinator.process(articles).await;

    // ---- Outputs ----
    if let Err(e) = json::write_report(&report, &args.json_output_dir).await {
        error!(error = %e, "Failed to write final JSON");
    }

    let md = markdown::report_to_markdown(&report);
    let output_markdown_filename = format!(
        "{}/{}_market_watch.md",
        args.markdown_output_dir, report.local_date
    );
    info!(path = %output_markdown_filename, "Writing Markdown");
    if let Err(e) = tokio::fs::write(&output_markdown_filename, md).await {
        error!(path = %output_markdown_filename, error = %e, "Failed writing Markdown");
    } else {
        info!(path = %output_markdown_filename, "Wrote report Markdown");
    }

    Ok(())
}

#[instrument(level = "info", skip_all, fields(report = %args.report, profile = ?args.profile))]
async fn rejudge(
    llm_config_path: Option<&str>,
    settings: &PipelineConfig,
    args: &RejudgeArgs,
) -> Result<(), Box<dyn Error>> {
    let mut report = json::load_report(&args.report).await?;

    let llm_config = load_llm_config(llm_config_path)?;
    let judge_template = template::load_template(&settings.judge_template).await?;
    let judge_client = build_client(
        &llm_config,
        &judge_template,
        settings.llm_max_retries,
        settings.llm_timeout(),
    );
    let scorer = LlmJudge::new(&judge_client);
    let judge = Judge::new(&scorer, args.profile, settings.threshold);

    let evaluated = coordinator::rejudge(&judge, &mut report, settings.concurrency).await;
    json::rewrite_report(&report, &args.report).await?;
    info!(evaluated, "Recovery evaluation written back to report");
    Ok(())
}

async fn resolve(args: &ResolveArgs) -> Result<(), Box<dyn Error>> {
    let registry = CompanyRegistry::load(&args.registry).await;
    let resolution = registry.lookup(&args.query);
    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}
