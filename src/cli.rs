//! Command-line interface definitions for Market Watch.
//!
//! Pipeline settings come from an optional YAML file; the flags below
//! override individual values. Several options can also be provided via
//! environment variables.

use crate::config::PipelineConfig;
use crate::judge::TaskProfile;
use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the Market Watch application.
///
/// # Examples
///
/// ```sh
/// # Summarize, translate, and judge one day's articles
/// market_watch run --articles ./articles.json --registry ./companies.jsonl \
///     --terminology ./glossary.csv -j ./json -m ./markdown
///
/// # Re-evaluate the summaries of an existing report
/// market_watch rejudge --report ./json/2025-10-06/market_watch.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to the awful_aj config.yaml file
    #[arg(short, long, global = true, env = "MARKET_WATCH_LLM_CONFIG")]
    pub config: Option<String>,

    /// Optional path to the pipeline settings YAML file
    #[arg(short, long, global = true, env = "MARKET_WATCH_SETTINGS")]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize, translate, and judge a batch of articles
    Run(RunArgs),
    /// Re-evaluate the summaries of an existing JSON report
    Rejudge(RejudgeArgs),
    /// Resolve a company name or ticker against the registry
    Resolve(ResolveArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON array of scraped articles
    #[arg(short, long)]
    pub articles: String,

    /// JSONL registry of listed companies; without it every article is admitted
    #[arg(short, long, env = "MARKET_WATCH_REGISTRY")]
    pub registry: Option<String>,

    /// Two-column terminology CSV used during translation
    #[arg(short, long, env = "MARKET_WATCH_TERMINOLOGY")]
    pub terminology: Option<String>,

    /// Output directory for the JSON report
    #[arg(short, long)]
    pub json_output_dir: String,

    /// Output directory for the Markdown report
    #[arg(short, long)]
    pub markdown_output_dir: String,

    /// Minimum score every metric must reach
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Refinements after the initial draft
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Articles processed at the same time
    #[arg(short = 'p', long)]
    pub concurrency: Option<usize>,

    /// Language to translate summaries into
    #[arg(long, env = "MARKET_WATCH_TARGET_LANGUAGE")]
    pub target_language: Option<String>,

    /// Skip translation entirely
    #[arg(long, conflicts_with = "target_language")]
    pub no_translate: bool,
}

impl RunArgs {
    /// Apply flag overrides on top of file settings.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(t) = self.threshold {
            config.threshold = t;
        }
        if let Some(r) = self.max_retries {
            config.max_retries = r;
        }
        if let Some(c) = self.concurrency {
            config.concurrency = c;
        }
        if let Some(lang) = &self.target_language {
            config.target_language = Some(lang.clone());
        }
        if self.no_translate {
            config.target_language = None;
        }
    }
}

#[derive(Args, Debug)]
pub struct RejudgeArgs {
    /// Path to a market_watch.json report; it is updated in place
    #[arg(short, long)]
    pub report: String,

    /// Minimum score every metric must reach
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Metric set to re-evaluate with
    #[arg(long, value_enum, default_value_t = TaskProfile::RecoverySummarization)]
    pub profile: TaskProfile,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// JSONL registry of listed companies
    #[arg(short, long, env = "MARKET_WATCH_REGISTRY")]
    pub registry: String,

    /// Company name, alias, or ticker such as `KL:LIONIND`
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(cli: Cli) -> RunArgs {
        match cli.command {
            Command::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "market_watch",
            "run",
            "--articles",
            "./articles.json",
            "--json-output-dir",
            "./json",
            "--markdown-output-dir",
            "./markdown",
        ]);

        let args = run_args(cli);
        assert_eq!(args.articles, "./articles.json");
        assert_eq!(args.json_output_dir, "./json");
        assert_eq!(args.markdown_output_dir, "./markdown");
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "market_watch",
            "run",
            "-a",
            "a.json",
            "-j",
            "/tmp/json",
            "-m",
            "/tmp/markdown",
            "-p",
            "4",
            "-s",
            "settings.yaml",
        ]);

        assert_eq!(cli.settings.as_deref(), Some("settings.yaml"));
        let args = run_args(cli);
        assert_eq!(args.json_output_dir, "/tmp/json");
        assert_eq!(args.markdown_output_dir, "/tmp/markdown");
        assert_eq!(args.concurrency, Some(4));
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::parse_from([
            "market_watch",
            "run",
            "-a",
            "a.json",
            "-j",
            "j",
            "-m",
            "m",
            "--threshold",
            "0.7",
            "--no-translate",
        ]);
        let mut config = PipelineConfig::default();
        run_args(cli).apply(&mut config);
        assert_eq!(config.threshold, 0.7);
        assert_eq!(config.target_language, None);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_rejudge_subcommand() {
        let cli = Cli::parse_from(["market_watch", "rejudge", "--report", "r.json"]);
        match cli.command {
            Command::Rejudge(args) => {
                assert_eq!(args.report, "r.json");
                assert_eq!(args.profile, TaskProfile::RecoverySummarization);
            }
            other => panic!("expected rejudge, got {other:?}"),
        }
    }

    #[test]
    fn test_rejudge_profile_flag() {
        let cli = Cli::parse_from([
            "market_watch",
            "rejudge",
            "-r",
            "r.json",
            "--profile",
            "summarization",
        ]);
        match cli.command {
            Command::Rejudge(args) => assert_eq!(args.profile, TaskProfile::Summarization),
            other => panic!("expected rejudge, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_subcommand() {
        let cli = Cli::parse_from(["market_watch", "resolve", "-r", "companies.jsonl", "KL:LIONIND"]);
        match cli.command {
            Command::Resolve(args) => {
                assert_eq!(args.registry, "companies.jsonl");
                assert_eq!(args.query, "KL:LIONIND");
            }
            other => panic!("expected resolve, got {other:?}"),
        }
    }
}
