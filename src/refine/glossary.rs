//! Terminology scanning through a bounded tool-call conversation.
//!
//! The writer model is shown the source text and asked which terms need an
//! official localization. Each turn it either requests lookups
//! (`{"lookup": ["term", ...]}`), which are answered from the
//! [`TermLookup`] table and appended to the conversation, or gives a final
//! answer, which ends the cycle. The successful lookups are the result.

use crate::api::AskAsync;
use crate::prompt::CostarPrompt;
use crate::terminology::TermLookup;
use crate::utils::{extract_json_object, truncate_for_log};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;
use tracing::{debug, info, instrument, warn};

/// A source term and its mandatory localized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPair {
    pub source: String,
    pub target: String,
}

/// What the model asked for in one turn.
#[derive(Debug, PartialEq)]
enum Turn {
    Lookup(Vec<String>),
    Final,
}

fn parse_turn(reply: &str) -> Turn {
    let Some(obj) = extract_json_object(reply) else {
        return Turn::Final;
    };
    let terms: Vec<String> = match obj.get("lookup") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    let terms: Vec<String> = terms
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if terms.is_empty() {
        Turn::Final
    } else {
        Turn::Lookup(terms)
    }
}

pub struct GlossaryScanner<'a, G> {
    writer: &'a G,
    table: &'a dyn TermLookup,
    target_lang: String,
    max_turns: usize,
}

impl<'a, G> GlossaryScanner<'a, G>
where
    G: AskAsync<Response = String>,
{
    pub fn new(writer: &'a G, table: &'a dyn TermLookup, target_lang: &str, max_turns: usize) -> Self {
        Self {
            writer,
            table,
            target_lang: target_lang.to_string(),
            max_turns,
        }
    }

    fn prompt(&self, source: &str, transcript: &str) -> String {
        let mut p = CostarPrompt::new()
            .context(format!(
                "You are a financial terminology assistant preparing a {} translation. \
You can consult the official terminology database.",
                self.target_lang
            ))
            .objective(
                "Identify institution names, acronyms, and financial jargon in the source text \
whose official localization should be checked. To consult the database, reply with \
{\"lookup\": [\"term\", ...]}. When no further lookups are needed, reply with {\"done\": true}.",
            )
            .response("Reply with a single JSON object and nothing else.")
            .section("SOURCE TEXT", source);
        if !transcript.is_empty() {
            p = p.section("TOOL RESULTS SO FAR", transcript);
        }
        p.to_string()
    }

    /// Run the lookup conversation and return the confirmed terminology.
    ///
    /// Stops at the first final answer, at the first failed model call, or
    /// after `max_turns` turns; whatever was looked up by then is kept.
    #[instrument(level = "info", skip_all, fields(max_turns = self.max_turns))]
    pub async fn scan(&self, source: &str) -> Vec<TermPair> {
        let mut found: Vec<TermPair> = Vec::new();
        let mut transcript = String::new();

        for turn in 0..self.max_turns {
            let reply = match self.writer.ask(&self.prompt(source, &transcript)).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(turn, error = %e, "Terminology turn failed; keeping lookups so far");
                    break;
                }
            };

            match parse_turn(&reply) {
                Turn::Final => {
                    debug!(turn, reply = %truncate_for_log(&reply, 200), "Terminology scan finished");
                    break;
                }
                Turn::Lookup(terms) => {
                    for term in terms {
                        let hit = self.table.lookup(&term);
                        let _ = writeln!(
                            transcript,
                            "lookup(\"{}\") => {}",
                            term,
                            hit.as_deref().unwrap_or("not found")
                        );
                        if let Some(target) = hit {
                            found.push(TermPair {
                                source: term,
                                target,
                            });
                        }
                    }
                    if turn + 1 == self.max_turns {
                        warn!(turns = self.max_turns, "Terminology scan hit the turn limit");
                    }
                }
            }
        }

        let found: Vec<TermPair> = found
            .into_iter()
            .unique_by(|p| p.source.to_lowercase())
            .collect();
        info!(count = found.len(), "Mandatory terminology collected");
        found
    }
}

/// Render terminology as `source => target` lines.
pub fn render_terms(terms: &[TermPair]) -> String {
    terms
        .iter()
        .map(|t| format!("- {} => {}", t.source, t.target))
        .join("\n")
}
