//! Source-to-target terminology reference.
//!
//! Loaded from a two-column CSV with a header row, e.g.
//!
//! ```text
//! en-MY,zh-MY
//! Bank Negara Malaysia (BNM),国家银行
//! "Khazanah Nasional Bhd",国库控股
//! ```

use crate::error::PipelineError;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Term to localized-term lookup capability.
pub trait TermLookup {
    fn lookup(&self, term: &str) -> Option<String>;
}

#[derive(Debug, Default, Clone)]
pub struct TerminologyTable {
    /// `(lowercased source, target)` in file order.
    rows: Vec<(String, String)>,
}

impl TerminologyTable {
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let rows = pairs
            .into_iter()
            .map(|(s, t)| (Into::<String>::into(s).trim().to_lowercase(), t.into()))
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Self { rows }
    }

    /// Parse CSV text. The first line is a header and is skipped.
    pub fn from_csv(text: &str) -> Self {
        let mut pairs = Vec::new();
        for (lineno, line) in text.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_csv_line(line);
            match (fields.first(), fields.get(1)) {
                (Some(s), Some(t)) if !t.trim().is_empty() => {
                    pairs.push((s.clone(), t.trim().to_string()))
                }
                _ => warn!(line = lineno + 1, "Skipping terminology row without two columns"),
            }
        }
        Self::from_pairs(pairs)
    }

    #[instrument(level = "info", skip_all, fields(%path))]
    pub async fn load(path: &str) -> Result<Self, PipelineError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|source| PipelineError::Io {
                path: path.to_string(),
                source,
            })?;
        let table = Self::from_csv(&text);
        info!(count = table.len(), "Loaded terminology table");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TermLookup for TerminologyTable {
    /// Exact match, then an acronym in parentheses, then containment either way.
    fn lookup(&self, term: &str) -> Option<String> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return None;
        }
        let acronym = format!("({term})");

        self.rows
            .iter()
            .find(|(key, _)| *key == term)
            .or_else(|| self.rows.iter().find(|(key, _)| key.contains(&acronym)))
            .or_else(|| {
                self.rows
                    .iter()
                    .find(|(key, _)| key.contains(&term) || term.contains(key.as_str()))
            })
            .map(|(_, target)| target.clone())
    }
}

/// Split one CSV line, honouring double-quoted fields and `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            ('"', _) => quoted = !quoted,
            (',', false) => fields.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    fields.push(cur);
    fields
}
