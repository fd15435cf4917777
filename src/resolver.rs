//! Company identity resolution against the listed-company registry.
//!
//! The registry is a JSON-lines file, one [`CompanyRecord`] per line. It is
//! loaded once at startup and read-only afterwards, so a single
//! [`CompanyRegistry`] is shared by reference between concurrent workers.
//!
//! # Matching
//!
//! Every string is reduced to a comparison key by [`normalize`]. A query is
//! then tried, in order:
//!
//! 1. ticker exact match (confirmed only if no name was given or the name
//!    fuzzy-matches the candidate)
//! 2. name exact match
//! 3. name fuzzy match, first registry entry wins
//!
//! Anything else is [`Resolution::NotListed`].

use crate::error::RegistryError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Strings at or below this length never take part in fuzzy matching.
const MIN_FUZZY_LEN: usize = 3;

static EXCHANGE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^kl(?:\s*:|\s)\s*").expect("exchange prefix pattern is valid")
});

/// A listed company as loaded from the registry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CompanyRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub stock_code: String,
    pub company_long: String,
    pub company_short: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn string_or_number<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "stock_code must be a string or number, got {other}"
        ))),
    }
}

/// Outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Matched {
        official_name: String,
        stock_code: String,
    },
    NotListed,
}

impl Resolution {
    pub fn is_listed(&self) -> bool {
        matches!(self, Resolution::Matched { .. })
    }
}

/// Reduce a name or ticker to its comparison key.
///
/// Strips a leading `KL:` / `KL ` exchange token, drops everything that is
/// not an ASCII letter or digit, and lowercases. The prefix must be followed
/// by a colon or whitespace, so `KLCC` keeps its letters and the function is
/// idempotent.
pub fn normalize(text: &str) -> String {
    let trimmed = text.trim();
    let stripped = EXCHANGE_PREFIX.replace(trimmed, "");
    stripped
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn fuzzy_keys_match(a: &str, b: &str) -> bool {
    a.len() > MIN_FUZZY_LEN && b.len() > MIN_FUZZY_LEN && (a.contains(b) || b.contains(a))
}

/// The canonical, read-only set of listed companies.
#[derive(Debug, Default)]
pub struct CompanyRegistry {
    companies: Vec<CompanyRecord>,
    /// Normalized aliases per company, parallel to `companies`.
    alias_keys: Vec<Vec<String>>,
    /// Stock code, short name, and aliases to company index. Later rows win.
    keys: HashMap<String, usize>,
}

impl CompanyRegistry {
    pub fn new(companies: Vec<CompanyRecord>) -> Self {
        let mut keys = HashMap::new();
        let mut alias_keys = Vec::with_capacity(companies.len());

        for (idx, c) in companies.iter().enumerate() {
            for key in [normalize(&c.stock_code), normalize(&c.company_short)] {
                if !key.is_empty() {
                    keys.insert(key, idx);
                }
            }
            let aliases: Vec<String> = c.aliases.iter().map(|a| normalize(a)).collect();
            for key in &aliases {
                if !key.is_empty() {
                    keys.insert(key.clone(), idx);
                }
            }
            alias_keys.push(aliases);
        }

        Self {
            companies,
            alias_keys,
            keys,
        }
    }

    /// Parse JSON lines, skipping blank and malformed ones.
    pub fn from_jsonl(text: &str) -> Self {
        let mut companies = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CompanyRecord>(line) {
                Ok(c) => companies.push(c),
                Err(e) => warn!(line = lineno + 1, error = %e, "Skipping malformed registry line"),
            }
        }
        Self::new(companies)
    }

    /// Load the registry file.
    ///
    /// An unreadable file yields an empty registry, so every query resolves
    /// to [`Resolution::NotListed`].
    #[instrument(level = "info", skip_all, fields(%path))]
    pub async fn load(path: &str) -> Self {
        match Self::try_load(path).await {
            Ok(registry) => {
                info!(count = registry.len(), "Loaded company registry");
                registry
            }
            Err(e) => {
                warn!(error = %e, "Company registry unavailable; every lookup will be NotListed");
                Self::default()
            }
        }
    }

    async fn try_load(path: &str) -> Result<Self, RegistryError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|source| RegistryError::Read {
                path: path.to_string(),
                source,
            })?;
        Ok(Self::from_jsonl(&text))
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    fn name_fuzzy_matches(&self, idx: usize, name_key: &str) -> bool {
        self.alias_keys[idx]
            .iter()
            .any(|alias| fuzzy_keys_match(alias, name_key))
    }

    /// Resolve a scraped company name and/or ticker.
    pub fn resolve(&self, name: Option<&str>, ticker: Option<&str>) -> Resolution {
        // A supplied name that normalizes to nothing still has to confirm a ticker.
        let name_key = name.map(normalize);
        let ticker_key = ticker.map(normalize).filter(|k| !k.is_empty());

        let found = self
            .by_ticker(ticker_key.as_deref(), name_key.as_deref())
            .or_else(|| {
                let key = name_key.as_deref().filter(|k| !k.is_empty())?;
                self.keys.get(key).copied().or_else(|| self.by_fuzzy_name(key))
            });

        match found {
            Some(idx) => {
                let c = &self.companies[idx];
                debug!(stock_code = %c.stock_code, official = %c.company_long, "Resolved company");
                Resolution::Matched {
                    official_name: c.company_long.clone(),
                    stock_code: c.stock_code.clone(),
                }
            }
            None => {
                debug!(?name, ?ticker, "Company not listed");
                Resolution::NotListed
            }
        }
    }

    /// Resolve one free-form string used as both name and ticker.
    pub fn lookup(&self, query: &str) -> Resolution {
        self.resolve(Some(query), Some(query))
    }

    fn by_ticker(&self, ticker_key: Option<&str>, name_key: Option<&str>) -> Option<usize> {
        let idx = *self.keys.get(ticker_key?)?;
        match name_key {
            None => Some(idx),
            Some(name) if self.name_fuzzy_matches(idx, name) => Some(idx),
            Some(_) => None,
        }
    }

    fn by_fuzzy_name(&self, name_key: &str) -> Option<usize> {
        (0..self.companies.len()).find(|&idx| self.name_fuzzy_matches(idx, name_key))
    }
}
