//! Utility functions for string handling, LLM reply parsing, and file system checks.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("json object pattern is valid"));

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last character boundary at or before `max`
/// bytes, with an ellipsis and the dropped byte count appended.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Parse the outermost `{ ... }` block of an LLM reply.
///
/// Models often wrap JSON in prose or code fences; everything outside the
/// first `{` and the last `}` is ignored.
pub fn extract_json_object(reply: &str) -> Option<serde_json::Value> {
    let m = JSON_OBJECT.find(reply)?;
    serde_json::from_str(m.as_str()).ok()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        // each of these is 3 bytes; byte 4 is inside the second char
        let s = "马来西亚股市";
        let result = truncate_for_log(s, 4);
        assert!(result.starts_with("马…"));
        assert!(result.contains("(+15 bytes)"));
    }

    #[test]
    fn test_extract_json_object_from_prose() {
        let reply = "Sure! Here is my verdict:\n```json\n{\"score\": 7, \"reason\": \"ok\"}\n```";
        let v = extract_json_object(reply).unwrap();
        assert_eq!(v["score"], 7);
        assert_eq!(v["reason"], "ok");
    }

    #[test]
    fn test_extract_json_object_missing() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{broken").is_none());
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        ensure_writable_dir(nested.to_str().unwrap()).await.unwrap();
        assert!(nested.is_dir());
    }
}
