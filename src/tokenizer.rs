//! Tokenization of code and log files.
//!
//! Both modes work line by line and emit lowercased identifier
//! tokens with a document-wide position counter: the first content
//! token of a document is position 1, and every emitted token
//! increments the counter by one. Position 0 never appears here; it
//! is reserved for the synthetic filename tokens added by the
//! builder, so a filename hit can never complete a phrase chain.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{meta, DocType};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap());

static FUNC_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(func|def|function|class|struct)\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());

static FILENAME_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9_]+").unwrap());

/// An intermediate token before it is merged into the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    /// Lowercased term text.
    pub term: String,
    /// Document-wide token ordinal (first content token = 1).
    pub position: u32,
    /// Meta bitflags for this occurrence.
    pub meta: u8,
}

/// Tokenize a document's content.
///
/// Returns the token stream and, for logs, the minimum and maximum
/// parsed timestamps (epoch seconds, 0 if none). Code documents
/// always report (0, 0).
pub fn tokenize(content: &str, doc_type: DocType) -> (Vec<RawToken>, i64, i64) {
    match doc_type {
        DocType::Code => (tokenize_code(content), 0, 0),
        DocType::Log => tokenize_log(content),
    }
}

fn tokenize_code(content: &str) -> Vec<RawToken> {
    let mut tokens = Vec::new();
    let mut counter: u32 = 0;

    for line in content.lines() {
        // A definition name only counts on its own line.
        let func_name = FUNC_DEF
            .captures(line)
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str());

        for m in IDENTIFIER.find_iter(line) {
            counter += 1;
            let term = m.as_str();
            let token_meta = if func_name == Some(term) {
                meta::IN_FUNCTION_NAME
            } else {
                0
            };
            tokens.push(RawToken {
                term: term.to_lowercase(),
                position: counter,
                meta: token_meta,
            });
        }
    }
    tokens
}

fn tokenize_log(content: &str) -> (Vec<RawToken>, i64, i64) {
    let mut tokens = Vec::new();
    let mut counter: u32 = 0;
    let mut ts_min: i64 = 0;
    let mut ts_max: i64 = 0;

    for line in content.lines() {
        if let Some(ts) = parse_timestamp(line) {
            if ts_min == 0 || ts < ts_min {
                ts_min = ts;
            }
            if ts > ts_max {
                ts_max = ts;
            }
        }

        let upper = line.to_uppercase();
        let line_meta = if upper.contains("ERROR") {
            meta::LOG_LEVEL_ERROR
        } else if upper.contains("WARN") {
            meta::LOG_LEVEL_WARN
        } else {
            0
        };

        for m in IDENTIFIER.find_iter(line) {
            counter += 1;
            tokens.push(RawToken {
                term: m.as_str().to_lowercase(),
                position: counter,
                meta: line_meta,
            });
        }
    }
    (tokens, ts_min, ts_max)
}

/// Parse a leading `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`
/// timestamp from the first 19 bytes of a line.
fn parse_timestamp(line: &str) -> Option<i64> {
    let chunk = line.get(..19)?;
    let chunk = chunk.replacen(' ', "T", 1);
    NaiveDateTime::parse_from_str(&chunk, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

/// Extract lowercased filename terms from a base file name.
pub fn filename_terms(name: &str) -> Vec<String> {
    FILENAME_TOKEN
        .find_iter(name)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}
