//! Display snippets: the first line of a file matching a term.

use std::fs;
use std::path::Path;

/// Maximum snippet length in characters before truncation.
const MAX_SNIPPET_CHARS: usize = 200;

/// Source of display snippets for search results.
pub trait Snippets {
    /// Return the first line of `path` containing `term`
    /// (case-insensitive), trimmed, with its 1-based line number.
    /// `None` when the file cannot be read or nothing matches.
    fn first_matching_line(&self, path: &str, term: &str) -> Option<(String, u32)>;
}

/// File-backed snippet source used by the CLI.
#[derive(Debug, Default)]
pub struct FileSnippets;

impl Snippets for FileSnippets {
    fn first_matching_line(&self, path: &str, term: &str) -> Option<(String, u32)> {
        let bytes = fs::read(Path::new(path)).ok()?;
        let content = String::from_utf8_lossy(&bytes);
        let term_lower = term.to_lowercase();

        for (idx, line) in content.lines().enumerate() {
            if line.to_lowercase().contains(&term_lower) {
                return Some((clip(line), idx as u32 + 1));
            }
        }
        None
    }
}

fn clip(line: &str) -> String {
    let clipped = if line.chars().count() > MAX_SNIPPET_CHARS {
        let head: String = line.chars().take(MAX_SNIPPET_CHARS).collect();
        format!("{head}...")
    } else {
        line.to_string()
    };
    clipped.trim().to_string()
}
