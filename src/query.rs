//! Query string parsing.
//!
//! Grammar: whitespace-separated tokens, `"..."` for phrases,
//! `level:` and `ext:` prefixes for filters. Terms and phrases are
//! implicitly ANDed by the evaluator.

/// A parsed query: search terms, phrases, and filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    /// Single search terms, lowercased, in query order.
    pub terms: Vec<String>,
    /// Phrases, each a non-empty list of lowercased words.
    pub phrases: Vec<Vec<String>>,
    /// Uppercased level filter ("" when unset). The evaluator acts
    /// on ERROR and WARN only.
    pub level_filter: String,
    /// Lowercased extension filter, e.g. ".go" ("" when unset).
    pub ext_filter: String,
}

impl ParsedQuery {
    /// Number of requirements a document must satisfy (AND logic).
    pub fn total_requirements(&self) -> usize {
        self.terms.len() + self.phrases.len()
    }

    /// True when there is nothing to match.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.phrases.is_empty()
    }
}

/// Parse a raw query string.
pub fn parse(input: &str) -> ParsedQuery {
    let mut query = ParsedQuery::default();
    let mut buffer = String::new();
    let mut in_quote = false;

    for c in input.chars() {
        if c == '"' {
            if in_quote {
                let words: Vec<String> = buffer
                    .to_lowercase()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                if !words.is_empty() {
                    query.phrases.push(words);
                }
                buffer.clear();
                in_quote = false;
            } else {
                flush_token(&mut buffer, &mut query);
                in_quote = true;
            }
        } else if c.is_whitespace() && !in_quote {
            flush_token(&mut buffer, &mut query);
        } else {
            buffer.push(c);
        }
    }
    flush_token(&mut buffer, &mut query);

    query
}

/// Classify a pending token as a filter or a term. Later filter
/// tokens overwrite earlier ones.
fn flush_token(buffer: &mut String, query: &mut ParsedQuery) {
    if buffer.is_empty() {
        return;
    }
    let token = std::mem::take(buffer);

    if let Some(level) = token.strip_prefix("level:") {
        query.level_filter = level.to_uppercase();
    } else if let Some(ext) = token.strip_prefix("ext:") {
        query.ext_filter = ext.to_lowercase();
    } else {
        query.terms.push(token.to_lowercase());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_terms() {
        let q = parse("Alpha beta  GAMMA");
        assert_eq!(q.terms, vec!["alpha", "beta", "gamma"]);
        assert!(q.phrases.is_empty());
        assert_eq!(q.total_requirements(), 3);
    }

    #[test]
    fn test_phrase() {
        let q = parse("\"Hello World\"");
        assert!(q.terms.is_empty());
        assert_eq!(q.phrases, vec![vec!["hello", "world"]]);
    }

    #[test]
    fn test_phrase_and_terms_mixed() {
        let q = parse("timeout \"connection refused\" retry");
        assert_eq!(q.terms, vec!["timeout", "retry"]);
        assert_eq!(q.phrases, vec![vec!["connection", "refused"]]);
        assert_eq!(q.total_requirements(), 3);
    }

    #[test]
    fn test_quote_flushes_pending_token() {
        let q = parse("abc\"def ghi\"");
        assert_eq!(q.terms, vec!["abc"]);
        assert_eq!(q.phrases, vec![vec!["def", "ghi"]]);
    }

    #[test]
    fn test_empty_phrase_discarded() {
        let q = parse("term \"\" \"   \"");
        assert_eq!(q.terms, vec!["term"]);
        assert!(q.phrases.is_empty());
    }

    #[test]
    fn test_unterminated_phrase_kept_as_pending() {
        // The trailing flush treats the open phrase body as a term.
        let q = parse("\"dangling");
        assert_eq!(q.terms, vec!["dangling"]);
        assert!(q.phrases.is_empty());
    }

    #[test]
    fn test_level_filter_uppercased() {
        let q = parse("timeout level:error");
        assert_eq!(q.terms, vec!["timeout"]);
        assert_eq!(q.level_filter, "ERROR");
    }

    #[test]
    fn test_ext_filter_lowercased() {
        let q = parse("parse ext:.GO");
        assert_eq!(q.ext_filter, ".go");
    }

    #[test]
    fn test_last_filter_wins() {
        let q = parse("level:WARN x level:ERROR ext:.py ext:.rs");
        assert_eq!(q.level_filter, "ERROR");
        assert_eq!(q.ext_filter, ".rs");
    }

    #[test]
    fn test_filters_only_query_is_empty() {
        let q = parse("level:ERROR ext:.log");
        assert!(q.is_empty());
        assert_eq!(q.total_requirements(), 0);
    }

    #[test]
    fn test_empty_input() {
        let q = parse("");
        assert!(q.is_empty());
    }
}
