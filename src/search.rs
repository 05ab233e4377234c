//! Query evaluation: term intersection, positional phrase
//! verification, TF-IDF-with-boost scoring, and top-K selection.

use std::collections::HashMap;

use crate::query::ParsedQuery;
use crate::reader::IndexReader;
use crate::snippet::Snippets;
use crate::types::{meta, DocId, Posting};
use crate::Result;

/// Maximum number of results returned by a search.
pub const MAX_RESULTS: usize = 10;

/// Score bonus for a term that appears in the file name.
const FILENAME_BOOST: f64 = 5.0;
/// Score bonus for a term matching a definition name.
const FUNCTION_NAME_BOOST: f64 = 3.0;
/// Multiplier applied to phrase-match scores.
const PHRASE_BOOST: f64 = 2.0;

/// One ranked search hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub path: String,
    /// Accumulated relevance score.
    pub score: f64,
    /// Sum of token-level occurrences that contributed to the score.
    pub total_hits: u32,
    /// First line containing the display term; empty when
    /// unavailable.
    pub snippet: String,
    /// 1-based line number of the snippet, 0 when unavailable.
    pub line_num: u32,
}

/// Per-candidate accumulator while a query is evaluated.
#[derive(Debug, Default, Clone, Copy)]
struct Candidate {
    score: f64,
    /// Distinct requirements satisfied; a doc survives only when
    /// this reaches the query's requirement count.
    match_count: usize,
    total_hits: u32,
}

/// Evaluates parsed queries against an open index.
pub struct Searcher<'a> {
    reader: &'a IndexReader,
    snippets: &'a dyn Snippets,
}

impl<'a> Searcher<'a> {
    pub fn new(reader: &'a IndexReader, snippets: &'a dyn Snippets) -> Self {
        Self { reader, snippets }
    }

    /// Run one query and return at most [`MAX_RESULTS`] ranked hits.
    pub fn search(&self, query: &ParsedQuery) -> Result<Vec<SearchResult>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates: HashMap<DocId, Candidate> = HashMap::new();

        for term in &query.terms {
            self.process_term(term, query, &mut candidates)?;
        }
        for phrase in &query.phrases {
            self.process_phrase(phrase, query, &mut candidates)?;
        }

        let required = query.total_requirements();
        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .filter(|(_, c)| c.match_count == required)
            .filter_map(|(doc_id, c)| {
                let doc = self.reader.document(doc_id)?;
                Some(SearchResult {
                    doc_id,
                    path: doc.path.clone(),
                    score: c.score,
                    total_hits: c.total_hits,
                    snippet: String::new(),
                    line_num: 0,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.doc_id.cmp(&b.doc_id))
        });
        results.truncate(MAX_RESULTS);

        self.attach_snippets(&mut results, query);
        Ok(results)
    }

    /// Inverse document frequency of a term; 0 for absent terms.
    fn idf(&self, term: &str) -> f64 {
        match self.reader.lexicon_entry(term) {
            Some(entry) => {
                (self.reader.total_docs() as f64 / (entry.doc_freq as f64 + 1.0)).ln()
            }
            None => 0.0,
        }
    }

    fn process_term(
        &self,
        term: &str,
        query: &ParsedQuery,
        candidates: &mut HashMap<DocId, Candidate>,
    ) -> Result<()> {
        let postings = self.reader.get_postings(term)?;
        if postings.is_empty() {
            return Ok(());
        }
        let idf = self.idf(term);

        for posting in &postings {
            if !self.passes_ext_filter(posting.doc_id, &query.ext_filter) {
                continue;
            }
            match query.level_filter.as_str() {
                "ERROR" if posting.meta & meta::LOG_LEVEL_ERROR == 0 => continue,
                "WARN" if posting.meta & meta::LOG_LEVEL_WARN == 0 => continue,
                _ => {}
            }

            let mut score = posting.frequency as f64 * idf;
            if posting.meta & meta::IN_FILENAME != 0 {
                score += FILENAME_BOOST;
            }
            if posting.meta & meta::IN_FUNCTION_NAME != 0 {
                score += FUNCTION_NAME_BOOST;
            }

            let candidate = candidates.entry(posting.doc_id).or_default();
            candidate.score += score;
            candidate.total_hits += posting.frequency;
            candidate.match_count += 1;
        }
        Ok(())
    }

    /// Positional phrase verification. The level filter does not
    /// apply here; only the ext filter does.
    fn process_phrase(
        &self,
        phrase: &[String],
        query: &ParsedQuery,
        candidates: &mut HashMap<DocId, Candidate>,
    ) -> Result<()> {
        let mut word_postings: Vec<Vec<Posting>> = Vec::with_capacity(phrase.len());
        for word in phrase {
            let postings = self.reader.get_postings(word)?;
            if postings.is_empty() {
                return Ok(());
            }
            word_postings.push(postings);
        }

        let matched = match_phrase_docs(&word_postings);
        if matched.is_empty() {
            return Ok(());
        }

        let phrase_idf: f64 = phrase.iter().map(|w| self.idf(w)).sum();

        for (doc_id, count) in matched {
            if !self.passes_ext_filter(doc_id, &query.ext_filter) {
                continue;
            }
            let candidate = candidates.entry(doc_id).or_default();
            candidate.score += count as f64 * phrase_idf * PHRASE_BOOST;
            candidate.total_hits += count;
            candidate.match_count += 1;
        }
        Ok(())
    }

    fn passes_ext_filter(&self, doc_id: DocId, ext_filter: &str) -> bool {
        if ext_filter.is_empty() {
            return true;
        }
        match self.reader.document(doc_id) {
            Some(doc) => doc.path.to_lowercase().ends_with(ext_filter),
            None => false,
        }
    }

    fn attach_snippets(&self, results: &mut [SearchResult], query: &ParsedQuery) {
        let display_term = match query.terms.first() {
            Some(term) => term.as_str(),
            None => match query.phrases.first().and_then(|p| p.first()) {
                Some(word) => word.as_str(),
                None => return,
            },
        };

        for result in results {
            if let Some((snippet, line_num)) =
                self.snippets.first_matching_line(&result.path, display_term)
            {
                result.snippet = snippet;
                result.line_num = line_num;
            }
        }
    }
}

/// Intersect the words' postings into `doc_id -> chain endpoint
/// count`. A position survives round `i` when `position - 1`
/// survived round `i - 1`, which is exactly the contiguity witness
/// for the phrase.
fn match_phrase_docs(word_postings: &[Vec<Posting>]) -> HashMap<DocId, u32> {
    let mut candidates: HashMap<DocId, Vec<u32>> = word_postings[0]
        .iter()
        .map(|p| (p.doc_id, p.positions.clone()))
        .collect();

    for postings in &word_postings[1..] {
        let mut next: HashMap<DocId, Vec<u32>> = HashMap::new();
        for posting in postings {
            let Some(prev_positions) = candidates.get(&posting.doc_id) else {
                continue;
            };
            // Position lists are sorted, so each predecessor check
            // is a binary search. Position 0 (filename tokens) has
            // no predecessor and can never extend a chain.
            let survivors: Vec<u32> = posting
                .positions
                .iter()
                .copied()
                .filter(|&pos| {
                    pos.checked_sub(1)
                        .is_some_and(|prev| prev_positions.binary_search(&prev).is_ok())
                })
                .collect();
            if !survivors.is_empty() {
                next.insert(posting.doc_id, survivors);
            }
        }
        candidates = next;
        if candidates.is_empty() {
            break;
        }
    }

    candidates
        .into_iter()
        .map(|(doc_id, positions)| (doc_id, positions.len() as u32))
        .collect()
}
