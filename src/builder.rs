//! Index builder: walks a tree, tokenizes every file, and flushes
//! the three-file index.
//!
//! The walker runs on its own thread and feeds document records
//! through a bounded channel; the consumer side owns the in-memory
//! inverted index, so no locking is needed. On-disk ordering (terms
//! ascending by bytes, postings ascending by doc_id) is imposed at
//! flush time, which makes rebuilds of identical trees
//! byte-identical.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressStyle};

use crate::codec;
use crate::docstore::DocWriter;
use crate::error::Result;
use crate::tokenizer::{self, RawToken};
use crate::types::{
    meta, DocId, DocumentRecord, LexiconEntry, Posting, DOCS_FILE, LEXICON_FILE, LEXICON_MAGIC,
    MAX_STRING_LEN, POSTINGS_FILE, POSTINGS_MAGIC,
};
use crate::walker::{self, WalkedFile};

/// Capacity of the walker-to-builder channel.
const CHANNEL_CAP: usize = 256;

/// Write buffer size for the postings and lexicon files (1 MB).
const WRITE_BUFFER_SIZE: usize = 1024 * 1024;

/// Statistics reported after a build.
#[derive(Debug, Clone, Copy)]
pub struct BuildStats {
    /// Files tokenized and written to the document store.
    pub files_indexed: u64,
    /// Files emitted by the walker but unreadable.
    pub files_skipped: u64,
    /// Distinct terms in the flushed lexicon.
    pub distinct_terms: usize,
}

/// Builds the on-disk index for one directory tree.
pub struct IndexBuilder {
    out_dir: PathBuf,
    /// term -> doc_id -> posting. Insertion order is irrelevant.
    mem_index: HashMap<String, HashMap<DocId, Posting>>,
}

impl IndexBuilder {
    /// Create a builder that writes into `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            mem_index: HashMap::new(),
        }
    }

    /// Walk `root`, index every file, and flush `docs.bin`,
    /// `index.bin`, and `lexicon.bin`.
    pub fn build(mut self, root: &Path) -> Result<BuildStats> {
        let start = Instant::now();
        fs::create_dir_all(&self.out_dir)?;

        let mut doc_writer = DocWriter::create(&self.out_dir.join(DOCS_FILE))?;

        let (tx, rx) = bounded::<WalkedFile>(CHANNEL_CAP);
        let walk_root = root.to_path_buf();
        let walker_handle = thread::spawn(move || {
            for file in walker::walk(&walk_root) {
                if tx.send(file).is_err() {
                    break;
                }
            }
            // Dropping the sender closes the channel.
        });

        let pb = progress_spinner();
        let mut files_indexed: u64 = 0;
        let mut files_skipped: u64 = 0;

        for file in rx {
            let content = match fs::read(&file.path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    tracing::warn!("could not read {}: {e}", file.path.display());
                    files_skipped += 1;
                    continue;
                }
            };

            let (tokens, ts_min, ts_max) = tokenizer::tokenize(&content, file.doc_type);
            let record = DocumentRecord {
                doc_id: file.doc_id,
                doc_type: file.doc_type,
                path: file.path.to_string_lossy().into_owned(),
                ts_min,
                ts_max,
            };
            doc_writer.write(&record)?;

            // Filename tokens first: position 0 sorts before every
            // content position, keeping posting positions strictly
            // increasing.
            self.add_filename_tokens(&file, record.doc_id);
            for token in tokens {
                self.add_token(&token, file.doc_id);
            }

            files_indexed += 1;
            pb.inc(1);
        }

        if walker_handle.join().is_err() {
            tracing::warn!("walker thread panicked");
        }
        doc_writer.finish()?;
        pb.finish_and_clear();

        tracing::info!(
            "tokenized {} files ({} skipped) in {:?}, flushing index",
            files_indexed,
            files_skipped,
            start.elapsed()
        );

        let distinct_terms = self.flush()?;

        Ok(BuildStats {
            files_indexed,
            files_skipped,
            distinct_terms,
        })
    }

    /// Merge one token occurrence into the in-memory index.
    fn add_token(&mut self, token: &RawToken, doc_id: DocId) {
        // Keys are truncated on the way in so the in-memory term,
        // the lexicon term, and the on-disk bytes always agree.
        let term = codec::truncate_utf8(&token.term, MAX_STRING_LEN);

        let posting = self
            .mem_index
            .entry(term.to_string())
            .or_default()
            .entry(doc_id)
            .or_insert_with(|| Posting::new(doc_id));

        posting.frequency += 1;
        posting.positions.push(token.position);
        posting.meta |= token.meta;
    }

    /// Index the base filename at position 0 so that name matches
    /// rank well without ever satisfying a phrase chain.
    fn add_filename_tokens(&mut self, file: &WalkedFile, doc_id: DocId) {
        let Some(name) = file.path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        // A name like "test.test.go" yields "test" twice; merging it
        // twice would put two 0s in one position list.
        let mut terms = tokenizer::filename_terms(name);
        terms.sort_unstable();
        terms.dedup();
        for term in terms {
            self.add_token(
                &RawToken {
                    term,
                    position: 0,
                    meta: meta::IN_FILENAME,
                },
                doc_id,
            );
        }
    }

    /// Write `index.bin` and `lexicon.bin` in lockstep and return
    /// the number of distinct terms.
    fn flush(self) -> Result<usize> {
        let mut terms: Vec<&String> = self.mem_index.keys().collect();
        terms.sort_unstable();

        let postings_file = File::create(self.out_dir.join(POSTINGS_FILE))?;
        let mut postings_writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, postings_file);
        codec::write_header(&mut postings_writer, POSTINGS_MAGIC)?;

        let mut offset = (POSTINGS_MAGIC.len() + 1) as u64;
        let mut entries: Vec<(&String, LexiconEntry)> = Vec::with_capacity(terms.len());

        for term in terms {
            let doc_map = &self.mem_index[term];
            let mut postings: Vec<&Posting> = doc_map.values().collect();
            postings.sort_unstable_by_key(|p| p.doc_id);

            let start_offset = offset;
            for posting in postings {
                offset += codec::write_posting(&mut postings_writer, posting)?;
            }

            entries.push((
                term,
                LexiconEntry {
                    doc_freq: doc_map.len() as u32,
                    offset: start_offset,
                    byte_length: (offset - start_offset) as u32,
                },
            ));
        }
        postings_writer.flush()?;

        let lexicon_file = File::create(self.out_dir.join(LEXICON_FILE))?;
        let mut lexicon_writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, lexicon_file);
        codec::write_header(&mut lexicon_writer, LEXICON_MAGIC)?;
        for (term, entry) in &entries {
            codec::write_lexicon_entry(&mut lexicon_writer, term, entry)?;
        }
        lexicon_writer.flush()?;

        Ok(entries.len())
    }
}

fn progress_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} indexed {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}
