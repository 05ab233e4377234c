//! Index reader: opens the three index files and serves postings
//! lookups by offset.
//!
//! Documents and the lexicon are small enough to load fully at
//! startup; postings stay on disk and are fetched per term with a
//! seek + block read. The postings handle is shared behind a mutex
//! so concurrent queries serialize each seek+read pair.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use crate::codec;
use crate::docstore::DocReader;
use crate::error::{Error, Result};
use crate::types::{
    DocId, DocumentRecord, LexiconEntry, Posting, DOCS_FILE, LEXICON_FILE, LEXICON_MAGIC,
    POSTINGS_FILE, POSTINGS_MAGIC,
};

/// Read-only handle to a built index directory.
pub struct IndexReader {
    docs: HashMap<DocId, DocumentRecord>,
    lexicon: HashMap<String, LexiconEntry>,
    postings: Mutex<File>,
}

impl IndexReader {
    /// Open the index in `dir`, loading documents and lexicon and
    /// validating the postings header.
    pub fn open(dir: &Path) -> Result<Self> {
        let docs = load_docs(&dir.join(DOCS_FILE))?;
        let lexicon = load_lexicon(&dir.join(LEXICON_FILE))?;

        let mut postings_file = File::open(dir.join(POSTINGS_FILE))?;
        codec::read_header(&mut postings_file, POSTINGS_MAGIC, POSTINGS_FILE)?;

        Ok(Self {
            docs,
            lexicon,
            postings: Mutex::new(postings_file),
        })
    }

    /// Number of indexed documents.
    pub fn total_docs(&self) -> usize {
        self.docs.len()
    }

    /// Look up one document's record.
    pub fn document(&self, doc_id: DocId) -> Option<&DocumentRecord> {
        self.docs.get(&doc_id)
    }

    /// Look up a term's lexicon entry.
    pub fn lexicon_entry(&self, term: &str) -> Option<&LexiconEntry> {
        self.lexicon.get(term)
    }

    /// Fetch all postings for a term. Unknown terms yield an empty
    /// vec, not an error.
    pub fn get_postings(&self, term: &str) -> Result<Vec<Posting>> {
        let Some(entry) = self.lexicon.get(term) else {
            return Ok(Vec::new());
        };

        let block = {
            let mut file = self
                .postings
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            file.seek(SeekFrom::Start(entry.offset))?;
            let mut block = vec![0u8; entry.byte_length as usize];
            file.read_exact(&mut block).map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::CorruptIndex(format!("truncated postings block in {POSTINGS_FILE}"))
                } else {
                    Error::Io(e)
                }
            })?;
            block
        };

        let mut cursor = std::io::Cursor::new(block);
        let mut postings = Vec::with_capacity(entry.doc_freq as usize);
        for _ in 0..entry.doc_freq {
            postings.push(codec::read_posting(&mut cursor, POSTINGS_FILE)?);
        }
        if cursor.position() != entry.byte_length as u64 {
            return Err(Error::CorruptIndex(format!(
                "postings block length mismatch in {POSTINGS_FILE}"
            )));
        }

        Ok(postings)
    }
}

fn load_docs(path: &Path) -> Result<HashMap<DocId, DocumentRecord>> {
    let mut reader = DocReader::open(path)?;
    let mut docs = HashMap::new();
    while let Some(record) = reader.read_next()? {
        docs.insert(record.doc_id, record);
    }
    Ok(docs)
}

fn load_lexicon(path: &Path) -> Result<HashMap<String, LexiconEntry>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    codec::read_header(&mut reader, LEXICON_MAGIC, LEXICON_FILE)?;

    let mut lexicon = HashMap::new();
    while let Some((term, entry)) = codec::read_lexicon_entry(&mut reader, LEXICON_FILE)? {
        lexicon.insert(term, entry);
    }
    Ok(lexicon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use crate::types::meta;
    use std::fs;
    use tempfile::TempDir;

    fn build_index(files: &[(&str, &str)]) -> (TempDir, TempDir) {
        let tree = TempDir::new().unwrap();
        for (path, content) in files {
            fs::write(tree.path().join(path), content).unwrap();
        }
        let out = TempDir::new().unwrap();
        IndexBuilder::new(out.path()).build(tree.path()).unwrap();
        (tree, out)
    }

    #[test]
    fn test_open_and_lookup() {
        let (_tree, out) = build_index(&[
            ("alpha.rs", "one two three"),
            ("beta.rs", "two three four"),
        ]);

        let reader = IndexReader::open(out.path()).unwrap();
        assert_eq!(reader.total_docs(), 2);

        let entry = reader.lexicon_entry("two").unwrap();
        assert_eq!(entry.doc_freq, 2);

        let postings = reader.get_postings("two").unwrap();
        assert_eq!(postings.len(), 2);
        assert!(postings[0].doc_id < postings[1].doc_id);
    }

    #[test]
    fn test_postings_match_built_index() {
        let (_tree, out) = build_index(&[("code.py", "def handler():\n    handler()\n")]);

        let reader = IndexReader::open(out.path()).unwrap();
        let postings = reader.get_postings("handler").unwrap();
        assert_eq!(postings.len(), 1);

        let p = &postings[0];
        assert_eq!(p.frequency, 2);
        assert_eq!(p.positions, vec![2, 3]);
        assert!(p.meta & meta::IN_FUNCTION_NAME != 0);
    }

    #[test]
    fn test_unknown_term_is_empty() {
        let (_tree, out) = build_index(&[("a.rs", "something")]);

        let reader = IndexReader::open(out.path()).unwrap();
        assert!(reader.get_postings("missing").unwrap().is_empty());
    }

    #[test]
    fn test_document_records_loaded() {
        let (_tree, out) = build_index(&[("notes.md", "hello")]);

        let reader = IndexReader::open(out.path()).unwrap();
        let doc = reader.document(1).unwrap();
        assert!(doc.path.ends_with("notes.md"));
        assert_eq!(doc.ts_min, 0);
        assert_eq!(doc.ts_max, 0);
    }

    #[test]
    fn test_missing_index_dir_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(IndexReader::open(&tmp.path().join("nope")).is_err());
    }

    #[test]
    fn test_corrupt_postings_header_fails() {
        let (_tree, out) = build_index(&[("a.rs", "word")]);
        fs::write(out.path().join(POSTINGS_FILE), b"DEVSCOPE_XXX\x01").unwrap();

        let result = IndexReader::open(out.path());
        assert!(matches!(result, Err(Error::CorruptIndex(_))));
    }

    #[test]
    fn test_truncated_postings_block_fails() {
        let (_tree, out) = build_index(&[("a.rs", "word")]);

        let bytes = fs::read(out.path().join(POSTINGS_FILE)).unwrap();
        fs::write(out.path().join(POSTINGS_FILE), &bytes[..bytes.len() - 2]).unwrap();

        let reader = IndexReader::open(out.path()).unwrap();
        let result = reader.get_postings("word");
        assert!(matches!(result, Err(Error::CorruptIndex(_))));
    }
}
