//! Document store: append-only record log in `docs.bin`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::codec;
use crate::error::Result;
use crate::types::{DocumentRecord, DOCS_FILE, DOCS_MAGIC};

/// Write buffer size for the document store (64 KB).
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Appends document records to `docs.bin`.
pub struct DocWriter {
    writer: BufWriter<File>,
}

impl DocWriter {
    /// Create `docs.bin` at `path` and write the header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        codec::write_header(&mut writer, DOCS_MAGIC)?;
        Ok(Self { writer })
    }

    /// Append one record.
    pub fn write(&mut self, record: &DocumentRecord) -> Result<()> {
        codec::write_document(&mut self.writer, record)
    }

    /// Flush buffered bytes and release the file. A flush failure
    /// here aborts the build.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Streams document records back out of `docs.bin`.
pub struct DocReader {
    reader: BufReader<File>,
}

impl DocReader {
    /// Open `docs.bin` at `path`, validating magic and version.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        codec::read_header(&mut reader, DOCS_MAGIC, DOCS_FILE)?;
        Ok(Self { reader })
    }

    /// Decode the next record, or `None` at end-of-stream.
    pub fn read_next(&mut self) -> Result<Option<DocumentRecord>> {
        codec::read_document(&mut self.reader, DOCS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::DocType;
    use tempfile::TempDir;

    fn sample_records() -> Vec<DocumentRecord> {
        vec![
            DocumentRecord {
                doc_id: 1,
                doc_type: DocType::Code,
                path: "src/main.rs".to_string(),
                ts_min: 0,
                ts_max: 0,
            },
            DocumentRecord {
                doc_id: 2,
                doc_type: DocType::Log,
                path: "logs/app.log".to_string(),
                ts_min: 1735689600,
                ts_max: 1735776000,
            },
        ]
    }

    #[test]
    fn test_write_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DOCS_FILE);

        let mut writer = DocWriter::create(&path).unwrap();
        for rec in sample_records() {
            writer.write(&rec).unwrap();
        }
        writer.finish().unwrap();

        let mut reader = DocReader::open(&path).unwrap();
        let mut read_back = Vec::new();
        while let Some(rec) = reader.read_next().unwrap() {
            read_back.push(rec);
        }
        assert_eq!(read_back, sample_records());
    }

    #[test]
    fn test_empty_store_has_header_only() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DOCS_FILE);

        DocWriter::create(&path).unwrap().finish().unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, (DOCS_MAGIC.len() + 1) as u64);

        let mut reader = DocReader::open(&path).unwrap();
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        let result = DocReader::open(&tmp.path().join(DOCS_FILE));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_open_wrong_magic_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DOCS_FILE);
        std::fs::write(&path, b"NOT_AN_INDEX_FILE").unwrap();

        let result = DocReader::open(&path);
        assert!(matches!(result, Err(Error::CorruptIndex(_))));
    }

    #[test]
    fn test_truncated_record_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DOCS_FILE);

        let mut writer = DocWriter::create(&path).unwrap();
        writer.write(&sample_records()[0]).unwrap();
        writer.finish().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

        let mut reader = DocReader::open(&path).unwrap();
        let result = reader.read_next();
        assert!(matches!(result, Err(Error::CorruptIndex(_))));
    }
}
