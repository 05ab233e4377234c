//! Little-endian record codec for the three index files.
//!
//! Every file starts with an ASCII magic followed by one version
//! byte. Records are fixed layouts of little-endian integers with
//! u16-length-prefixed strings (no terminator). Readers distinguish
//! a clean end-of-stream (EOF on a record boundary) from a truncated
//! record, which is corruption.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::types::{DocType, DocumentRecord, LexiconEntry, Posting, FORMAT_VERSION, MAX_STRING_LEN};

/// Fixed prefix of a posting record: doc_id + freq + meta + pos_count.
pub const POSTING_HEADER_LEN: usize = 4 + 4 + 1 + 4;

/// Write the magic + version header of an index file.
pub fn write_header(w: &mut impl Write, magic: &[u8]) -> Result<()> {
    w.write_all(magic)?;
    w.write_all(&[FORMAT_VERSION])?;
    Ok(())
}

/// Validate the magic + version header of an index file.
///
/// `label` names the file in error messages.
pub fn read_header(r: &mut impl Read, magic: &[u8], label: &str) -> Result<()> {
    let mut buf = vec![0u8; magic.len()];
    read_exact_or_corrupt(r, &mut buf, label)?;
    if buf != magic {
        return Err(Error::CorruptIndex(format!("bad magic in {label}")));
    }
    let version = read_u8(r, label)?;
    if version != FORMAT_VERSION {
        return Err(Error::CorruptIndex(format!(
            "unsupported version {version} in {label}"
        )));
    }
    Ok(())
}

/// `read_exact` that reports a short read as index corruption.
fn read_exact_or_corrupt(r: &mut impl Read, buf: &mut [u8], label: &str) -> Result<()> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::CorruptIndex(format!("unexpected end of file in {label}"))
        } else {
            Error::Io(e)
        }
    })
}

/// Read one byte, or `None` on a clean end-of-stream boundary.
///
/// Used by streaming readers where EOF before the first byte of a
/// record is the normal end condition.
fn try_read_first(r: &mut impl Read, buf: &mut [u8], label: &str) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = r.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(Error::CorruptIndex(format!(
                "unexpected end of file in {label}"
            )));
        }
        filled += n;
    }
    Ok(true)
}

fn read_u8(r: &mut impl Read, label: &str) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_exact_or_corrupt(r, &mut buf, label)?;
    Ok(buf[0])
}

fn read_u16(r: &mut impl Read, label: &str) -> Result<u16> {
    let mut buf = [0u8; 2];
    read_exact_or_corrupt(r, &mut buf, label)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32(r: &mut impl Read, label: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact_or_corrupt(r, &mut buf, label)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(r: &mut impl Read, label: &str) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact_or_corrupt(r, &mut buf, label)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_i64(r: &mut impl Read, label: &str) -> Result<i64> {
    let mut buf = [0u8; 8];
    read_exact_or_corrupt(r, &mut buf, label)?;
    Ok(i64::from_le_bytes(buf))
}

fn read_string(r: &mut impl Read, len: usize, label: &str) -> Result<String> {
    let mut buf = vec![0u8; len];
    read_exact_or_corrupt(r, &mut buf, label)?;
    String::from_utf8(buf)
        .map_err(|_| Error::CorruptIndex(format!("invalid UTF-8 string in {label}")))
}

/// Truncate a string to at most `max` bytes on a char boundary.
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Encode one document record:
/// `DocID:u32 | Type:u8 | PathLen:u16 | Path | TsMin:i64 | TsMax:i64`.
pub fn write_document(w: &mut impl Write, rec: &DocumentRecord) -> Result<()> {
    let path = truncate_utf8(&rec.path, MAX_STRING_LEN).as_bytes();
    w.write_all(&rec.doc_id.to_le_bytes())?;
    w.write_all(&[rec.doc_type as u8])?;
    w.write_all(&(path.len() as u16).to_le_bytes())?;
    w.write_all(path)?;
    w.write_all(&rec.ts_min.to_le_bytes())?;
    w.write_all(&rec.ts_max.to_le_bytes())?;
    Ok(())
}

/// Decode one document record, or `None` at a clean end-of-stream.
pub fn read_document(r: &mut impl Read, label: &str) -> Result<Option<DocumentRecord>> {
    let mut id_buf = [0u8; 4];
    if !try_read_first(r, &mut id_buf, label)? {
        return Ok(None);
    }
    let doc_id = u32::from_le_bytes(id_buf);

    let type_byte = read_u8(r, label)?;
    let doc_type = DocType::from_u8(type_byte)
        .ok_or_else(|| Error::CorruptIndex(format!("unknown document type {type_byte} in {label}")))?;

    let path_len = read_u16(r, label)? as usize;
    let path = read_string(r, path_len, label)?;
    let ts_min = read_i64(r, label)?;
    let ts_max = read_i64(r, label)?;

    Ok(Some(DocumentRecord {
        doc_id,
        doc_type,
        path,
        ts_min,
        ts_max,
    }))
}

/// Encode one posting:
/// `DocID:u32 | Freq:u32 | Meta:u8 | PosCount:u32 | Position*:u32`.
///
/// Returns the number of bytes written.
pub fn write_posting(w: &mut impl Write, posting: &Posting) -> Result<u64> {
    w.write_all(&posting.doc_id.to_le_bytes())?;
    w.write_all(&posting.frequency.to_le_bytes())?;
    w.write_all(&[posting.meta])?;
    w.write_all(&(posting.positions.len() as u32).to_le_bytes())?;
    for pos in &posting.positions {
        w.write_all(&pos.to_le_bytes())?;
    }
    Ok((POSTING_HEADER_LEN + 4 * posting.positions.len()) as u64)
}

/// Decode one posting. EOF anywhere inside is corruption; the caller
/// knows how many postings a block holds from the lexicon.
pub fn read_posting(r: &mut impl Read, label: &str) -> Result<Posting> {
    let doc_id = read_u32(r, label)?;
    let frequency = read_u32(r, label)?;
    let meta = read_u8(r, label)?;
    let pos_count = read_u32(r, label)? as usize;

    let mut pos_buf = vec![0u8; 4 * pos_count];
    read_exact_or_corrupt(r, &mut pos_buf, label)?;
    let positions = pos_buf
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(Posting {
        doc_id,
        frequency,
        positions,
        meta,
    })
}

/// Encode one lexicon entry:
/// `TermLen:u16 | Term | DocFreq:u32 | Offset:u64 | ByteLength:u32`.
pub fn write_lexicon_entry(w: &mut impl Write, term: &str, entry: &LexiconEntry) -> Result<()> {
    let term = truncate_utf8(term, MAX_STRING_LEN).as_bytes();
    w.write_all(&(term.len() as u16).to_le_bytes())?;
    w.write_all(term)?;
    w.write_all(&entry.doc_freq.to_le_bytes())?;
    w.write_all(&entry.offset.to_le_bytes())?;
    w.write_all(&entry.byte_length.to_le_bytes())?;
    Ok(())
}

/// Decode one lexicon entry, or `None` at a clean end-of-stream.
pub fn read_lexicon_entry(r: &mut impl Read, label: &str) -> Result<Option<(String, LexiconEntry)>> {
    let mut len_buf = [0u8; 2];
    if !try_read_first(r, &mut len_buf, label)? {
        return Ok(None);
    }
    let term_len = u16::from_le_bytes(len_buf) as usize;
    let term = read_string(r, term_len, label)?;
    let doc_freq = read_u32(r, label)?;
    let offset = read_u64(r, label)?;
    let byte_length = read_u32(r, label)?;

    Ok(Some((
        term,
        LexiconEntry {
            doc_freq,
            offset,
            byte_length,
        },
    )))
}
