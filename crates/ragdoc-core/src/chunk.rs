//! Fixed-window text chunker with overlap.
//!
//! Splits document text into [`Chunk`]s of `chunk_size` characters, each
//! starting `chunk_size - overlap` characters after the previous one, so
//! consecutive chunks share exactly `overlap` characters. The final chunk
//! may be shorter.
//!
//! Offsets are measured in `char`s so multi-byte UTF-8 text is never split
//! inside a code point. Each chunk carries a SHA-256 hash of its text;
//! since splitting is deterministic, rebuilding an index from the same text
//! reproduces identical boundaries and hashes.
//!
//! # Example
//!
//! ```rust
//! use ragdoc_core::chunk::split;
//! use ragdoc_core::models::Document;
//!
//! let doc = Document::new("doc", "abcdefghij");
//! let chunks = split(&doc, 4, 1).unwrap();
//! let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(texts, ["abcd", "defg", "ghij"]);
//! ```

use sha2::{Digest, Sha256};

use crate::error::ChunkError;
use crate::models::{Chunk, Document};

/// Split a document into overlapping fixed-size chunks.
///
/// # Errors
///
/// [`ChunkError::ZeroChunkSize`] if `chunk_size == 0`, and
/// [`ChunkError::OverlapTooLarge`] unless `overlap < chunk_size`.
///
/// # Guarantees
///
/// - An empty document yields no chunks.
/// - Chunk ids are contiguous: `0, 1, 2, …, N-1`, in document order.
/// - The union of `[start, end)` ranges is exactly `[0, len)`.
/// - Only the last chunk may be shorter than `chunk_size`.
pub fn split(document: &Document, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::ZeroChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkError::OverlapTooLarge {
            chunk_size,
            overlap,
        });
    }

    let text = document.text.as_str();
    // Byte offset of every char, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = boundaries.len() - 1;

    let step = chunk_size - overlap;
    let mut chunks = Vec::with_capacity(len.div_ceil(step));
    let mut start = 0;

    while start < len {
        let end = (start + chunk_size).min(len);
        let piece = &text[boundaries[start]..boundaries[end]];
        chunks.push(make_chunk(&document.id, chunks.len(), start, end, piece));
        if end == len {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

fn make_chunk(document_id: &str, id: usize, start: usize, end: usize, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id,
        document_id: document_id.to_string(),
        start,
        end,
        text: text.to_string(),
        hash,
    }
}
