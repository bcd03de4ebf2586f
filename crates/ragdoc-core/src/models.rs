//! Core data models that flow through the ingestion and answering pipeline.

use serde::Serialize;

/// Plain text extracted from a single source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Source identifier (typically the file name).
    pub id: String,
    /// Full extracted text.
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A contiguous, possibly overlapping passage of a [`Document`].
///
/// Offsets count `char`s, not bytes, and describe the half-open range
/// `[start, end)` within the document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Position of this chunk in document order, starting at 0.
    pub id: usize,
    pub document_id: String,
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// SHA-256 hex digest of `text`.
    pub hash: String,
}

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Why retrieval produced no context even though an index exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "message", rename_all = "snake_case")]
pub enum RetrievalDegradation {
    /// The query could not be embedded.
    Embedding(String),
    /// The index rejected the query vector.
    Search(String),
}

impl std::fmt::Display for RetrievalDegradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalDegradation::Embedding(msg) => write!(f, "query embedding failed: {}", msg),
            RetrievalDegradation::Search(msg) => write!(f, "index search failed: {}", msg),
        }
    }
}

/// Passages retrieved for one query, most similar first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievedContext {
    pub hits: Vec<RetrievedChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degradation: Option<RetrievalDegradation>,
}

impl RetrievedContext {
    pub fn degraded(reason: RetrievalDegradation) -> Self {
        Self {
            hits: Vec::new(),
            degradation: Some(reason),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn scores(&self) -> Vec<f32> {
        self.hits.iter().map(|h| h.score).collect()
    }
}
