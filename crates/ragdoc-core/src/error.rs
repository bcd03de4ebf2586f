//! Error types for each pipeline boundary.
//!
//! Ingestion, retrieval and generation each fail in their own way and
//! callers branch on the kind rather than on message text. Retrieval
//! failures are not errors at all: they are recorded on the
//! [`RetrievedContext`](crate::models::RetrievedContext) as a
//! [`RetrievalDegradation`](crate::models::RetrievalDegradation).

use std::time::Duration;

use thiserror::Error;

/// Invalid chunking parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("chunk_size must be > 0")]
    ZeroChunkSize,

    #[error("overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

/// Failure talking to, or interpreting the output of, an embedding service.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider is disabled")]
    Disabled,

    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("embedding service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("embedding transport error: {0}")]
    Transport(String),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding service returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Failure building or querying a vector index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("index build received {chunks} chunks but {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("chunk id {chunk_id} appears more than once")]
    DuplicateChunk { chunk_id: usize },

    #[error("vector for chunk {chunk_id} is empty")]
    EmptyVector { chunk_id: usize },

    #[error("vector dimension mismatch: index has {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Failure calling the generative model.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid sampling config: {0}")]
    InvalidSampling(String),

    #[error("generation request timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("generation transport error: {0}")]
    Transport(String),

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),

    #[error("generation service returned an empty completion")]
    EmptyResponse,
}

impl GenerationError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Timeout(_) | GenerationError::Transport(_) => true,
            GenerationError::Service { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl EmbeddingError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            EmbeddingError::Timeout(_) | EmbeddingError::Transport(_) => true,
            EmbeddingError::Service { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Failure of [`Pipeline::ingest`](crate::pipeline::Pipeline::ingest).
///
/// Any of these leaves the pipeline uninitialized.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("chunking failed: {0}")]
    Chunking(#[from] ChunkError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index build failed: {0}")]
    Index(#[from] IndexError),
}

/// Failure of [`Pipeline::answer`](crate::pipeline::Pipeline::answer).
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("no document has been ingested")]
    NotIndexed,

    #[error("query must not be empty")]
    EmptyQuery,

    #[error(transparent)]
    Generation(#[from] GenerationError),
}
