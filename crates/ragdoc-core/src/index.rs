//! In-memory vector index over chunk embeddings.
//!
//! [`VectorIndex`] is the capability the retriever and pipeline depend on;
//! [`FlatIndex`] is the exact brute-force implementation, which comfortably
//! serves a single document's hundreds to low thousands of chunks. An
//! approximate index (IVF, HNSW) can replace it by implementing the same
//! trait.
//!
//! Indices are built once from a complete set of chunks and vectors and are
//! read-only afterwards. Re-ingestion builds a new index; there is no
//! incremental update.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::embedding::{dot_product, norm};
use crate::error::IndexError;
use crate::models::Chunk;

/// Similarity metric shared by build and query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine similarity in `[-1.0, 1.0]`.
    #[default]
    Cosine,
    /// Raw inner product (equivalent to cosine for unit vectors).
    Dot,
}

/// One search result: a chunk id and its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk_id: usize,
    pub score: f32,
}

/// Nearest-neighbor search over chunk vectors.
pub trait VectorIndex: Send + Sync {
    /// Build an index from chunks and their vectors (same length, same order).
    fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>, metric: Metric) -> Result<Self, IndexError>
    where
        Self: Sized;

    /// Return up to `k` hits ordered by descending score.
    ///
    /// Equal scores keep chunk insertion order. `k == 0` and an empty index
    /// both yield an empty result.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError>;

    /// Look up an indexed chunk by id.
    fn chunk(&self, id: usize) -> Option<&Chunk>;

    /// Number of indexed chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimension, or `None` for an empty index.
    fn dims(&self) -> Option<usize>;

    fn metric(&self) -> Metric;
}

struct IndexedVector {
    chunk: Chunk,
    vector: Vec<f32>,
    norm: f32,
}

/// Exact nearest-neighbor index: scores every stored vector per query.
pub struct FlatIndex {
    entries: Vec<IndexedVector>,
    positions: HashMap<usize, usize>,
    dims: Option<usize>,
    metric: Metric,
}

impl FlatIndex {
    fn score(&self, entry: &IndexedVector, query: &[f32], query_norm: f32) -> f32 {
        let dot = dot_product(&entry.vector, query);
        let score = match self.metric {
            Metric::Dot => dot,
            Metric::Cosine => {
                let denom = entry.norm * query_norm;
                if denom < f32::EPSILON {
                    0.0
                } else {
                    dot / denom
                }
            }
        };
        if score.is_nan() {
            f32::NEG_INFINITY
        } else {
            score
        }
    }
}

impl VectorIndex for FlatIndex {
    fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>, metric: Metric) -> Result<Self, IndexError> {
        if chunks.len() != vectors.len() {
            return Err(IndexError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let mut dims = None;
        let mut entries = Vec::with_capacity(chunks.len());
        let mut positions = HashMap::with_capacity(chunks.len());

        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            if vector.is_empty() {
                return Err(IndexError::EmptyVector { chunk_id: chunk.id });
            }
            match dims {
                None => dims = Some(vector.len()),
                Some(d) if d != vector.len() => {
                    return Err(IndexError::DimensionMismatch {
                        expected: d,
                        got: vector.len(),
                    })
                }
                Some(_) => {}
            }
            if positions.insert(chunk.id, entries.len()).is_some() {
                return Err(IndexError::DuplicateChunk { chunk_id: chunk.id });
            }
            let norm = norm(&vector);
            entries.push(IndexedVector {
                chunk,
                vector,
                norm,
            });
        }

        Ok(Self {
            entries,
            positions,
            dims,
            metric,
        })
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let Some(dims) = self.dims else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != dims {
            return Err(IndexError::DimensionMismatch {
                expected: dims,
                got: query.len(),
            });
        }

        let query_norm = norm(query);
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                chunk_id: entry.chunk.id,
                score: self.score(entry, query, query_norm),
            })
            .collect();
        // Stable: ties keep insertion order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    fn chunk(&self, id: usize) -> Option<&Chunk> {
        self.positions.get(&id).map(|&pos| &self.entries[pos].chunk)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dims(&self) -> Option<usize> {
        self.dims
    }

    fn metric(&self) -> Metric {
        self.metric
    }
}
