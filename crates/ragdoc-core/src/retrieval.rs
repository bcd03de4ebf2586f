//! Top-k retrieval: embed the query, search the index, apply the threshold.
//!
//! Retrieval never fails outright. If the query cannot be embedded or the
//! index rejects the query vector, the result is an empty
//! [`RetrievedContext`] carrying a [`RetrievalDegradation`], and the caller
//! proceeds as if nothing relevant was found.
//!
//! # Score threshold
//!
//! When set, the threshold is a hard filter applied after top-k: hits with
//! `score < threshold` are dropped, so fewer than `k` passages may come
//! back.

use tracing::{debug, warn};

use crate::embedding::Embedder;
use crate::index::VectorIndex;
use crate::models::{RetrievalDegradation, RetrievedChunk, RetrievedContext};

/// Borrowing view over an embedder and an index.
pub struct Retriever<'a, I: VectorIndex + ?Sized> {
    embedder: &'a dyn Embedder,
    index: &'a I,
}

impl<'a, I: VectorIndex + ?Sized> Retriever<'a, I> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a I) -> Self {
        Self { embedder, index }
    }

    /// Retrieve up to `k` passages for `query`, most similar first.
    pub async fn retrieve(&self, query: &str, k: usize, score_threshold: Option<f32>) -> RetrievedContext {
        if query.trim().is_empty() || k == 0 || self.index.is_empty() {
            return RetrievedContext::default();
        }

        let query_vec = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "query embedding failed; continuing without context");
                return RetrievedContext::degraded(RetrievalDegradation::Embedding(e.to_string()));
            }
        };

        let hits = match self.index.search(&query_vec, k) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "index search failed; continuing without context");
                return RetrievedContext::degraded(RetrievalDegradation::Search(e.to_string()));
            }
        };

        let found = hits.len();
        let hits: Vec<RetrievedChunk> = hits
            .into_iter()
            .filter(|h| score_threshold.map_or(true, |t| h.score >= t))
            .filter_map(|h| {
                self.index.chunk(h.chunk_id).map(|chunk| RetrievedChunk {
                    chunk: chunk.clone(),
                    score: h.score,
                })
            })
            .collect();

        debug!(
            k,
            found,
            kept = hits.len(),
            threshold = ?score_threshold,
            "retrieved context"
        );

        RetrievedContext {
            hits,
            degradation: None,
        }
    }
}
