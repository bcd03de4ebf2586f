//! Embedding provider trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus pure helpers for validating provider output and the vector
//! arithmetic used by the index.
//!
//! Concrete providers (OpenAI, Ollama, fastembed) live in the `ragdoc`
//! app crate.

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Maps text to fixed-dimension vectors via an external service.
///
/// Implementations must return exactly one vector per input, in input
/// order, and every vector from one provider must share a dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the configured dimensionality, if known up front.
    fn dims(&self) -> Option<usize>;

    /// Embed a batch of texts, preserving input order.
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single text (e.g. a search query).
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vectors = self.embed_all(&[text.to_string()]).await?;
        check_vectors(1, &vectors, self.dims())?;
        vectors
            .into_iter()
            .next()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                got: 0,
            })
    }
}

/// Validate a provider's output for `expected` inputs.
///
/// Checks the vector count and that every vector has the same, non-zero
/// dimension (matching `dims` when the provider declares one). Returns the
/// common dimension, or `None` when there are no vectors.
pub fn check_vectors(
    expected: usize,
    vectors: &[Vec<f32>],
    dims: Option<usize>,
) -> Result<Option<usize>, EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            got: vectors.len(),
        });
    }

    let Some(first) = vectors.first() else {
        return Ok(None);
    };
    let dim = dims.unwrap_or(first.len());
    if dim == 0 {
        return Err(EmbeddingError::InvalidResponse(
            "embedding vectors are empty".to_string(),
        ));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dim,
            got: bad.len(),
        });
    }

    Ok(Some(dim))
}

/// Inner product of two equal-length vectors (`0.0` on length mismatch).
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean norm.
pub fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
