//! The question-answering pipeline over one ingested document.
//!
//! A [`Pipeline`] starts [`PipelineState::Uninitialized`]. A successful
//! [`ingest`](Pipeline::ingest) makes it [`PipelineState::Indexed`];
//! answering does not change state. Re-ingesting rebuilds the index from
//! scratch and swaps it in whole, so concurrent queries see either the old
//! corpus or the new one. A failed ingest leaves the pipeline
//! uninitialized, discarding any earlier index.
//!
//! Overlapping ingests are ordered by start: only the most recently started
//! ingest may swap in its corpus or reset the pipeline. An older ingest that
//! finishes late changes nothing.
//!
//! ```text
//! ingest(doc):   split ─▶ embed_all ─▶ VectorIndex::build ─▶ swap in
//! answer(query): snapshot ─▶ Retriever ─▶ PromptBuilder ─▶ Generator
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunk;
use crate::embedding::{check_vectors, Embedder};
use crate::error::{AnswerError, IngestionError};
use crate::generation::{Generator, SamplingConfig};
use crate::index::{FlatIndex, Metric, VectorIndex};
use crate::models::{Document, RetrievedContext};
use crate::prompt::PromptBuilder;
use crate::retrieval::Retriever;

/// Tuning knobs for ingestion and answering.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Characters per chunk.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub overlap: usize,
    /// Passages retrieved per query.
    pub top_k: usize,
    /// Minimum similarity a passage needs to be used (hard filter).
    pub score_threshold: Option<f32>,
    pub metric: Metric,
    pub sampling: SamplingConfig,
    /// Call the model with the empty-context prompt when retrieval found
    /// nothing. When false, the not-found sentinel is returned directly.
    pub generate_without_context: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 3000,
            overlap: 100,
            top_k: 10,
            score_threshold: None,
            metric: Metric::Cosine,
            sampling: SamplingConfig::default(),
            generate_without_context: true,
        }
    }
}

/// Lifecycle state of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Uninitialized,
    Indexed,
}

/// Summary of a successful ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunks: usize,
    /// Embedding dimension, or `None` for an empty document.
    pub dims: Option<usize>,
}

/// How an [`Answer`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// The model produced the text from retrieved context.
    Generated,
    /// Retrieval found nothing, or the model answered with the not-found
    /// sentinel.
    NotFound,
}

/// Answer text plus the context it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub kind: AnswerKind,
    pub context: RetrievedContext,
}

/// An ingested document and its read-only index.
struct Corpus<I> {
    document: Document,
    index: I,
}

/// Owns the indexed corpus and composes retrieval, prompting and generation.
pub struct Pipeline<I: VectorIndex = FlatIndex> {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    prompt: PromptBuilder,
    settings: PipelineSettings,
    corpus: RwLock<Option<Arc<Corpus<I>>>>,
    /// Sequence number of the most recently started ingest.
    epoch: AtomicU64,
}

impl<I: VectorIndex> Pipeline<I> {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        prompt: PromptBuilder,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedder,
            generator,
            prompt,
            settings,
            corpus: RwLock::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn prompt(&self) -> &PromptBuilder {
        &self.prompt
    }

    pub fn state(&self) -> PipelineState {
        match self.snapshot() {
            Some(_) => PipelineState::Indexed,
            None => PipelineState::Uninitialized,
        }
    }

    /// Number of indexed chunks (0 when uninitialized).
    pub fn chunk_count(&self) -> usize {
        self.snapshot().map_or(0, |c| c.index.len())
    }

    /// Id of the ingested document, if any.
    pub fn document_id(&self) -> Option<String> {
        self.snapshot().map(|c| c.document.id.clone())
    }

    fn snapshot(&self) -> Option<Arc<Corpus<I>>> {
        self.corpus
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install `corpus` unless an ingest newer than `epoch` has started.
    fn replace(&self, epoch: u64, corpus: Option<Arc<Corpus<I>>>) -> bool {
        let mut slot = self.corpus.write().unwrap_or_else(PoisonError::into_inner);
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return false;
        }
        *slot = corpus;
        true
    }

    /// Chunk, embed and index `document`, replacing any previous corpus.
    ///
    /// # Errors
    ///
    /// Any chunking, embedding or index failure aborts the ingest and
    /// leaves the pipeline [`PipelineState::Uninitialized`], unless a newer
    /// ingest has started in the meantime.
    pub async fn ingest(&self, document: Document) -> Result<IngestReport, IngestionError> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        match self.build_corpus(document).await {
            Ok(corpus) => {
                let report = IngestReport {
                    document_id: corpus.document.id.clone(),
                    chunks: corpus.index.len(),
                    dims: corpus.index.dims(),
                };
                if !self.replace(epoch, Some(Arc::new(corpus))) {
                    debug!(document = %report.document_id, "ingest superseded by a newer one");
                    return Ok(report);
                }
                info!(
                    document = %report.document_id,
                    chunks = report.chunks,
                    dims = ?report.dims,
                    "document indexed"
                );
                Ok(report)
            }
            Err(e) => {
                if self.replace(epoch, None) {
                    warn!(error = %e, "ingestion failed; pipeline is uninitialized");
                } else {
                    warn!(error = %e, "superseded ingestion failed");
                }
                Err(e)
            }
        }
    }

    async fn build_corpus(&self, document: Document) -> Result<Corpus<I>, IngestionError> {
        let chunks = chunk::split(&document, self.settings.chunk_size, self.settings.overlap)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            let vectors = self.embedder.embed_all(&texts).await?;
            check_vectors(texts.len(), &vectors, self.embedder.dims())?;
            vectors
        };

        let index = I::build(chunks, vectors, self.settings.metric)?;
        Ok(Corpus { document, index })
    }

    /// Retrieve context for `query` without generating.
    pub async fn retrieve(&self, query: &str, k: Option<usize>) -> Result<RetrievedContext, AnswerError> {
        let corpus = self.snapshot().ok_or(AnswerError::NotIndexed)?;
        if query.trim().is_empty() {
            return Err(AnswerError::EmptyQuery);
        }
        let k = k.unwrap_or(self.settings.top_k);
        Ok(Retriever::new(self.embedder.as_ref(), &corpus.index)
            .retrieve(query, k, self.settings.score_threshold)
            .await)
    }

    /// Answer `query` from the ingested document.
    ///
    /// # Errors
    ///
    /// [`AnswerError::NotIndexed`] before a successful ingest,
    /// [`AnswerError::EmptyQuery`] for a blank query, and
    /// [`AnswerError::Generation`] when the model call fails. Retrieval
    /// problems are not errors; see [`RetrievedContext::degradation`].
    pub async fn answer(&self, query: &str) -> Result<Answer, AnswerError> {
        let context = self.retrieve(query, None).await?;

        if context.is_empty() && !self.settings.generate_without_context {
            info!(degraded = context.degradation.is_some(), "no relevant context; returning not-found answer");
            return Ok(Answer {
                text: self.prompt.not_found().to_string(),
                kind: AnswerKind::NotFound,
                context,
            });
        }

        let messages = self.prompt.build(&context, query);
        let text = self
            .generator
            .generate(&messages, &self.settings.sampling)
            .await?;

        info!(
            model = self.generator.model_name(),
            passages = context.len(),
            "answer generated"
        );

        let kind = if context.is_empty() || text.trim() == self.prompt.not_found() {
            AnswerKind::NotFound
        } else {
            AnswerKind::Generated
        };
        Ok(Answer {
            text,
            kind,
            context,
        })
    }
}
