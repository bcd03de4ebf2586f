//! # ragdoc core
//!
//! Runtime-agnostic logic for answering questions about a single document:
//! chunking, the embedding and generation traits, the vector index, top-k
//! retrieval, prompt assembly and the [`pipeline::Pipeline`] that ties them
//! together.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. Concrete
//! embedding and generation providers live in the `ragdoc` app crate and
//! plug in through [`embedding::Embedder`] and [`generation::Generator`].
//!
//! ```text
//! ingest:  Document ─▶ chunk::split ─▶ Embedder::embed_all ─▶ VectorIndex::build
//! answer:  query ─▶ Retriever ─▶ PromptBuilder ─▶ Generator ─▶ Answer
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;

#[cfg(test)]
pub(crate) mod testing;
