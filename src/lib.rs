//! # ragdoc
//!
//! Question answering over a single document with retrieval-augmented
//! generation.
//!
//! The document is split into overlapping chunks, embedded, and indexed in
//! memory. Each question is embedded, the most similar chunks are
//! retrieved, and a generative model answers from those chunks alone. When
//! nothing relevant is found, the answer is a fixed "not found" sentence.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────────────┐   ┌──────────────┐
//! │  Document  │──▶│  Chunk ▶ Embed ▶ Index   │◀──│  Embedding   │
//! │ txt/md/pdf │   │      (ragdoc-core)       │   │  provider    │
//! └────────────┘   └────────────┬─────────────┘   └──────────────┘
//!                               │ retrieve
//!                               ▼
//!                  ┌──────────────────────────┐   ┌──────────────┐
//!                  │  Prompt ▶ Generate       │──▶│  Chat model  │
//!                  └────────────┬─────────────┘   └──────────────┘
//!                     ┌─────────┴─────────┐
//!                     ▼                   ▼
//!                ┌──────────┐       ┌──────────┐
//!                │   CLI    │       │   HTTP   │
//!                │ (ragdoc) │       │  server  │
//!                └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragdoc chunks                      # inspect how the document splits
//! ragdoc ask "At what temperature does water boil?"
//! ragdoc chat                        # interactive session
//! ragdoc serve                       # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | Embedding providers |
//! | [`generation`] | Chat model providers |
//! | [`retry`] | HTTP timeouts and backoff |
//! | [`extract`] | Document loading |
//! | [`session`] | Bounded chat transcript |
//! | [`server`] | HTTP API server |

pub mod config;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod retry;
pub mod server;
pub mod session;

use std::path::Path;

use anyhow::{Context, Result};
use ragdoc_core::pipeline::{IngestReport, Pipeline};
use tracing::warn;

use crate::config::Config;

/// Build a pipeline from the configured providers. Nothing is ingested yet.
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    if !config.embedding.is_enabled() {
        warn!("embedding.provider is \"disabled\"; ingestion will fail until a provider is configured");
    }
    let embedder = embedding::create_embedder(&config.embedding)
        .context("Failed to create embedding provider")?;
    let generator = generation::create_generator(&config.generation)
        .context("Failed to create generation provider")?;
    Ok(Pipeline::new(
        embedder,
        generator,
        config.prompt_builder(),
        config.pipeline_settings(),
    ))
}

/// Load the document at `path` and ingest it into `pipeline`.
pub async fn ingest_file(pipeline: &Pipeline, path: &Path) -> Result<IngestReport> {
    let document = extract::load_document(path)?;
    pipeline
        .ingest(document)
        .await
        .with_context(|| format!("Failed to ingest {}", path.display()))
}
