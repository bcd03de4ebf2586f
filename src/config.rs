//! TOML configuration.
//!
//! Every section except `[document]` is optional and falls back to the
//! defaults below. A minimal config:
//!
//! ```toml
//! [document]
//! path = "./docs/handbook.pdf"
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use ragdoc_core::generation::SamplingConfig;
use ragdoc_core::index::Metric;
use ragdoc_core::pipeline::PipelineSettings;
use ragdoc_core::prompt::{PromptBuilder, DEFAULT_NOT_FOUND};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub document: DocumentConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    3000
}
fn default_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Hard filter: passages scoring below this are dropped. Unset = keep all.
    #[serde(default)]
    pub score_threshold: Option<f32>,
    #[serde(default)]
    pub metric: Metric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_threshold: None,
            metric: Metric::default(),
        }
    }
}

fn default_top_k() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (defaults per provider).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub sampling: SamplingConfig,
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            url: None,
            sampling: SamplingConfig::default(),
            max_retries: default_generation_retries(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "openai".to_string()
}
fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_generation_retries() -> u32 {
    3
}
fn default_generation_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    /// Replaces the built-in system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_not_found")]
    pub not_found: String,
    /// Ask the model with an empty-context prompt when no passage was
    /// retrieved. When false, the `not_found` sentence is returned directly.
    #[serde(default = "default_generate_without_context")]
    pub generate_without_context: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            not_found: default_not_found(),
            generate_without_context: default_generate_without_context(),
        }
    }
}

fn default_generate_without_context() -> bool {
    true
}
fn default_not_found() -> String {
    DEFAULT_NOT_FOUND.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Turns kept in a chat session before the oldest are dropped.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

fn default_max_turns() -> usize {
    50
}

impl Config {
    /// Pipeline tuning derived from the chunking, retrieval, generation and
    /// prompt sections.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            chunk_size: self.chunking.chunk_size,
            overlap: self.chunking.overlap,
            top_k: self.retrieval.top_k,
            score_threshold: self.retrieval.score_threshold,
            metric: self.retrieval.metric,
            sampling: self.generation.sampling,
            generate_without_context: self.prompt.generate_without_context,
        }
    }

    pub fn prompt_builder(&self) -> PromptBuilder {
        let builder = PromptBuilder::new(self.prompt.not_found.clone());
        match &self.prompt.system_prompt {
            Some(system) => builder.with_system_prompt(system.clone()),
            None => builder,
        }
    }
}

/// Read, parse and validate a config file.
///
/// A relative `document.path` is resolved against the config file's
/// directory.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;

    if config.document.path.is_relative() {
        if let Some(dir) = path.parent() {
            config.document.path = dir.join(&config.document.path);
        }
    }

    Ok(config)
}

/// Parse and validate config TOML.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        bail!(
            "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }
    if let Some(t) = config.retrieval.score_threshold {
        if !t.is_finite() {
            bail!("retrieval.score_threshold must be a finite number");
        }
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0 when set");
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    // Validate generation
    match config.generation.provider.as_str() {
        "openai" | "ollama" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be openai or ollama.",
            other
        ),
    }
    config
        .generation
        .sampling
        .validate()
        .map_err(|e| anyhow::anyhow!("generation: {}", e))?;

    if config.prompt.not_found.trim().is_empty() {
        bail!("prompt.not_found must not be empty");
    }

    if config.session.max_turns == 0 {
        bail!("session.max_turns must be > 0");
    }

    Ok(())
}
