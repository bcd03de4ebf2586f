//! Embedding providers.
//!
//! Concrete [`Embedder`] implementations selected by `embedding.provider`:
//! - **[`DisabledEmbedder`]**: fails every call; the default until a provider is configured.
//! - **[`OpenAiEmbedder`]**: `POST {url}/embeddings` on an OpenAI-compatible API.
//! - **[`OllamaEmbedder`]**: `POST {url}/api/embed` on a local Ollama instance.
//! - **`LocalEmbedder`**: in-process fastembed models (feature `local-embeddings-fastembed`).
//!
//! Inputs are sent in `embedding.batch_size` slices; the HTTP providers
//! retry transient failures as described in [`crate::retry`].
//!
//! ```rust
//! # use ragdoc::config::EmbeddingConfig;
//! # use ragdoc::embedding::create_embedder;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "disabled");
//! ```

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use ragdoc_core::embedding::{check_vectors, Embedder};
use ragdoc_core::error::EmbeddingError;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::retry::{post_json, RetryPolicy};

pub const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

// ============ Disabled ============

/// Used when `embedding.provider = "disabled"`.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> Option<usize> {
        None
    }

    async fn embed_all(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Disabled)
    }
}

// ============ OpenAI ============

/// OpenAI-compatible embeddings endpoint.
///
/// Reads the API key from `OPENAI_API_KEY`.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dims: Option<usize>,
    batch_size: usize,
    policy: RetryPolicy,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let base = config.url.as_deref().unwrap_or(OPENAI_DEFAULT_URL);

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/embeddings", base.trim_end_matches('/')),
            api_key,
            model,
            dims: config.dims,
            batch_size: config.batch_size.max(1),
            policy: RetryPolicy::new(config.max_retries, config.timeout_secs),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> Option<usize> {
        self.dims
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = post_json(
                &self.client,
                &self.endpoint,
                Some(&self.api_key),
                &body,
                &self.policy,
                "openai-embeddings",
            )
            .await?;
            let vectors = parse_openai_response(&json)?;
            check_vectors(batch.len(), &vectors, self.dims)?;
            debug!(batch = batch.len(), "embedded batch");
            out.extend(vectors);
        }
        check_vectors(texts.len(), &out, self.dims)?;
        Ok(out)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| EmbeddingError::InvalidResponse("missing data array".to_string()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| EmbeddingError::InvalidResponse("missing embedding".to_string()))?;
        indexed.push((index, parse_vector(embedding)?));
    }
    indexed.sort_by_key(|(i, _)| *i);

    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama ============

/// Local Ollama instance (`ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dims: Option<usize>,
    batch_size: usize,
    policy: RetryPolicy,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let base = config.url.as_deref().unwrap_or(OLLAMA_DEFAULT_URL);

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/embed", base.trim_end_matches('/')),
            model,
            dims: config.dims,
            batch_size: config.batch_size.max(1),
            policy: RetryPolicy::new(config.max_retries, config.timeout_secs),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> Option<usize> {
        self.dims
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = post_json(
                &self.client,
                &self.endpoint,
                None,
                &body,
                &self.policy,
                "ollama-embed",
            )
            .await?;
            let vectors = parse_ollama_response(&json)?;
            check_vectors(batch.len(), &vectors, self.dims)?;
            out.extend(vectors);
        }
        check_vectors(texts.len(), &out, self.dims)?;
        Ok(out)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| EmbeddingError::InvalidResponse("missing embeddings array".to_string()))?
        .iter()
        .map(parse_vector)
        .collect()
}

fn parse_vector(value: &serde_json::Value) -> Result<Vec<f32>, EmbeddingError> {
    value
        .as_array()
        .ok_or_else(|| EmbeddingError::InvalidResponse("embedding is not an array".to_string()))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbeddingError::InvalidResponse(format!("non-numeric component: {}", v)))
        })
        .collect()
}

// ============ Local (fastembed) ============

#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalEmbedder;

#[cfg(feature = "local-embeddings-fastembed")]
mod local {
    use std::sync::{Arc, Mutex, PoisonError};

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use ragdoc_core::embedding::{check_vectors, Embedder};
    use ragdoc_core::error::EmbeddingError;

    use crate::config::EmbeddingConfig;

    /// In-process inference. The model is downloaded from Hugging Face on
    /// first use and cached; later runs need no network.
    pub struct LocalEmbedder {
        model_name: String,
        kind: fastembed::EmbeddingModel,
        dims: usize,
        batch_size: usize,
        model: Arc<Mutex<Option<fastembed::TextEmbedding>>>,
    }

    impl LocalEmbedder {
        pub fn new(config: &EmbeddingConfig) -> Result<Self> {
            let model_name = config
                .model
                .clone()
                .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
            let (kind, default_dims) = resolve(&model_name)?;
            Ok(Self {
                model_name,
                kind,
                dims: config.dims.unwrap_or(default_dims),
                batch_size: config.batch_size.max(1),
                model: Arc::new(Mutex::new(None)),
            })
        }
    }

    fn resolve(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
        use fastembed::EmbeddingModel::*;
        Ok(match name {
            "all-minilm-l6-v2" => (AllMiniLML6V2, 384),
            "bge-small-en-v1.5" => (BGESmallENV15, 384),
            "bge-base-en-v1.5" => (BGEBaseENV15, 768),
            "bge-large-en-v1.5" => (BGELargeENV15, 1024),
            "nomic-embed-text-v1.5" => (NomicEmbedTextV15, 768),
            "multilingual-e5-small" => (MultilingualE5Small, 384),
            "multilingual-e5-base" => (MultilingualE5Base, 768),
            other => bail!(
                "Unknown local embedding model: '{}'. Supported models: \
                 all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
                 nomic-embed-text-v1.5, multilingual-e5-small, multilingual-e5-base",
                other
            ),
        })
    }

    #[async_trait]
    impl Embedder for LocalEmbedder {
        fn model_name(&self) -> &str {
            &self.model_name
        }

        fn dims(&self) -> Option<usize> {
            Some(self.dims)
        }

        async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let slot = Arc::clone(&self.model);
            let kind = self.kind.clone();
            let batch_size = self.batch_size;
            let texts = texts.to_vec();
            let expected = texts.len();

            let vectors = tokio::task::spawn_blocking(move || {
                let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
                if guard.is_none() {
                    let model = fastembed::TextEmbedding::try_new(
                        fastembed::InitOptions::new(kind).with_show_download_progress(true),
                    )
                    .map_err(|e| EmbeddingError::Transport(format!("model init failed: {}", e)))?;
                    *guard = Some(model);
                }
                match guard.as_mut() {
                    Some(model) => model
                        .embed(texts, Some(batch_size))
                        .map_err(|e| EmbeddingError::InvalidResponse(e.to_string())),
                    None => Err(EmbeddingError::Transport("model unavailable".to_string())),
                }
            })
            .await
            .map_err(|e| EmbeddingError::Transport(e.to_string()))??;

            check_vectors(expected, &vectors, Some(self.dims))?;
            Ok(vectors)
        }
    }
}

/// Create the [`Embedder`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAiEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"local"` | `LocalEmbedder` (feature `local-embeddings-fastembed`) |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings-fastembed"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
