//! Deterministic in-process embedder and generator doubles for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::{EmbeddingError, GenerationError};
use crate::generation::{Generator, SamplingConfig};
use crate::prompt::{PromptMessages, CONTEXT_SEPARATOR_PREFIX};

/// Bag-of-words embedder over a fixed vocabulary.
///
/// Dimension `i` counts words starting with `vocab[i]`; one trailing bias
/// dimension keeps every vector non-zero.
pub struct KeywordEmbedder {
    vocab: Vec<String>,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocab: &[&str]) -> Self {
        Self {
            vocab: vocab.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let mut v: Vec<f32> = self
            .vocab
            .iter()
            .map(|term| words.iter().filter(|w| w.starts_with(term.as_str())).count() as f32)
            .collect();
        v.push(0.1);
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dims(&self) -> Option<usize> {
        Some(self.vocab.len() + 1)
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}

/// Embedder that always fails with a transport error.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }

    fn dims(&self) -> Option<usize> {
        None
    }

    async fn embed_all(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Transport("connection refused".to_string()))
    }
}

/// Generator that answers with the first context passage it was given, or
/// the not-found sentinel when the prompt carries no passages.
pub struct EchoGenerator {
    pub not_found: String,
    pub calls: AtomicUsize,
    pub last: Mutex<Option<PromptMessages>>,
}

impl EchoGenerator {
    pub fn new(not_found: &str) -> Self {
        Self {
            not_found: not_found.to_string(),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_messages(&self) -> Option<PromptMessages> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    fn model_name(&self) -> &str {
        "echo-test"
    }

    async fn generate(
        &self,
        messages: &PromptMessages,
        sampling: &SamplingConfig,
    ) -> Result<String, GenerationError> {
        sampling.validate()?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(messages.clone());

        let answer = messages
            .user
            .lines()
            .skip_while(|l| !l.starts_with(CONTEXT_SEPARATOR_PREFIX))
            .nth(1)
            .map(|l| l.trim().to_string())
            .unwrap_or_else(|| self.not_found.clone());
        Ok(answer)
    }
}

/// Generator that always fails with a service error.
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn generate(
        &self,
        _messages: &PromptMessages,
        _sampling: &SamplingConfig,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Service {
            status: 503,
            body: "model overloaded".to_string(),
        })
    }
}

/// Delegates to a [`KeywordEmbedder`] for the first `ok_calls` calls, then
/// fails every call with a timeout.
pub struct FlakyEmbedder {
    inner: KeywordEmbedder,
    ok_calls: usize,
    seen: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(vocab: &[&str], ok_calls: usize) -> Self {
        Self {
            inner: KeywordEmbedder::new(vocab),
            ok_calls,
            seen: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    fn model_name(&self) -> &str {
        "flaky-test"
    }

    fn dims(&self) -> Option<usize> {
        self.inner.dims()
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.seen.fetch_add(1, Ordering::SeqCst) < self.ok_calls {
            self.inner.embed_all(texts).await
        } else {
            Err(EmbeddingError::Timeout(std::time::Duration::from_secs(30)))
        }
    }
}
