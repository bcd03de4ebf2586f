//! Generation providers.
//!
//! - **[`OpenAiGenerator`]**: `POST {url}/chat/completions`, non-streamed.
//! - **[`OllamaGenerator`]**: `POST {url}/api/chat` with `stream: false`.
//!
//! Both send exactly two messages (system, then user) and never any
//! conversation history.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use ragdoc_core::error::GenerationError;
use ragdoc_core::generation::{Generator, SamplingConfig};
use ragdoc_core::prompt::PromptMessages;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::embedding::{OLLAMA_DEFAULT_URL, OPENAI_DEFAULT_URL};
use crate::retry::{post_json, RetryPolicy};

fn chat_messages(messages: &PromptMessages) -> serde_json::Value {
    serde_json::json!([
        {"role": "system", "content": messages.system},
        {"role": "user", "content": messages.user},
    ])
}

fn non_empty(text: Option<&str>) -> Result<String, GenerationError> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t.to_string()),
        Some(_) => Err(GenerationError::EmptyResponse),
        None => Err(GenerationError::InvalidResponse(
            "missing message content".to_string(),
        )),
    }
}

// ============ OpenAI ============

pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    policy: RetryPolicy,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self::with_api_key(config, api_key))
    }

    pub fn with_api_key(config: &GenerationConfig, api_key: String) -> Self {
        let base = config.url.as_deref().unwrap_or(OPENAI_DEFAULT_URL);
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            policy: RetryPolicy::new(config.max_retries, config.timeout_secs),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        messages: &PromptMessages,
        sampling: &SamplingConfig,
    ) -> Result<String, GenerationError> {
        sampling.validate()?;
        let body = serde_json::json!({
            "model": self.model,
            "messages": chat_messages(messages),
            "temperature": sampling.temperature,
            "max_tokens": sampling.max_tokens,
            "top_p": sampling.top_p,
        });

        let json = post_json(
            &self.client,
            &self.endpoint,
            Some(&self.api_key),
            &body,
            &self.policy,
            "openai-chat",
        )
        .await?;

        debug!(model = %self.model, "completion received");
        non_empty(
            json.pointer("/choices/0/message/content")
                .and_then(|c| c.as_str()),
        )
    }
}

// ============ Ollama ============

pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    policy: RetryPolicy,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        let base = config.url.as_deref().unwrap_or(OLLAMA_DEFAULT_URL);
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/chat", base.trim_end_matches('/')),
            model: config.model.clone(),
            policy: RetryPolicy::new(config.max_retries, config.timeout_secs),
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        messages: &PromptMessages,
        sampling: &SamplingConfig,
    ) -> Result<String, GenerationError> {
        sampling.validate()?;
        let body = serde_json::json!({
            "model": self.model,
            "messages": chat_messages(messages),
            "stream": false,
            "options": {
                "temperature": sampling.temperature,
                "top_p": sampling.top_p,
                "num_predict": sampling.max_tokens,
            },
        });

        let json = post_json(
            &self.client,
            &self.endpoint,
            None,
            &body,
            &self.policy,
            "ollama-chat",
        )
        .await?;

        non_empty(json.pointer("/message/content").and_then(|c| c.as_str()))
    }
}

/// Create the [`Generator`] named by `config.provider` (`openai` or `ollama`).
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config))),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_messages_are_system_then_user() {
        let m = PromptMessages {
            system: "sys".to_string(),
            user: "usr".to_string(),
        };
        let v = chat_messages(&m);
        let arr = v.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["role"], "system");
        assert_eq!(arr[0]["content"], "sys");
        assert_eq!(arr[1]["role"], "user");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  hi \n")).unwrap(), "  hi \n");
        assert!(matches!(non_empty(Some("   ")), Err(GenerationError::EmptyResponse)));
        assert!(matches!(non_empty(None), Err(GenerationError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_invalid_sampling_rejected_before_request() {
        let config = GenerationConfig {
            provider: "ollama".to_string(),
            url: Some("http://127.0.0.1:1".to_string()),
            ..Default::default()
        };
        let g = OllamaGenerator::new(&config);
        let m = PromptMessages {
            system: "s".to_string(),
            user: "u".to_string(),
        };
        let bad = SamplingConfig {
            temperature: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            g.generate(&m, &bad).await,
            Err(GenerationError::InvalidSampling(_))
        ));
    }

    #[test]
    fn test_create_generator_dispatch() {
        let ollama = GenerationConfig {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            ..Default::default()
        };
        assert_eq!(create_generator(&ollama).unwrap().model_name(), "llama3.2");
        let bogus = GenerationConfig {
            provider: "bogus".to_string(),
            ..Default::default()
        };
        assert!(create_generator(&bogus).is_err());
    }
}
