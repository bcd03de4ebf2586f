//! Generator trait and sampling configuration.
//!
//! A [`Generator`] sends one system message and one user message to an
//! external generative model and returns the complete answer text. No
//! conversation history is ever included: every answer is computed from the
//! fixed system prompt plus the current query's context.
//!
//! Concrete providers (OpenAI chat completions, Ollama chat) live in the
//! `ragdoc` app crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::prompt::PromptMessages;

/// Highest temperature accepted for fact-retrieval answers.
pub const MAX_TEMPERATURE: f32 = 0.3;

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Randomness of token selection; kept low so answers hew to the context.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Hard cap on answer length, in tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Nucleus-sampling probability mass.
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    500
}
fn default_top_p() -> f32 {
    0.7
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
        }
    }
}

impl SamplingConfig {
    /// Reject values outside the ranges suitable for grounded answering.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(GenerationError::InvalidSampling(format!(
                "temperature must be in [0.0, {}], got {}",
                MAX_TEMPERATURE, self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(GenerationError::InvalidSampling(format!(
                "top_p must be in (0.0, 1.0], got {}",
                self.top_p
            )));
        }
        if self.max_tokens == 0 {
            return Err(GenerationError::InvalidSampling(
                "max_tokens must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Produces answer text from an assembled prompt via an external model.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Send `[system, user]` in a single non-streamed request and return the
    /// completion text.
    async fn generate(
        &self,
        messages: &PromptMessages,
        sampling: &SamplingConfig,
    ) -> Result<String, GenerationError>;
}
