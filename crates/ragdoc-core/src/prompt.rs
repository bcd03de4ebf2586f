//! Prompt assembly for context-grounded answers.
//!
//! Every generation call carries exactly two messages: a fixed system
//! instruction and a user message that embeds the retrieved passages and
//! the question. Both state the same answer policy:
//!
//! 1. Answer only from the supplied context.
//! 2. If the context covers the question only partly, give what it has.
//! 3. If nothing in the context is relevant, reply with the not-found
//!    sentinel and nothing else.

use serde::Serialize;

use crate::models::RetrievedContext;

/// Reply the model must give when the context has nothing relevant.
pub const DEFAULT_NOT_FOUND: &str = "No relevant information found.";

/// Prefix of the separator line that precedes each passage.
pub const CONTEXT_SEPARATOR_PREFIX: &str = "--- Context Part";

/// The system and user messages for one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessages {
    pub system: String,
    pub user: String,
}

/// The default system instruction, parameterized by the sentinel phrase.
pub fn default_system_prompt(not_found: &str) -> String {
    format!(
        "You are an assistant that answers questions about a single document.\n\
         Follow these rules:\n\
         1. Answer only from the provided context.\n\
         2. If the context does not fully answer the question, give the partial information it contains.\n\
         3. If the context contains nothing relevant, reply exactly: \"{not_found}\"\n\
         4. Keep answers short and clear."
    )
}

/// Render retrieved passages, each under a numbered separator, in the order
/// given.
pub fn render_context(context: &RetrievedContext) -> String {
    context
        .hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("{} {} ---\n{}", CONTEXT_SEPARATOR_PREFIX, i + 1, hit.chunk.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the system and user messages for a query.
///
/// Pure: the output depends only on the arguments.
pub fn build(system_prompt: &str, context: &RetrievedContext, query: &str, not_found: &str) -> PromptMessages {
    let user = format!(
        "Context:\n\
         {context}\n\
         \n\
         Answer the question accurately and concisely using the context:\n\
         {query}\n\
         \n\
         Answering rules:\n\
         - Rely only on information in the context.\n\
         - If the context does not contain a complete answer, explain the part that is available.\n\
         - If nothing in the context is relevant, reply exactly: \"{not_found}\"",
        context = render_context(context),
        query = query.trim(),
        not_found = not_found,
    );

    PromptMessages {
        system: system_prompt.to_string(),
        user,
    }
}

/// Holds the system prompt and sentinel used for every query.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
    not_found: String,
}

impl PromptBuilder {
    /// Builder with the default system prompt for `not_found`.
    pub fn new(not_found: impl Into<String>) -> Self {
        let not_found = not_found.into();
        Self {
            system_prompt: default_system_prompt(&not_found),
            not_found,
        }
    }

    /// Replace the system prompt. The sentinel is unchanged.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn not_found(&self) -> &str {
        &self.not_found
    }

    pub fn build(&self, context: &RetrievedContext, query: &str) -> PromptMessages {
        build(&self.system_prompt, context, query, &self.not_found)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_NOT_FOUND)
    }
}
