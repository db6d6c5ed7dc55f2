//! Answer generation from retrieved context.

use anyhow::Result;
use std::sync::Arc;

use crate::llm::{ChatModel, CompletionRequest};
use crate::models::ScoredChunk;
use crate::prompts::PromptTemplate;

/// Separator between chunk texts in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

pub struct AnswerComposer {
    llm: Arc<dyn ChatModel>,
    prompt: PromptTemplate,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl AnswerComposer {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self {
            llm,
            prompt: PromptTemplate::answer(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Render the answer prompt: chunk texts in ranked order, then the question.
    pub fn build_prompt(&self, query: &str, retrieved: &[ScoredChunk]) -> Result<String> {
        let context = retrieved
            .iter()
            .map(|h| h.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        self.prompt.render(&[("context", context.as_str()), ("input", query)])
    }

    /// One model call. The answer is returned exactly as generated.
    pub async fn compose(&self, query: &str, retrieved: &[ScoredChunk]) -> Result<String> {
        if retrieved.is_empty() {
            tracing::warn!(query, "no context retrieved; answering from an empty context");
        }
        let prompt = self.build_prompt(query, retrieved)?;
        self.llm
            .complete(CompletionRequest {
                prompt: &prompt,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            })
            .await
    }
}
