//! Retrieval: plain vector search and the history-aware wrapper.
//!
//! Without history the caller's query is embedded verbatim. With history the
//! chat model first rewrites the follow-up into a standalone question using
//! the rephrase template, and that question is what gets embedded.

use anyhow::Result;
use std::sync::Arc;

use crate::embedding::Embedder;
use crate::llm::{ChatModel, CompletionRequest};
use crate::models::{ConversationTurn, ScoredChunk};
use crate::prompts::{format_history, PromptTemplate};
use crate::store::VectorStore;

/// Embeds a query and returns the `k` nearest chunks.
#[derive(Clone)]
pub struct VectorStoreRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    k: usize,
    score_threshold: Option<f32>,
}

impl VectorStoreRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, k: usize) -> Self {
        Self {
            embedder,
            store,
            k,
            score_threshold: None,
        }
    }

    /// Drop hits scoring below `threshold`.
    pub fn with_score_threshold(mut self, threshold: Option<f32>) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub async fn search(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let vector = self.embedder.embed_query(query).await?;
        let mut hits = self.store.query(&vector, self.k).await?;
        if let Some(threshold) = self.score_threshold {
            hits.retain(|h| h.score >= threshold);
        }
        tracing::debug!(
            index = self.store.index_name(),
            k = self.k,
            hits = hits.len(),
            "vector search"
        );
        Ok(hits)
    }
}

/// Rewrites follow-up questions against chat history before searching.
pub struct HistoryAwareRetriever {
    llm: Arc<dyn ChatModel>,
    retriever: VectorStoreRetriever,
    prompt: PromptTemplate,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl HistoryAwareRetriever {
    pub fn new(llm: Arc<dyn ChatModel>, retriever: VectorStoreRetriever) -> Self {
        Self {
            llm,
            retriever,
            prompt: PromptTemplate::rephrase(),
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

    /// The query used for retrieval: `query` itself when there is no history.
    pub async fn standalone_query(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<String> {
        if history.is_empty() {
            return Ok(query.to_string());
        }

        let chat_history = format_history(history);
        let prompt = self
            .prompt
            .render(&[("chat_history", chat_history.as_str()), ("input", query)])?;
        let rewritten = self
            .llm
            .complete(CompletionRequest {
                prompt: &prompt,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            })
            .await?;

        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            tracing::warn!("query rewrite came back empty; searching with the original query");
            return Ok(query.to_string());
        }
        tracing::debug!(original = query, standalone = rewritten, "rewrote follow-up");
        Ok(rewritten.to_string())
    }

    /// Returns the standalone query and the chunks retrieved for it.
    pub async fn retrieve(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<(String, Vec<ScoredChunk>)> {
        let standalone = self.standalone_query(query, history).await?;
        let hits = self.retriever.search(&standalone).await?;
        Ok((standalone, hits))
    }
}
