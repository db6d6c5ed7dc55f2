//! The answering pipeline: retrieve, then compose.
//!
//! One call to [`AnsweringPipeline::answer`] is a fixed sequence of awaited
//! external calls (optional rephrase, query embedding, index query, answer
//! generation). Nothing is retried and no context is added to errors, so a
//! failure surfaces to the caller exactly as the failing client reported it.

use anyhow::Result;
use std::sync::Arc;

use crate::clients::Clients;
use crate::composer::AnswerComposer;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::llm::ChatModel;
use crate::models::{AnswerRecord, ConversationTurn};
use crate::retriever::{HistoryAwareRetriever, VectorStoreRetriever};
use crate::store::VectorStore;

pub struct AnsweringPipeline {
    retriever: HistoryAwareRetriever,
    composer: AnswerComposer,
}

impl AnsweringPipeline {
    pub fn new(retriever: HistoryAwareRetriever, composer: AnswerComposer) -> Self {
        Self {
            retriever,
            composer,
        }
    }

    /// Wire the pipeline from configuration and already-built clients.
    pub fn from_config(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        let search = VectorStoreRetriever::new(embedder, store, config.retrieval.k)
            .with_score_threshold(config.retrieval.score_threshold);
        let retriever = HistoryAwareRetriever::new(Arc::clone(&llm), search)
            .with_prompt(config.prompts.rephrase_template()?)
            .with_temperature(config.llm.temperature)
            .with_max_tokens(config.llm.max_tokens);
        let composer = AnswerComposer::new(llm)
            .with_prompt(config.prompts.answer_template()?)
            .with_temperature(config.llm.temperature)
            .with_max_tokens(config.llm.max_tokens);
        Ok(Self::new(retriever, composer))
    }

    pub fn from_clients(config: &Config, clients: &Clients) -> Result<Self> {
        Self::from_config(
            config,
            Arc::clone(&clients.embedder),
            Arc::clone(&clients.store),
            Arc::clone(&clients.llm),
        )
    }

    /// Answer `query` in the context of `history` (oldest turn first).
    pub async fn answer(&self, query: &str, history: &[ConversationTurn]) -> Result<AnswerRecord> {
        let (standalone_query, retrieved) = self.retriever.retrieve(query, history).await?;
        let result = self.composer.compose(&standalone_query, &retrieved).await?;
        Ok(AnswerRecord {
            query: query.to_string(),
            result,
            standalone_query,
            source_documents: retrieved.into_iter().map(|h| h.chunk).collect(),
        })
    }
}
