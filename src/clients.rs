//! Construction of the external-service clients from configuration.
//!
//! Clients are built once at startup and shared through `Arc`. Missing
//! credentials or invalid provider settings fail here, before any query runs.

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::llm::{create_chat_model, ChatModel};
use crate::store::{create_store, VectorStore};

#[derive(Clone)]
pub struct Clients {
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub llm: Arc<dyn ChatModel>,
}

impl Clients {
    /// Everything the answering pipeline needs.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let (embedder, store) = ingest_clients(config).await?;
        let llm = create_chat_model(&config.llm)?;
        tracing::debug!(
            embedder = embedder.model_name(),
            llm = llm.model_name(),
            index = store.index_name(),
            "clients ready"
        );
        Ok(Self {
            embedder,
            store,
            llm,
        })
    }
}

/// The embedder and store, for ingestion (no chat model needed).
pub async fn ingest_clients(config: &Config) -> Result<(Arc<dyn Embedder>, Arc<dyn VectorStore>)> {
    let embedder = create_embedder(&config.embedding)?;
    let store = create_store(&config.index).await?;
    Ok((embedder, store))
}
