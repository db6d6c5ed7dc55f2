//! Vector index abstraction.
//!
//! The [`VectorStore`] trait is the only thing the ingestion and answering
//! pipelines know about the index. Backends:
//!
//! | Backend | Type | Use |
//! |---------|------|-----|
//! | `pinecone` | [`PineconeStore`] | hosted index, production |
//! | `sqlite` | [`SqliteStore`] | local single-file index |
//! | `memory` | [`InMemoryStore`] | tests and dry runs |
//!
//! Upserts append: ingesting the same text twice stores it twice under
//! fresh ids. Queries return at most `k` hits, best first.

pub mod memory;
pub mod pinecone;
pub mod sqlite;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::models::{ScoredChunk, VectorRecord};

pub use memory::InMemoryStore;
pub use pinecone::PineconeStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the index this store writes to.
    fn index_name(&self) -> &str;

    /// Store records, returning how many were written.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// The `k` nearest chunks to `vector`, highest score first.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of vectors currently stored.
    async fn count(&self) -> Result<usize>;
}

/// Open the store selected by `index.backend`.
pub async fn create_store(config: &IndexConfig) -> Result<Arc<dyn VectorStore>> {
    match config.backend.as_str() {
        "pinecone" => Ok(Arc::new(PineconeStore::new(config)?)),
        "sqlite" => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("index.path required for the sqlite backend"))?;
            Ok(Arc::new(SqliteStore::open(path, &config.name).await?))
        }
        "memory" => Ok(Arc::new(InMemoryStore::new(&config.name))),
        other => bail!("Unknown index backend: {}", other),
    }
}

/// Sort hits best-first and keep the top `k`. Ties keep insertion order.
pub(crate) fn top_k(mut hits: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentChunk;

    fn hit(text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: DocumentChunk::new(text, "s"),
            score,
        }
    }

    #[test]
    fn test_top_k_orders_and_truncates() {
        let hits = vec![hit("a", 0.1), hit("b", 0.9), hit("c", 0.5), hit("d", 0.9)];
        let top = top_k(hits, 3);
        let texts: Vec<&str> = top.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "d", "c"]);
    }

    #[tokio::test]
    async fn test_create_memory_store() {
        let cfg: IndexConfig =
            toml::from_str("backend = \"memory\"\nname = \"docs\"").unwrap();
        let store = create_store(&cfg).await.unwrap();
        assert_eq!(store.index_name(), "docs");
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
