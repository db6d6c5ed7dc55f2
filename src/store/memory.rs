//! In-memory [`VectorStore`] for tests and dry runs.
//!
//! Records live in a `Vec` behind a `std::sync::RwLock`. Queries are
//! brute-force cosine similarity.

use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{ScoredChunk, VectorRecord};

use super::{top_k, VectorStore};

pub struct InMemoryStore {
    name: String,
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Copy of everything stored, in insertion order.
    pub fn records(&self) -> Vec<VectorRecord> {
        self.records
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn index_name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let mut stored = self
            .records
            .write()
            .map_err(|_| anyhow::anyhow!("in-memory store lock poisoned"))?;
        let dims = stored
            .first()
            .map(|r| r.vector.len())
            .or_else(|| records.first().map(|r| r.vector.len()));
        if let Some(dims) = dims {
            if let Some(bad) = records.iter().find(|r| r.vector.len() != dims) {
                bail!(
                    "vector dimension mismatch: index '{}' holds {}-dimensional vectors, got {}",
                    self.name,
                    dims,
                    bad.vector.len()
                );
            }
        }
        stored.extend_from_slice(records);
        Ok(records.len())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let stored = self
            .records
            .read()
            .map_err(|_| anyhow::anyhow!("in-memory store lock poisoned"))?;
        if let Some(first) = stored.first() {
            if first.vector.len() != vector.len() {
                bail!(
                    "query vector has {} dimensions, index '{}' holds {}",
                    vector.len(),
                    self.name,
                    first.vector.len()
                );
            }
        }
        let hits = stored
            .iter()
            .map(|r| ScoredChunk {
                chunk: r.chunk.clone(),
                score: cosine_similarity(vector, &r.vector),
            })
            .collect();
        Ok(top_k(hits, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self
            .records
            .read()
            .map_err(|_| anyhow::anyhow!("in-memory store lock poisoned"))?
            .len())
    }
}
