//! Local single-file [`VectorStore`] on SQLite.
//!
//! Vectors are stored as little-endian f32 BLOBs alongside the chunk text
//! and metadata. Queries scan every row of the index and rank by cosine
//! similarity, which is fine for documentation-sized corpora.

use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::migrate;
use crate::models::{DocumentChunk, ScoredChunk, VectorRecord};

use super::{top_k, VectorStore};

pub struct SqliteStore {
    pool: SqlitePool,
    name: String,
}

impl SqliteStore {
    /// Open the database at `path`, creating the schema if needed.
    pub async fn open(path: &Path, index_name: &str) -> Result<Self> {
        let pool = db::connect(path)
            .await
            .with_context(|| format!("Failed to open index database {}", path.display()))?;
        migrate::run_migrations(&pool).await?;
        Ok(Self {
            pool,
            name: index_name.to_string(),
        })
    }

    async fn stored_dims(&self) -> Result<Option<usize>> {
        let dims: Option<i64> =
            sqlx::query_scalar("SELECT dims FROM vectors WHERE index_name = ? LIMIT 1")
                .bind(&self.name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(dims.map(|d| d as usize))
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    fn index_name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let dims = match self.stored_dims().await? {
            Some(d) => d,
            None => records[0].vector.len(),
        };
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dims) {
            bail!(
                "vector dimension mismatch: index '{}' holds {}-dimensional vectors, got {}",
                self.name,
                dims,
                bad.vector.len()
            );
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        for r in records {
            let metadata_json = serde_json::to_string(&r.chunk.metadata)?;
            sqlx::query(
                "INSERT OR REPLACE INTO vectors \
                 (id, index_name, source, text, metadata_json, dims, vector, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&r.id)
            .bind(&self.name)
            .bind(&r.chunk.source)
            .bind(&r.chunk.text)
            .bind(&metadata_json)
            .bind(r.vector.len() as i64)
            .bind(vec_to_blob(&r.vector))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(records.len())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if let Some(dims) = self.stored_dims().await? {
            if dims != vector.len() {
                bail!(
                    "query vector has {} dimensions, index '{}' holds {}",
                    vector.len(),
                    self.name,
                    dims
                );
            }
        }

        let rows = sqlx::query(
            "SELECT source, text, metadata_json, vector FROM vectors \
             WHERE index_name = ? ORDER BY created_at, rowid",
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let metadata_json: String = row.get("metadata_json");
            let metadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("corrupt metadata in index '{}'", self.name))?;
            let blob: Vec<u8> = row.get("vector");
            let chunk = DocumentChunk {
                text: row.get("text"),
                source: row.get("source"),
                metadata,
            };
            hits.push(ScoredChunk {
                score: cosine_similarity(vector, &blob_to_vec(&blob)),
                chunk,
            });
        }

        Ok(top_k(hits, k))
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors WHERE index_name = ?")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }
}
