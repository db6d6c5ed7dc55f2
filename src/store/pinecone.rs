//! Hosted [`VectorStore`] backed by a Pinecone serverless index.
//!
//! Talks to the index's data-plane host directly (`index.host`). Each vector
//! carries the chunk text under `metadata.text` and the locator under
//! `metadata.source`, so a query returns everything needed to rebuild a
//! [`DocumentChunk`] without a second lookup.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::IndexConfig;
use crate::http;
use crate::models::{DocumentChunk, ScoredChunk, VectorRecord};

use super::VectorStore;

const API_VERSION: &str = "2024-07";

pub struct PineconeStore {
    name: String,
    host: String,
    namespace: Option<String>,
    api_key: String,
    batch_size: usize,
    max_retries: u32,
    client: reqwest::Client,
}

impl PineconeStore {
    /// Requires `index.host` and `PINECONE_API_KEY`.
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let host = config
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| anyhow::anyhow!("index.host required for the pinecone backend"))?;
        Ok(Self {
            name: config.name.clone(),
            host: normalize_host(host),
            namespace: config.namespace.clone(),
            api_key: http::require_env("PINECONE_API_KEY")?,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.host, path);
        http::send_json("Pinecone", self.max_retries, || {
            self.client
                .post(&url)
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .json(body)
        })
        .await
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn index_name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let mut written = 0;
        for batch in records.chunks(self.batch_size) {
            let vectors: Vec<Value> = batch
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.id,
                        "values": r.vector,
                        "metadata": to_pinecone_metadata(&r.chunk),
                    })
                })
                .collect();
            let mut body = serde_json::json!({ "vectors": vectors });
            if let Some(ns) = &self.namespace {
                body["namespace"] = Value::String(ns.clone());
            }
            let resp = self.post("/vectors/upsert", &body).await?;
            written += resp
                .get("upsertedCount")
                .and_then(|c| c.as_u64())
                .map(|c| c as usize)
                .unwrap_or(batch.len());
            tracing::debug!(index = %self.name, batch = batch.len(), "upserted batch");
        }
        Ok(written)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let mut body = serde_json::json!({
            "vector": vector,
            "topK": k,
            "includeMetadata": true,
            "includeValues": false,
        });
        if let Some(ns) = &self.namespace {
            body["namespace"] = Value::String(ns.clone());
        }
        let resp = self.post("/query", &body).await?;
        parse_query_response(&resp)
    }

    async fn count(&self) -> Result<usize> {
        let resp = self
            .post("/describe_index_stats", &serde_json::json!({}))
            .await?;
        let count = match &self.namespace {
            Some(ns) => resp
                .get("namespaces")
                .and_then(|n| n.get(ns))
                .and_then(|n| n.get("vectorCount"))
                .and_then(|c| c.as_u64())
                .unwrap_or(0),
            None => resp
                .get("totalVectorCount")
                .and_then(|c| c.as_u64())
                .unwrap_or(0),
        };
        Ok(count as usize)
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Flatten a chunk into Pinecone metadata.
///
/// Pinecone accepts strings, numbers, booleans and string lists. Other
/// values are stored as their JSON text.
fn to_pinecone_metadata(chunk: &DocumentChunk) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in &chunk.metadata {
        let flat = match value {
            Value::Null => continue,
            Value::String(_) | Value::Number(_) | Value::Bool(_) => value.clone(),
            Value::Array(items) if items.iter().all(|v| v.is_string()) => value.clone(),
            other => Value::String(other.to_string()),
        };
        out.insert(key.clone(), flat);
    }
    out.insert("text".to_string(), Value::String(chunk.text.clone()));
    out.insert("source".to_string(), Value::String(chunk.source.clone()));
    out
}

fn parse_query_response(json: &Value) -> Result<Vec<ScoredChunk>> {
    let matches = match json.get("matches") {
        Some(Value::Array(m)) => m,
        Some(_) => bail!("Invalid Pinecone response: matches is not an array"),
        None => return Ok(Vec::new()),
    };

    let mut hits = Vec::with_capacity(matches.len());
    for m in matches {
        let score = m.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32;
        let mut metadata = m
            .get("metadata")
            .and_then(|md| md.as_object())
            .cloned()
            .unwrap_or_default();
        let text = match metadata.remove("text") {
            Some(Value::String(t)) => t,
            _ => bail!("Invalid Pinecone response: match without metadata.text"),
        };
        let source = match metadata.remove("source") {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        hits.push(ScoredChunk {
            chunk: DocumentChunk {
                text,
                source,
                metadata,
            },
            score,
        });
    }
    Ok(hits)
}
