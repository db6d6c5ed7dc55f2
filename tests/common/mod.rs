//! In-process fakes for the external services.
#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use docs_helper::chunk::TextSplitter;
use docs_helper::embedding::Embedder;
use docs_helper::llm::{ChatModel, CompletionRequest};
use docs_helper::models::{DocumentChunk, VectorRecord};
use docs_helper::store::{InMemoryStore, VectorStore};

pub const DIMS: usize = 64;

/// Deterministic hashed bag-of-words embedder. Records every query.
#[derive(Default)]
pub struct FakeEmbedder {
    pub queries: Mutex<Vec<String>>,
    pub document_calls: AtomicUsize,
    /// Fail every `embed_documents` call after this many successful ones.
    pub fail_after: Option<usize>,
}

impl FakeEmbedder {
    pub fn failing_after(calls: usize) -> Self {
        Self {
            fail_after: Some(calls),
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

pub fn embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let token = token.to_lowercase();
        let mut h: u64 = 1469598103934665603;
        for b in token.bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(1099511628211);
        }
        v[(h % DIMS as u64) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake-embedder"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let done = self.document_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if done >= limit {
                bail!("embedding service unavailable");
            }
        }
        Ok(texts.iter().map(|t| embed(t)).collect())
    }
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.queries.lock().unwrap().push(text.to_string());
        Ok(embed(text))
    }
}

/// Chat model that answers rephrase prompts with `rewrite` and everything
/// else with `answer`. Records every prompt.
pub struct FakeChat {
    pub rewrite: String,
    pub answer: String,
    pub fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeChat {
    pub fn new(rewrite: &str, answer: &str) -> Self {
        Self {
            rewrite: rewrite.to_string(),
            answer: answer.to_string(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("", "")
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    fn model_name(&self) -> &str {
        "fake-chat"
    }
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        if self.fail {
            bail!("model quota exceeded");
        }
        if request.prompt.contains("Standalone Question:") {
            Ok(self.rewrite.clone())
        } else {
            Ok(self.answer.clone())
        }
    }
}

pub fn splitter() -> TextSplitter {
    TextSplitter::new(600, 50).unwrap()
}

/// An in-memory store pre-loaded with `(text, source)` chunks.
pub async fn seeded_store(chunks: &[(&str, &str)]) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new("test-index"));
    let records: Vec<VectorRecord> = chunks
        .iter()
        .enumerate()
        .map(|(i, (text, source))| VectorRecord {
            id: format!("seed-{}", i),
            vector: embed(text),
            chunk: DocumentChunk::new(*text, *source),
        })
        .collect();
    store.upsert(&records).await.unwrap();
    store
}
