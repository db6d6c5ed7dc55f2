//! Ingestion pipeline orchestration.
//!
//! connector → split → rewrite locators → embed → upsert.
//!
//! Ingestion always appends: every chunk gets a fresh UUID, so ingesting the
//! same tree twice stores every chunk twice. Runs are not transactional. By
//! default all chunks of a run are embedded before a single upsert; with
//! `commit_per_document` each document is embedded and upserted before the
//! next one, so a failure part way through keeps the earlier documents.

use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use crate::chunk::TextSplitter;
use crate::embedding::Embedder;
use crate::models::{DocumentChunk, RawDocument, VectorRecord};
use crate::progress::{IngestProgressEvent, IngestProgressReporter, NoProgress};
use crate::rewrite::LocatorRewrite;
use crate::sources::SourceDescriptor;
use crate::store::VectorStore;
use crate::traits::Connector;

/// Counts for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub documents: usize,
    pub chunks: usize,
    /// Chunks written to the index.
    pub upserted: usize,
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    splitter: TextSplitter,
    rewrite: Option<LocatorRewrite>,
    batch_size: usize,
    commit_per_document: bool,
    progress: Box<dyn IngestProgressReporter>,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            embedder,
            store,
            splitter,
            rewrite: None,
            batch_size: 64,
            commit_per_document: false,
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_rewrite(mut self, rewrite: Option<LocatorRewrite>) -> Self {
        self.rewrite = rewrite;
        self
    }

    /// Number of chunks sent to the embedder per call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_commit_per_document(mut self, enabled: bool) -> Self {
        self.commit_per_document = enabled;
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn IngestProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Ingest a configured source.
    pub async fn ingest(&self, source: &SourceDescriptor) -> Result<IngestSummary> {
        let connector = source.connector()?;
        self.ingest_from(connector.as_ref()).await
    }

    /// Ingest everything a connector yields.
    pub async fn ingest_from(&self, connector: &dyn Connector) -> Result<IngestSummary> {
        self.progress.report(IngestProgressEvent::Discovering {
            source: connector.name().to_string(),
        });
        let docs = connector.scan().await?;
        self.ingest_documents(connector.name(), docs).await
    }

    /// Split, rewrite, embed and upsert already-loaded documents.
    pub async fn ingest_documents(
        &self,
        label: &str,
        docs: Vec<RawDocument>,
    ) -> Result<IngestSummary> {
        let mut summary = IngestSummary {
            documents: docs.len(),
            ..Default::default()
        };

        let groups = self.plan_by_document(&docs);
        summary.chunks = groups.iter().map(Vec::len).sum();
        self.progress.report(IngestProgressEvent::Loaded {
            source: label.to_string(),
            documents: docs.len() as u64,
            chunks: summary.chunks as u64,
        });

        if self.commit_per_document {
            for chunks in groups {
                summary.upserted += self.embed_and_upsert(chunks).await?;
                self.progress.report(IngestProgressEvent::Upserting {
                    source: label.to_string(),
                    n: summary.upserted as u64,
                    total: summary.chunks as u64,
                });
            }
        } else {
            let chunks = groups.into_iter().flatten().collect();
            summary.upserted = self.embed_and_upsert(chunks).await?;
            self.progress.report(IngestProgressEvent::Upserting {
                source: label.to_string(),
                n: summary.upserted as u64,
                total: summary.chunks as u64,
            });
        }

        tracing::info!(
            source = label,
            index = self.store.index_name(),
            documents = summary.documents,
            chunks = summary.chunks,
            upserted = summary.upserted,
            "ingestion finished"
        );
        Ok(summary)
    }

    /// The chunks that would be written for `docs`, without touching the index.
    pub fn plan(&self, docs: &[RawDocument]) -> Vec<DocumentChunk> {
        self.plan_by_document(docs).into_iter().flatten().collect()
    }

    /// Planned chunks grouped per document, all stamped with one `ingested_at`.
    fn plan_by_document(&self, docs: &[RawDocument]) -> Vec<Vec<DocumentChunk>> {
        let now = chrono::Utc::now().to_rfc3339();
        docs.iter()
            .map(|doc| {
                let mut chunks = self.splitter.split_document(doc);
                if let Some(rw) = &self.rewrite {
                    rw.apply_all(&mut chunks);
                }
                for chunk in &mut chunks {
                    chunk
                        .metadata
                        .insert("ingested_at".to_string(), now.clone().into());
                }
                chunks
            })
            .collect()
    }

    async fn embed_and_upsert(&self, chunks: Vec<DocumentChunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_documents(&texts).await?;
            for (chunk, vector) in batch.iter().zip(vectors) {
                records.push(VectorRecord {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    chunk: chunk.clone(),
                });
            }
        }

        self.store.upsert(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DisabledEmbedder;
    use crate::store::InMemoryStore;

    fn ingestor() -> Ingestor {
        Ingestor::new(
            Arc::new(DisabledEmbedder),
            Arc::new(InMemoryStore::new("t")),
            TextSplitter::new(600, 50).unwrap(),
        )
        .with_rewrite(Some(LocatorRewrite::new("mirror", "https:/")))
    }

    #[test]
    fn test_plan_rewrites_and_stamps() {
        let docs = vec![RawDocument::new("mirror/docs.example/a.html", "Short page.").with_title("A")];
        let chunks = ingestor().plan(&docs);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source, "https://docs.example/a.html");
        assert_eq!(chunks[0].metadata["title"], "A");
        assert!(chunks[0].metadata.contains_key("ingested_at"));
        assert!(chunks[0].metadata.contains_key("hash"));
    }

    #[tokio::test]
    async fn test_empty_source_skips_embedding() {
        // The disabled embedder would fail if it were called.
        let summary = ingestor().ingest_documents("t", Vec::new()).await.unwrap();
        assert_eq!(summary, IngestSummary::default());
    }

    #[tokio::test]
    async fn test_embedding_errors_propagate() {
        let docs = vec![RawDocument::new("a", "text")];
        assert!(ingestor().ingest_documents("t", docs).await.is_err());
    }

    struct ConstEmbedder;

    #[async_trait::async_trait]
    impl Embedder for ConstEmbedder {
        fn model_name(&self) -> &str {
            "const"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[derive(Default)]
    struct Recorder(std::sync::Mutex<Vec<IngestProgressEvent>>);

    impl IngestProgressReporter for Arc<Recorder> {
        fn report(&self, event: IngestProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn test_per_document_commit_plans_once() {
        let store = Arc::new(InMemoryStore::new("t"));
        let events = Arc::new(Recorder::default());
        let ingestor = Ingestor::new(
            Arc::new(ConstEmbedder),
            store.clone(),
            TextSplitter::new(20, 4).unwrap(),
        )
        .with_commit_per_document(true)
        .with_progress(Box::new(events.clone()));

        let docs = vec![
            RawDocument::new("a", "alpha beta gamma delta epsilon zeta eta"),
            RawDocument::new("b", "one two"),
            RawDocument::new("c", "theta iota kappa lambda mu nu xi omicron"),
        ];
        let groups = ingestor.plan_by_document(&docs);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[1].len(), 1);
        assert!(groups[0].iter().all(|c| c.source == "a"));

        let summary = ingestor.ingest_documents("t", docs).await.unwrap();
        let records = store.records();
        assert_eq!(records.len(), summary.chunks);
        assert_eq!(summary.upserted, summary.chunks);

        let stamp = &records[0].chunk.metadata["ingested_at"];
        assert!(records
            .iter()
            .all(|r| &r.chunk.metadata["ingested_at"] == stamp));

        let events = events.0.lock().unwrap();
        let loaded: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, IngestProgressEvent::Loaded { .. }))
            .collect();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            *loaded[0],
            IngestProgressEvent::Loaded {
                source: "t".to_string(),
                documents: 3,
                chunks: summary.chunks as u64,
            }
        );
        assert_eq!(events.len(), 1 + 3);
    }
}
