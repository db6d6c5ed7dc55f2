mod common;

use std::fs;
use std::sync::Arc;

use docs_helper::config::DocsSourceConfig;
use docs_helper::ingest::Ingestor;
use docs_helper::models::RawDocument;
use docs_helper::rewrite::LocatorRewrite;
use docs_helper::sources::SourceDescriptor;
use docs_helper::store::{InMemoryStore, VectorStore};

use common::{splitter, FakeEmbedder};

#[tokio::test]
async fn test_single_short_document_becomes_one_rewritten_chunk() {
    let store = Arc::new(InMemoryStore::new("docs"));
    let ingestor = Ingestor::new(Arc::new(FakeEmbedder::default()), store.clone(), splitter())
        .with_rewrite(Some(LocatorRewrite::new("langchain-docs", "https:/")));

    let docs = vec![RawDocument::new(
        "langchain-docs/api.python.langchain.com/en/latest/chains.html",
        "Chains are sequences of calls.",
    )];
    let summary = ingestor.ingest_documents("docs", docs).await.unwrap();

    assert_eq!(summary.documents, 1);
    assert_eq!(summary.chunks, 1);
    assert_eq!(summary.upserted, 1);

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].chunk.text, "Chains are sequences of calls.");
    assert_eq!(
        records[0].chunk.source,
        "https://api.python.langchain.com/en/latest/chains.html"
    );
    assert_eq!(records[0].vector.len(), common::DIMS);
}

#[tokio::test]
async fn test_reingest_appends_duplicates() {
    let store = Arc::new(InMemoryStore::new("docs"));
    let ingestor = Ingestor::new(Arc::new(FakeEmbedder::default()), store.clone(), splitter());
    let docs = vec![
        RawDocument::new("a.html", "Agents pick tools."),
        RawDocument::new("b.html", "Retrievers fetch documents."),
    ];

    ingestor.ingest_documents("docs", docs.clone()).await.unwrap();
    ingestor.ingest_documents("docs", docs).await.unwrap();

    let records = store.records();
    assert_eq!(records.len(), 4);
    let texts: Vec<&str> = records.iter().map(|r| r.chunk.text.as_str()).collect();
    assert_eq!(texts.iter().filter(|t| **t == "Agents pick tools.").count(), 2);

    let mut ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_every_locator_is_rewritten_and_chunks_are_bounded() {
    let store = Arc::new(InMemoryStore::new("docs"));
    let ingestor = Ingestor::new(Arc::new(FakeEmbedder::default()), store.clone(), splitter())
        .with_rewrite(Some(LocatorRewrite::new("/srv/mirror", "https://docs.example")));

    let paragraph = "Retrieval augmented generation combines search with generation. ";
    let docs: Vec<RawDocument> = (0..5)
        .map(|i| {
            RawDocument::new(
                format!("/srv/mirror/section{}/page.html", i),
                paragraph.repeat(10 + i * 7),
            )
        })
        .collect();
    let summary = ingestor.ingest_documents("docs", docs).await.unwrap();
    assert!(summary.chunks > 5);

    for record in store.records() {
        assert!(record.chunk.source.starts_with("https://docs.example/section"));
        assert!(!record.chunk.source.contains("/srv/mirror"));
        assert!(record.chunk.text.chars().count() <= 600);
    }
}

#[tokio::test]
async fn test_empty_source_writes_nothing() {
    let store = Arc::new(InMemoryStore::new("docs"));
    let embedder = Arc::new(FakeEmbedder::default());
    let ingestor = Ingestor::new(embedder.clone(), store.clone(), splitter());

    let summary = ingestor.ingest_documents("docs", Vec::new()).await.unwrap();

    assert_eq!(summary.upserted, 0);
    assert_eq!(store.count().await.unwrap(), 0);
    assert_eq!(
        embedder
            .document_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn test_commit_per_document_keeps_earlier_documents() {
    let docs = vec![
        RawDocument::new("one.html", "First page."),
        RawDocument::new("two.html", "Second page."),
        RawDocument::new("three.html", "Third page."),
    ];

    let store = Arc::new(InMemoryStore::new("docs"));
    let ingestor = Ingestor::new(
        Arc::new(FakeEmbedder::failing_after(1)),
        store.clone(),
        splitter(),
    )
    .with_commit_per_document(true);
    assert!(ingestor.ingest_documents("docs", docs.clone()).await.is_err());
    assert_eq!(store.count().await.unwrap(), 1);

    // Without per-document commits the whole run is embedded before any write.
    let store = Arc::new(InMemoryStore::new("docs"));
    let ingestor = Ingestor::new(
        Arc::new(FakeEmbedder::failing_after(0)),
        store.clone(),
        splitter(),
    );
    assert!(ingestor.ingest_documents("docs", docs).await.is_err());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_ingest_docs_tree() {
    let tmp = tempfile::TempDir::new().unwrap();
    let root = tmp.path().join("langchain-docs");
    fs::create_dir_all(root.join("api.python.langchain.com/en/latest")).unwrap();
    fs::write(
        root.join("api.python.langchain.com/en/latest/chains.html"),
        r#"<html><head><title>Chains</title></head><body>
        <nav>Sidebar</nav>
        <div role="main"><h1>Chains</h1><p>Chains are sequences of calls.</p></div>
        </body></html>"#,
    )
    .unwrap();
    fs::write(
        root.join("api.python.langchain.com/en/latest/agents.html"),
        "<html><body><main><p>Agents decide which tool to call.</p></main></body></html>",
    )
    .unwrap();

    let store = Arc::new(InMemoryStore::new("docs"));
    let ingestor = Ingestor::new(Arc::new(FakeEmbedder::default()), store.clone(), splitter())
        .with_rewrite(Some(LocatorRewrite::new(
            root.to_string_lossy().to_string(),
            "https:/",
        )));

    let source = SourceDescriptor::Docs(DocsSourceConfig {
        root: root.clone(),
        include_globs: vec!["**/*.html".to_string()],
        exclude_globs: vec![],
        follow_symlinks: false,
    });
    let summary = ingestor.ingest(&source).await.unwrap();
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.upserted, 2);

    let mut sources: Vec<String> = store
        .records()
        .into_iter()
        .map(|r| r.chunk.source)
        .collect();
    sources.sort();
    assert_eq!(
        sources,
        vec![
            "https://api.python.langchain.com/en/latest/agents.html",
            "https://api.python.langchain.com/en/latest/chains.html",
        ]
    );

    let chains = store
        .records()
        .into_iter()
        .find(|r| r.chunk.source.ends_with("chains.html"))
        .unwrap();
    assert_eq!(chains.chunk.text, "Chains\n\nChains are sequences of calls.");
    assert_eq!(chains.chunk.metadata["title"], "Chains");
    assert!(!chains.chunk.text.contains("Sidebar"));
}
