mod common;

use std::sync::Arc;

use docs_helper::composer::AnswerComposer;
use docs_helper::pipeline::AnsweringPipeline;
use docs_helper::retriever::{HistoryAwareRetriever, VectorStoreRetriever};
use docs_helper::server::router;

use common::{seeded_store, FakeChat, FakeEmbedder};

async fn spawn(chat: FakeChat) -> String {
    let store = seeded_store(&[(
        "LangChain chains link components together.",
        "https://docs.example/chains",
    )])
    .await;
    let chat = Arc::new(chat);
    let search = VectorStoreRetriever::new(Arc::new(FakeEmbedder::default()), store, 4);
    let pipeline = AnsweringPipeline::new(
        HistoryAwareRetriever::new(chat.clone(), search),
        AnswerComposer::new(chat),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(Arc::new(pipeline))).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_health() {
    let base = spawn(FakeChat::new("", "")).await;
    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_answer_returns_record() {
    let base = spawn(FakeChat::new("What do chains do?", "Chains link components.")).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/answer", base))
        .json(&serde_json::json!({
            "query": "And what do they do?",
            "chat_history": [
                { "role": "human", "content": "What is a chain?" },
                { "role": "ai", "content": "A LangChain building block." }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["query"], "And what do they do?");
    assert_eq!(body["standalone_query"], "What do chains do?");
    assert_eq!(body["result"], "Chains link components.");
    assert_eq!(body["source_documents"][0]["source"], "https://docs.example/chains");
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let base = spawn(FakeChat::new("", "")).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/answer", base))
        .json(&serde_json::json!({ "query": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let base = spawn(FakeChat::new("", "")).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/answer", base))
        .header("content-type", "application/json")
        .body("{\"chat_history\": []}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_model_failure_is_upstream_error() {
    let base = spawn(FakeChat::failing()).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/answer", base))
        .json(&serde_json::json!({ "query": "What is a chain?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "upstream_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("model quota exceeded"));
}
