//! Core data models used throughout docs-helper.
//!
//! These types represent the raw documents, chunks, conversation turns and
//! answers that flow through the ingestion and answering pipelines.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw document produced by a connector before splitting.
///
/// One file of a documentation tree or one fetched web page.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Source locator: file path or URL.
    pub source: String,
    pub title: Option<String>,
    /// Full extracted page text.
    pub text: String,
}

impl RawDocument {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: None,
            text: text.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A bounded slice of a document's text, the unit of storage and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    /// Source locator, rewritten to its canonical form during ingestion.
    pub source: String,
    /// Everything else: `title`, `start_index`, `hash`, `ingested_at`.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            metadata: Map::new(),
        }
    }
}

/// A chunk paired with its embedding and store id, ready for upsert.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: DocumentChunk,
}

/// A retrieved chunk with the similarity score reported by the index.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "human")]
    User,
    #[serde(alias = "ai")]
    Assistant,
}

impl Role {
    /// Label used when rendering history into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "Human",
            Role::Assistant => "Assistant",
        }
    }
}

/// One message of caller-owned chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Final output of one answering pipeline invocation.
///
/// Serializes as `{query, result, standalone_query, source_documents}`.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRecord {
    /// The caller's query, verbatim.
    pub query: String,
    /// Generated answer text.
    pub result: String,
    /// The query actually used for retrieval (equal to `query` without history).
    pub standalone_query: String,
    /// Retrieved chunks in ranked order.
    pub source_documents: Vec<DocumentChunk>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_accepts_langchain_aliases() {
        let turns: Vec<ConversationTurn> = serde_json::from_str(
            r#"[{"role":"human","content":"hi"},{"role":"ai","content":"hello"},{"role":"user","content":"more"}]"#,
        )
        .unwrap();
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[2].role, Role::User);
    }

    #[test]
    fn test_answer_record_shape() {
        let record = AnswerRecord {
            query: "q".to_string(),
            result: "a".to_string(),
            standalone_query: "q".to_string(),
            source_documents: vec![DocumentChunk::new("text", "https://docs.example/x")],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["query"], "q");
        assert_eq!(json["result"], "a");
        assert_eq!(json["source_documents"][0]["source"], "https://docs.example/x");
    }
}
