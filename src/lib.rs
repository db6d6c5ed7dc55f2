//! # docs-helper
//!
//! A retrieval-augmented documentation assistant.
//!
//! Documentation pages are loaded from a local mirror or the web, split into
//! overlapping chunks, embedded and stored in a vector index. Questions are
//! answered by retrieving the nearest chunks (after rewriting follow-ups
//! against the conversation so far) and asking a chat model to answer from
//! that context only.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌──────────────┐
//! │ Connectors  │──▶│ Split → Rewrite →    │──▶│ Vector index │
//! │ docs / web  │   │ Embed (Ingestor)     │   │ Pinecone/... │
//! └─────────────┘   └──────────────────────┘   └──────┬───────┘
//!                                                     │
//!        query + history                              │
//!              │   ┌───────────────────────┐          │
//!              └──▶│ HistoryAwareRetriever │◀─────────┘
//!                  └──────────┬────────────┘
//!                             ▼
//!                  ┌───────────────────────┐
//!                  │ AnswerComposer (LLM)  │──▶ AnswerRecord
//!                  └───────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`connector_fs`] | Local documentation tree connector |
//! | [`connector_web`] | Web page connector |
//! | [`html`] | HTML to text extraction |
//! | [`chunk`] | Recursive character text splitter |
//! | [`rewrite`] | Source locator rewriting |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Chat model clients |
//! | [`store`] | Vector index backends |
//! | [`ingest`] | Ingestion pipeline |
//! | [`retriever`] | Vector and history-aware retrieval |
//! | [`composer`] | Answer generation |
//! | [`pipeline`] | End-to-end answering |
//! | [`chat`] | Chat sessions and source formatting |
//! | [`server`] | HTTP API |

pub mod chat;
pub mod chunk;
pub mod clients;
pub mod composer;
pub mod config;
pub mod connector_fs;
pub mod connector_web;
pub mod db;
pub mod embedding;
pub mod html;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod retriever;
pub mod rewrite;
pub mod server;
pub mod sources;
pub mod store;
pub mod traits;
