//! Extension point for document sources.
//!
//! Anything that can produce [`RawDocument`]s can feed the ingestion
//! pipeline: implement [`Connector`] and hand it to
//! [`Ingestor::ingest_from`](crate::ingest::Ingestor::ingest_from).
//!
//! ```rust
//! use anyhow::Result;
//! use async_trait::async_trait;
//! use docs_helper::models::RawDocument;
//! use docs_helper::traits::Connector;
//!
//! struct Fixed;
//!
//! #[async_trait]
//! impl Connector for Fixed {
//!     fn name(&self) -> &str { "fixed" }
//!     async fn scan(&self) -> Result<Vec<RawDocument>> {
//!         Ok(vec![RawDocument::new("memo.txt", "Remember the milk.")])
//!     }
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;

use crate::models::RawDocument;

/// A document source scanned in full on every ingestion run.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Short label used in logs and progress output (e.g. `"docs"`).
    fn name(&self) -> &str;

    /// Load every document the source currently holds.
    async fn scan(&self) -> Result<Vec<RawDocument>>;
}
