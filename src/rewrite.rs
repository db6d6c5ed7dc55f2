//! Source locator rewriting.
//!
//! Documentation trees are usually mirrors of a website on local disk
//! (`langchain-docs/api.python.langchain.com/en/latest/...`). Before chunks
//! are stored, their locators are rewritten into the public URL
//! (`https://api.python.langchain.com/en/latest/...`) by replacing a
//! configured prefix.

use crate::config::RewriteConfig;
use crate::models::DocumentChunk;

/// Replaces every occurrence of `from` with `to` in a locator.
#[derive(Debug, Clone)]
pub struct LocatorRewrite {
    from: String,
    to: String,
    normalize_separators: bool,
}

impl LocatorRewrite {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            normalize_separators: true,
        }
    }

    /// Keep Windows `\` separators instead of turning them into `/`.
    pub fn keep_separators(mut self) -> Self {
        self.normalize_separators = false;
        self
    }

    pub fn from_config(config: &RewriteConfig) -> Self {
        Self {
            from: config.from.clone(),
            to: config.to.clone(),
            normalize_separators: config.normalize_separators,
        }
    }

    pub fn apply(&self, locator: &str) -> String {
        let (locator, from) = if self.normalize_separators {
            (locator.replace('\\', "/"), self.from.replace('\\', "/"))
        } else {
            (locator.to_string(), self.from.clone())
        };
        if from.is_empty() {
            return locator;
        }
        locator.replace(&from, &self.to)
    }

    /// Rewrite the `source` of every chunk in place.
    pub fn apply_all(&self, chunks: &mut [DocumentChunk]) {
        for chunk in chunks {
            chunk.source = self.apply(&chunk.source);
        }
    }
}
