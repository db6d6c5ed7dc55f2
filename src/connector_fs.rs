//! Local documentation tree connector.
//!
//! Walks `sources.docs.root`, keeps files matching the include globs, and
//! turns each into a [`RawDocument`]. HTML files go through
//! [`html::extract`](crate::html::extract); everything else is read as text.
//! The locator is the file path as reached from the configured root, which
//! the locator rewrite later maps onto the public URL.

use anyhow::{bail, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::DocsSourceConfig;
use crate::html;
use crate::models::RawDocument;
use crate::traits::Connector;

pub struct DocsTreeConnector {
    config: DocsSourceConfig,
}

impl DocsTreeConnector {
    pub fn new(config: DocsSourceConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Paths that would be loaded, sorted.
    pub fn matching_files(&self) -> Result<Vec<PathBuf>> {
        let root = &self.config.root;
        if !root.exists() {
            bail!("Docs source root does not exist: {}", root.display());
        }

        let include_set = build_globset(&self.config.include_globs)?;

        let mut default_excludes = vec![
            "**/.git/**".to_string(),
            "**/_static/**".to_string(),
            "**/_sources/**".to_string(),
            "**/node_modules/**".to_string(),
        ];
        default_excludes.extend(self.config.exclude_globs.clone());
        let exclude_set = build_globset(&default_excludes)?;

        let mut paths = Vec::new();
        for entry in WalkDir::new(root).follow_links(self.config.follow_symlinks) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().replace('\\', "/");

            if exclude_set.is_match(&rel_str) {
                continue;
            }
            if !include_set.is_match(&rel_str) {
                continue;
            }
            paths.push(path.to_path_buf());
        }

        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl Connector for DocsTreeConnector {
    fn name(&self) -> &str {
        "docs"
    }

    async fn scan(&self) -> Result<Vec<RawDocument>> {
        let mut docs = Vec::new();
        for path in self.matching_files()? {
            match load_file(&path) {
                Ok(Some(doc)) => docs.push(doc),
                Ok(None) => tracing::debug!(path = %path.display(), "skipping empty file"),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file"),
            }
        }
        Ok(docs)
    }
}

fn load_file(path: &Path) -> Result<Option<RawDocument>> {
    let raw = std::fs::read_to_string(path)?;
    let source = path.to_string_lossy().to_string();

    let is_html = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("html") | Some("htm")
    ) || html::looks_like_html(&raw);

    let (title, text) = if is_html {
        let page = html::extract(&raw)?;
        (page.title, page.text)
    } else {
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        (title, raw)
    };

    if text.trim().is_empty() {
        return Ok(None);
    }

    let mut doc = RawDocument::new(source, text);
    doc.title = title;
    Ok(Some(doc))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
