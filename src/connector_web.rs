//! Web documentation connector.
//!
//! Fetches the configured start URLs and, with `follow_links = true`,
//! crawls same-origin links breadth-first up to `max_pages` pages. Each
//! page's URL is its locator, so no rewrite is needed for web sources.
//!
//! A page that cannot be fetched, or answers with a non-2xx status, fails
//! the scan unless `skip_failed_pages = true`. Non-HTML responses are
//! always skipped.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use url::Url;

use crate::config::WebSourceConfig;
use crate::html;
use crate::http;
use crate::models::RawDocument;
use crate::traits::Connector;

pub struct WebConnector {
    config: WebSourceConfig,
    client: reqwest::Client,
}

impl WebConnector {
    pub fn new(config: WebSourceConfig) -> Result<Self> {
        let client = http::client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    async fn fetch(&self, url: &Url) -> Result<Option<String>> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to fetch {}", url))?;
        if !resp.status().is_success() {
            bail!("fetching {} returned {}", url, resp.status());
        }
        let is_html = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("html"))
            .unwrap_or(true);
        if !is_html {
            tracing::debug!(%url, "skipping non-HTML response");
            return Ok(None);
        }
        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read {}", url))?;
        Ok(Some(body))
    }
}

#[async_trait]
impl Connector for WebConnector {
    fn name(&self) -> &str {
        "web"
    }

    async fn scan(&self) -> Result<Vec<RawDocument>> {
        let mut queue: VecDeque<Url> = VecDeque::new();
        let mut seen: HashSet<String> = HashSet::new();
        for u in &self.config.urls {
            let url = Url::parse(u).with_context(|| format!("invalid URL '{}'", u))?;
            if seen.insert(canonical(&url)) {
                queue.push_back(url);
            }
        }

        let mut docs = Vec::new();
        while let Some(url) = queue.pop_front() {
            if docs.len() >= self.config.max_pages {
                tracing::info!(max_pages = self.config.max_pages, "page limit reached");
                break;
            }

            let body = match self.fetch(&url).await {
                Ok(Some(body)) => body,
                Ok(None) => continue,
                Err(e) if self.config.skip_failed_pages => {
                    tracing::warn!(%url, error = %e, "skipping failed page");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if self.config.follow_links {
                for link in same_origin_links(&body, &url) {
                    if seen.insert(canonical(&link)) {
                        queue.push_back(link);
                    }
                }
            }

            let page = html::extract(&body)?;
            if page.text.trim().is_empty() {
                continue;
            }
            let mut doc = RawDocument::new(url.as_str(), page.text);
            doc.title = page.title;
            docs.push(doc);
        }

        Ok(docs)
    }
}

/// URL without fragment, used to dedupe the crawl frontier.
fn canonical(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);
    u.to_string()
}

/// `<a href>` targets on the same origin as `base`, fragments removed.
fn same_origin_links(body: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(body);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|u| u.origin() == base.origin())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(|mut u| {
            u.set_fragment(None);
            u
        })
        .collect()
}
