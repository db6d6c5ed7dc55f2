//! TOML configuration parsing and validation.
//!
//! Everything except credentials lives in the config file (default
//! `./config/dochelp.toml`). Credentials are read from the environment by the
//! client constructors, and two deployment values may be overridden from the
//! environment: `INDEX_NAME` and `PINECONE_HOST`.
//!
//! All validation happens in [`load_config`] / [`parse_config`], so a
//! missing or invalid value is fatal at startup rather than on the first query.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::prompts::PromptTemplate;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub rewrite: Option<RewriteConfig>,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub name: String,
    /// Pinecone index host, e.g. `docs-abc123.svc.us-east-1.pinecone.io`.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    /// SQLite file for the `sqlite` backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_upsert_batch")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

fn default_backend() -> String {
    "pinecone".to_string()
}
fn default_upsert_batch() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    600
}
fn default_chunk_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// Model identifier, falling back to the provider's default.
    pub fn model_or_default(&self) -> Option<String> {
        self.model
            .clone()
            .or_else(|| match self.provider.as_str() {
                "google" => Some("models/text-embedding-004".to_string()),
                "openai" => Some("text-embedding-3-small".to_string()),
                "local" => Some("all-minilm-l6-v2".to_string()),
                _ => None,
            })
    }

    /// Vector dimensionality, falling back to the known size of the model.
    pub fn dims_or_default(&self) -> Option<usize> {
        self.dims
            .or_else(|| match self.model_or_default().as_deref() {
                Some("models/text-embedding-004") | Some("text-embedding-004") => Some(768),
                Some("text-embedding-3-small") => Some(1536),
                Some("text-embedding-3-large") => Some(3072),
                Some("all-minilm-l6-v2") | Some("bge-small-en-v1.5") => Some(384),
                Some("bge-base-en-v1.5") => Some(768),
                _ => None,
            })
    }
}

fn default_embedding_provider() -> String {
    "google".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            temperature: 0.0,
            max_tokens: None,
            url: None,
            max_retries: 0,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn model_or_default(&self) -> Option<String> {
        self.model
            .clone()
            .or_else(|| match self.provider.as_str() {
                "google" => Some("gemini-1.5-flash-latest".to_string()),
                "openai" => Some("gpt-4o-mini".to_string()),
                _ => None,
            })
    }
}

fn default_llm_provider() -> String {
    "google".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    /// Drop hits scoring below this value. Unset keeps every hit.
    #[serde(default)]
    pub score_threshold: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            score_threshold: None,
        }
    }
}

fn default_k() -> usize {
    4
}

/// Optional overrides for the built-in prompt templates.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptsConfig {
    #[serde(default)]
    pub rephrase: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

impl PromptsConfig {
    pub fn rephrase_template(&self) -> Result<PromptTemplate> {
        match &self.rephrase {
            Some(t) => PromptTemplate::custom("rephrase", t, &["chat_history", "input"]),
            None => Ok(PromptTemplate::rephrase()),
        }
    }

    pub fn answer_template(&self) -> Result<PromptTemplate> {
        match &self.answer {
            Some(t) => PromptTemplate::custom("answer", t, &["context", "input"]),
            None => Ok(PromptTemplate::answer()),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
    /// Embed and upsert each document before loading the next one's chunks.
    #[serde(default)]
    pub commit_per_document: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    pub docs: Option<DocsSourceConfig>,
    pub web: Option<WebSourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocsSourceConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.html".to_string(),
        "**/*.htm".to_string(),
        "**/*.md".to_string(),
        "**/*.txt".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSourceConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub follow_links: bool,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Log and skip pages that fail to fetch instead of failing the scan.
    #[serde(default)]
    pub skip_failed_pages: bool,
}

fn default_max_pages() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RewriteConfig {
    pub from: String,
    pub to: String,
    #[serde(default = "default_true")]
    pub normalize_separators: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate config text, applying environment overrides.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if let Ok(name) = std::env::var("INDEX_NAME") {
        if !name.trim().is_empty() {
            config.index.name = name;
        }
    }
    if let Ok(host) = std::env::var("PINECONE_HOST") {
        if !host.trim().is_empty() {
            config.index.host = Some(host);
        }
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Index
    if config.index.name.trim().is_empty() {
        bail!("index.name must be set (or INDEX_NAME in the environment)");
    }
    match config.index.backend.as_str() {
        "pinecone" => {
            if config.index.host.as_deref().map(str::trim).unwrap_or("").is_empty() {
                bail!("index.host must be set for the pinecone backend (or PINECONE_HOST)");
            }
        }
        "sqlite" => {
            if config.index.path.is_none() {
                bail!("index.path must be set for the sqlite backend");
            }
        }
        "memory" => {}
        other => bail!(
            "Unknown index backend: '{}'. Must be pinecone, sqlite, or memory.",
            other
        ),
    }
    if config.index.batch_size == 0 {
        bail!("index.batch_size must be > 0");
    }

    // Chunking
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }

    // Embedding
    match config.embedding.provider.as_str() {
        "disabled" | "google" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be google, openai, ollama, local, or disabled.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        if config.embedding.model_or_default().is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims_or_default().unwrap_or(0) == 0 {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    // LLM
    match config.llm.provider.as_str() {
        "google" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown llm provider: '{}'. Must be google, openai, or ollama.",
            other
        ),
    }
    if config.llm.model_or_default().is_none() {
        bail!(
            "llm.model must be specified when provider is '{}'",
            config.llm.provider
        );
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        bail!("llm.temperature must be in [0.0, 2.0]");
    }

    // Retrieval
    if config.retrieval.k == 0 {
        bail!("retrieval.k must be >= 1");
    }
    if let Some(t) = config.retrieval.score_threshold {
        if !(-1.0..=1.0).contains(&t) {
            bail!("retrieval.score_threshold must be in [-1.0, 1.0]");
        }
    }

    // Prompts
    config.prompts.rephrase_template()?;
    config.prompts.answer_template()?;

    // Sources
    if let Some(web) = &config.sources.web {
        if web.urls.is_empty() {
            bail!("sources.web.urls must not be empty");
        }
        for u in &web.urls {
            url::Url::parse(u).with_context(|| format!("sources.web.urls: invalid URL '{}'", u))?;
        }
    }

    Ok(())
}
