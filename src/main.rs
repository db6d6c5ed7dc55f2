//! # docs-helper CLI (`dochelp`)
//!
//! Ingest a documentation set into a vector index and answer questions
//! about it.
//!
//! ## Usage
//!
//! ```bash
//! dochelp --config ./config/dochelp.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dochelp init` | Create the local index schema (sqlite backend) |
//! | `dochelp sources` | List configured document sources and their health |
//! | `dochelp ingest <docs\|web\|all>` | Load, split, embed and upsert documents |
//! | `dochelp ask "<question>"` | One-shot answer with sources |
//! | `dochelp chat` | Interactive session with conversation history |
//! | `dochelp serve` | HTTP API (`POST /answer`) |
//!
//! ## Examples
//!
//! ```bash
//! # Preview how many chunks a docs mirror produces
//! dochelp ingest docs --dry-run
//!
//! # Ingest it for real
//! dochelp ingest docs
//!
//! # Ask a question
//! dochelp ask "How do I build a retrieval chain?"
//! ```

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use docs_helper::chat::{format_response, ChatSession};
use docs_helper::chunk::TextSplitter;
use docs_helper::clients::{ingest_clients, Clients};
use docs_helper::config::{self, Config};
use docs_helper::embedding::DisabledEmbedder;
use docs_helper::ingest::Ingestor;
use docs_helper::logging;
use docs_helper::pipeline::AnsweringPipeline;
use docs_helper::progress::ProgressMode;
use docs_helper::rewrite::LocatorRewrite;
use docs_helper::server;
use docs_helper::sources::{self, SourceDescriptor};
use docs_helper::store::{create_store, InMemoryStore};

/// docs-helper: retrieval-augmented answers over a documentation set.
#[derive(Parser)]
#[command(
    name = "dochelp",
    about = "docs-helper: ingest documentation into a vector index and answer questions over it",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dochelp.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the local index schema (sqlite backend only).
    ///
    /// Idempotent. Hosted indexes are created outside this tool.
    Init,

    /// List configured document sources and their health.
    Sources,

    /// Load documents from a source, split, embed and upsert them.
    ///
    /// Every run appends: re-ingesting the same documents stores them again.
    Ingest {
        /// Source to ingest: `docs`, `web` or `all`.
        source: String,

        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to `human` on a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressArg>,
    },

    /// Answer a single question.
    Ask {
        question: String,

        /// Print the full answer record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Interactive chat. Type `/clear` to reset history, `exit` to quit.
    Chat,

    /// Start the HTTP server.
    Serve,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProgressArg {
    Human,
    Json,
    None,
}

impl From<ProgressArg> for ProgressMode {
    fn from(p: ProgressArg) -> Self {
        match p {
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
            ProgressArg::None => ProgressMode::Off,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&cfg).await?,
        Commands::Sources => sources::list_sources(&cfg)?,
        Commands::Ingest {
            source,
            dry_run,
            progress,
        } => {
            let mode = progress
                .map(ProgressMode::from)
                .unwrap_or_else(ProgressMode::default_for_tty);
            run_ingest(&cfg, &source, dry_run, mode).await?;
        }
        Commands::Ask { question, json } => {
            let pipeline = build_pipeline(&cfg).await?;
            let record = pipeline.answer(&question, &[]).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("{}", format_response(&record));
            }
        }
        Commands::Chat => run_chat(Arc::new(build_pipeline(&cfg).await?)).await?,
        Commands::Serve => {
            let pipeline = Arc::new(build_pipeline(&cfg).await?);
            server::run_server(&cfg, pipeline).await?;
        }
    }

    Ok(())
}

async fn build_pipeline(cfg: &Config) -> Result<AnsweringPipeline> {
    let clients = Clients::from_config(cfg).await?;
    AnsweringPipeline::from_clients(cfg, &clients)
}

async fn run_init(cfg: &Config) -> Result<()> {
    if cfg.index.backend != "sqlite" {
        println!(
            "Index backend '{}' needs no local initialization.",
            cfg.index.backend
        );
        return Ok(());
    }
    let store = create_store(&cfg.index).await?;
    println!(
        "Index '{}' initialized ({} vectors).",
        cfg.index.name,
        store.count().await?
    );
    Ok(())
}

async fn run_ingest(cfg: &Config, source: &str, dry_run: bool, mode: ProgressMode) -> Result<()> {
    let descriptors = SourceDescriptor::from_name(cfg, source)?;
    let splitter = TextSplitter::new(cfg.chunking.chunk_size, cfg.chunking.chunk_overlap)?;
    let rewrite = cfg.rewrite.as_ref().map(LocatorRewrite::from_config);

    if dry_run {
        let ingestor = Ingestor::new(
            Arc::new(DisabledEmbedder),
            Arc::new(InMemoryStore::new(&cfg.index.name)),
            splitter,
        )
        .with_rewrite(rewrite);
        for descriptor in &descriptors {
            let docs = descriptor.connector()?.scan().await?;
            let chunks = ingestor.plan(&docs);
            println!("ingest {} (dry-run)", descriptor.label());
            println!("  documents: {}", docs.len());
            println!("  chunks: {}", chunks.len());
            if let Some(first) = chunks.first() {
                println!("  first locator: {}", first.source);
            }
        }
        return Ok(());
    }

    if !cfg.embedding.is_enabled() {
        bail!("Embedding provider is disabled; set [embedding] provider to ingest");
    }

    let (embedder, store) = ingest_clients(cfg).await?;
    let ingestor = Ingestor::new(embedder, store, splitter)
        .with_rewrite(rewrite)
        .with_batch_size(cfg.embedding.batch_size)
        .with_commit_per_document(cfg.ingest.commit_per_document)
        .with_progress(mode.reporter());

    for descriptor in &descriptors {
        let summary = ingestor.ingest(descriptor).await?;
        println!("ingest {}", descriptor.label());
        println!("  documents: {}", summary.documents);
        println!("  chunks: {}", summary.chunks);
        println!("  upserted: {}", summary.upserted);
    }
    println!("ok");
    Ok(())
}

async fn run_chat(pipeline: Arc<AnsweringPipeline>) -> Result<()> {
    let mut session = ChatSession::new(pipeline);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        match prompt {
            "" => continue,
            "exit" | "quit" => break,
            "/clear" => {
                session.clear();
                println!("(history cleared)");
                continue;
            }
            _ => {}
        }

        match session.ask(prompt).await {
            Ok(record) => println!("{}\n", format_response(&record)),
            Err(e) => eprintln!("error: {:#}", e),
        }
    }

    Ok(())
}
