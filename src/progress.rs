//! Ingestion progress reporting.
//!
//! Progress goes to **stderr** so stdout stays parseable for scripts.

use std::io::{IsTerminal, Write};

/// A single progress event for an ingestion run.
#[derive(Clone, Debug, PartialEq)]
pub enum IngestProgressEvent {
    /// The connector is scanning. Total unknown.
    Discovering { source: String },
    /// Documents loaded and split.
    Loaded {
        source: String,
        documents: u64,
        chunks: u64,
    },
    /// `n` of `total` chunks embedded and written to the index.
    Upserting { source: String, n: u64, total: u64 },
}

pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress: "ingest docs  upserting  1,234 / 5,000 chunks".
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Discovering { source } => {
                format!("ingest {}  discovering...\n", source)
            }
            IngestProgressEvent::Loaded {
                source,
                documents,
                chunks,
            } => format!(
                "ingest {}  loaded {} documents, {} chunks\n",
                source,
                format_number(*documents),
                format_number(*chunks)
            ),
            IngestProgressEvent::Upserting { source, n, total } => format!(
                "ingest {}  upserting  {} / {} chunks\n",
                source,
                format_number(*n),
                format_number(*total)
            ),
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = match &event {
            IngestProgressEvent::Discovering { source } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "discovering"
            }),
            IngestProgressEvent::Loaded {
                source,
                documents,
                chunks,
            } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "loaded",
                "documents": documents,
                "chunks": chunks
            }),
            IngestProgressEvent::Upserting { source, n, total } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "upserting",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a terminal, otherwise off.
    pub fn default_for_tty() -> Self {
        if std::io::stderr().is_terminal() {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
