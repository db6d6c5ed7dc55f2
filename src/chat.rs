//! Interactive chat session and answer formatting.

use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::{AnswerRecord, ConversationTurn};
use crate::pipeline::AnsweringPipeline;

/// Holds the history of one conversation and feeds it to every answer.
pub struct ChatSession {
    pipeline: Arc<AnsweringPipeline>,
    history: Vec<ConversationTurn>,
}

impl ChatSession {
    pub fn new(pipeline: Arc<AnsweringPipeline>) -> Self {
        Self {
            pipeline,
            history: Vec::new(),
        }
    }

    /// Answer `prompt`, then record the exchange. Failed exchanges are not recorded.
    pub async fn ask(&mut self, prompt: &str) -> Result<AnswerRecord> {
        let record = self.pipeline.answer(prompt, &self.history).await?;
        self.history.push(ConversationTurn::user(prompt));
        self.history.push(ConversationTurn::assistant(record.result.clone()));
        Ok(record)
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

/// Deduplicated, sorted, numbered list of answer sources.
///
/// Entries that look like URLs are rendered as markdown links. Returns an
/// empty string when there are no sources.
pub fn format_sources<'a, I>(sources: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let unique: BTreeSet<&str> = sources.into_iter().filter(|s| !s.is_empty()).collect();
    if unique.is_empty() {
        return String::new();
    }
    let mut out = String::from("Sources:\n");
    for (i, source) in unique.iter().enumerate() {
        if source.contains("http") {
            out.push_str(&format!("{}. [{}]({})\n", i + 1, source, source));
        } else {
            out.push_str(&format!("{}. {}\n", i + 1, source));
        }
    }
    out
}

/// Answer text followed by its sources.
pub fn format_response(record: &AnswerRecord) -> String {
    let sources = format_sources(record.source_documents.iter().map(|c| c.source.as_str()));
    if sources.is_empty() {
        record.result.clone()
    } else {
        format!("{}\n\n{}", record.result.trim_end(), sources.trim_end())
    }
}
