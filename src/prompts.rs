//! Prompt templates for query rephrasing and answer composition.
//!
//! Templates use `{name}` placeholders. `{{` and `}}` produce literal braces.
//! Rendering is a single pass, so placeholder-like text inside substituted
//! values (say, a code sample with `{input}` in it) is left untouched.

use anyhow::{bail, Result};

use crate::models::ConversationTurn;

const REPHRASE_TEMPLATE: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question.

Chat History:
{chat_history}
Follow Up Input: {input}
Standalone Question:";

const ANSWER_TEMPLATE: &str = "Answer any user questions based solely on the context below:

<context>
{context}
</context>

Question: {input}";

/// A named, versioned prompt template.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    pub name: String,
    pub version: String,
    template: String,
}

impl PromptTemplate {
    /// Turns a follow-up plus chat history into a standalone question.
    /// Variables: `chat_history`, `input`.
    pub fn rephrase() -> Self {
        Self {
            name: "rephrase".to_string(),
            version: "1".to_string(),
            template: REPHRASE_TEMPLATE.to_string(),
        }
    }

    /// Answers from retrieved context only. Variables: `context`, `input`.
    pub fn answer() -> Self {
        Self {
            name: "answer".to_string(),
            version: "1".to_string(),
            template: ANSWER_TEMPLATE.to_string(),
        }
    }

    /// A user-supplied template that must mention every `required` variable.
    pub fn custom(name: &str, template: &str, required: &[&str]) -> Result<Self> {
        let vars = parse(template)?
            .into_iter()
            .filter_map(|seg| match seg {
                Segment::Var(v) => Some(v),
                Segment::Text(_) => None,
            })
            .collect::<Vec<_>>();
        for req in required {
            if !vars.iter().any(|v| v == req) {
                bail!("prompts.{}: template must contain {{{}}}", name, req);
            }
        }
        Ok(Self {
            name: name.to_string(),
            version: "custom".to_string(),
            template: template.to_string(),
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        if let Ok(segments) = parse(&self.template) {
            for seg in segments {
                if let Segment::Var(v) = seg {
                    if !out.contains(&v) {
                        out.push(v);
                    }
                }
            }
        }
        out
    }

    /// Substitute every placeholder. Missing values are an error.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        for seg in parse(&self.template)? {
            match seg {
                Segment::Text(t) => out.push_str(&t),
                Segment::Var(name) => match values.iter().find(|(k, _)| *k == name) {
                    Some((_, v)) => out.push_str(v),
                    None => bail!("prompt '{}' is missing a value for {{{}}}", self.name, name),
                },
            }
        }
        Ok(out)
    }
}

/// Render chat history as `Human: ...` / `Assistant: ...` lines.
pub fn format_history(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, PartialEq)]
enum Segment {
    Text(String),
    Var(String),
}

fn parse(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => bail!("unterminated placeholder in prompt template"),
                    }
                }
                let name = name.trim().to_string();
                if name.is_empty() || !name.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
                    bail!("invalid placeholder '{{{}}}' in prompt template", name);
                }
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Var(name));
            }
            '}' => bail!("unmatched '}}' in prompt template"),
            other => text.push(other),
        }
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}
