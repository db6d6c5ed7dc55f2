//! HTML to plain text for documentation pages.
//!
//! Picks the main content root of a page (Sphinx/ReadTheDocs
//! `div[role=main]`, then `main`, `article`, `body`), drops non-content
//! elements, and renders block elements as paragraph breaks so the text
//! splitter can cut on them. `<pre>` blocks keep their line structure.

use anyhow::Result;
use scraper::{ElementRef, Html, Node, Selector};

/// Text and title extracted from one page.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlPage {
    pub title: Option<String>,
    pub text: String,
}

const ROOT_SELECTORS: &[&str] = &["div[role=main]", "main", "article", "body"];

const SKIPPED: &[&str] = &[
    "script", "style", "template", "noscript", "svg", "nav", "head", "button", "form",
];

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("invalid selector '{}': {:?}", css, e))
}

/// Extract the readable text and `<title>` of an HTML document.
pub fn extract(html: &str) -> Result<HtmlPage> {
    let document = Html::parse_document(html);

    let mut root = None;
    for css in ROOT_SELECTORS {
        if let Some(el) = document.select(&selector(css)?).next() {
            root = Some(el);
            break;
        }
    }
    let root = root.unwrap_or_else(|| document.root_element());

    let mut builder = TextBuilder::default();
    builder.walk(root);

    let title = document
        .select(&selector("title")?)
        .next()
        .or_else(|| document.select(&selector("h1").ok()?).next())
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    Ok(HtmlPage {
        title,
        text: builder.finish(),
    })
}

/// Heuristic for content that should go through [`extract`].
pub fn looks_like_html(text: &str) -> bool {
    let head: String = text
        .trim_start()
        .chars()
        .take(512)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<body")
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "section"
            | "article"
            | "main"
            | "aside"
            | "header"
            | "footer"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "dl"
            | "table"
            | "blockquote"
            | "figure"
            | "hr"
    )
}

fn is_line(tag: &str) -> bool {
    matches!(tag, "li" | "dt" | "dd" | "tr" | "br" | "caption")
}

#[derive(Default)]
struct TextBuilder {
    out: String,
    pending_breaks: usize,
    pending_space: bool,
}

impl TextBuilder {
    fn walk(&mut self, element: ElementRef<'_>) {
        let tag = element.value().name();
        if SKIPPED.contains(&tag) {
            return;
        }
        if tag == "pre" {
            self.push_pre(&element.text().collect::<String>());
            return;
        }

        let breaks = if is_block(tag) {
            2
        } else if is_line(tag) {
            1
        } else {
            0
        };
        self.request_break(breaks);

        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_inline(text),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.walk(el);
                    }
                }
                _ => {}
            }
        }

        self.request_break(breaks);
    }

    fn request_break(&mut self, n: usize) {
        if n > 0 {
            self.pending_breaks = self.pending_breaks.max(n);
            self.pending_space = false;
        }
    }

    fn flush_separator(&mut self) {
        if !self.out.is_empty() {
            if self.pending_breaks > 0 {
                for _ in 0..self.pending_breaks {
                    self.out.push('\n');
                }
            } else if self.pending_space {
                self.out.push(' ');
            }
        }
        self.pending_breaks = 0;
        self.pending_space = false;
    }

    fn push_inline(&mut self, raw: &str) {
        for ch in raw.chars() {
            if ch.is_whitespace() {
                if self.pending_breaks == 0 {
                    self.pending_space = true;
                }
                continue;
            }
            self.flush_separator();
            self.out.push(ch);
        }
    }

    fn push_pre(&mut self, raw: &str) {
        let text = collapse_newlines(raw);
        if text.is_empty() {
            return;
        }
        self.request_break(2);
        self.flush_separator();
        self.out.push_str(&text);
        self.request_break(2);
    }

    fn finish(self) -> String {
        self.out
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collapse_newlines(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_main_content_and_title() {
        let html = r#"<!DOCTYPE html><html><head><title> Chains | LangChain </title>
            <style>body { color: red }</style></head>
            <body><nav>Home Docs API</nav>
            <div role="main"><h1>Chains</h1><p>Chains   combine
            calls.</p><p>They are <em>composable</em>.</p></div>
            <footer>Copyright</footer></body></html>"#;
        let page = extract(html).unwrap();
        assert_eq!(page.title.as_deref(), Some("Chains | LangChain"));
        assert_eq!(page.text, "Chains\n\nChains combine calls.\n\nThey are composable.");
    }

    #[test]
    fn test_falls_back_to_body() {
        let html = "<html><body><p>One</p><script>var x = 1;</script><p>Two</p></body></html>";
        let page = extract(html).unwrap();
        assert_eq!(page.text, "One\n\nTwo");
        assert!(page.title.is_none());
    }

    #[test]
    fn test_preserves_pre_lines() {
        let html = "<body><p>Example:</p><pre>def f():\n    return 1\n</pre><p>Done</p></body>";
        let page = extract(html).unwrap();
        assert_eq!(page.text, "Example:\n\ndef f():\n    return 1\n\nDone");
    }

    #[test]
    fn test_list_items_on_lines() {
        let html = "<main><ul><li>alpha</li><li>beta</li></ul></main>";
        assert_eq!(extract(html).unwrap().text, "alpha\nbeta");
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("  <!DOCTYPE html><html>"));
        assert!(looks_like_html("<html lang=\"en\">"));
        assert!(!looks_like_html("# Markdown heading\n\nText"));
    }
}
