//! Recursive character text splitter.
//!
//! Splits document text into chunks of at most `chunk_size` characters,
//! with up to `chunk_overlap` characters shared between neighbouring chunks.
//!
//! # Algorithm
//!
//! 1. Pick the first separator (`"\n\n"`, `"\n"`, `" "`, `""`) that occurs in
//!    the text. The empty separator means a hard per-character cut.
//! 2. Split on it, keeping each separator attached to the start of the
//!    following piece.
//! 3. Pieces shorter than `chunk_size` are merged greedily into chunks; when
//!    a chunk is full it is emitted and pieces are dropped from its front
//!    until at most `chunk_overlap` characters remain to seed the next one.
//! 4. Pieces that are too long are split recursively with the remaining,
//!    finer separators.
//! 5. Every emitted chunk is trimmed; whitespace-only chunks are dropped.
//!
//! Lengths are counted in Unicode scalar values, not bytes, so multi-byte
//! text obeys the same bound.
//!
//! # Example
//!
//! ```rust
//! use docs_helper::chunk::TextSplitter;
//!
//! let splitter = TextSplitter::new(600, 50).unwrap();
//! let chunks = splitter.split_text("Chains are sequences of calls.");
//! assert_eq!(chunks, vec!["Chains are sequences of calls.".to_string()]);
//! ```

use std::collections::VecDeque;
use std::ops::Range;

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

use crate::models::{DocumentChunk, RawDocument};

/// Separators tried in order, coarsest first.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Deterministic recursive splitter with a fixed size and overlap.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter with the default separators.
    ///
    /// # Errors
    ///
    /// Returns an error if `chunk_size` is zero or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::with_separators(
            chunk_size,
            chunk_overlap,
            DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Create a splitter with custom separators.
    ///
    /// The hard-cut separator `""` is appended when missing so that no
    /// chunk can ever exceed `chunk_size`.
    pub fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        mut separators: Vec<String>,
    ) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        if separators.last().map(|s| !s.is_empty()).unwrap_or(true) {
            separators.push(String::new());
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into chunks. Empty or whitespace-only text yields no chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_spans(text)
            .into_iter()
            .map(|span| text[span].to_string())
            .collect()
    }

    /// Split text and locate each chunk in the source.
    ///
    /// Returns `(start_index, chunk)` pairs where `start_index` is the
    /// character offset of the chunk within `text`.
    pub fn split_with_offsets(&self, text: &str) -> Vec<(usize, String)> {
        let mut out = Vec::new();
        let mut byte_cursor = 0usize;
        let mut char_cursor = 0usize;

        for span in self.split_spans(text) {
            if span.start < byte_cursor {
                byte_cursor = 0;
                char_cursor = 0;
            }
            char_cursor += text[byte_cursor..span.start].chars().count();
            byte_cursor = span.start;
            out.push((char_cursor, text[span].to_string()));
        }

        out
    }

    /// Split each document into [`DocumentChunk`]s.
    ///
    /// Each chunk inherits the document's source locator and title, and gets
    /// `start_index` and a SHA-256 `hash` of its text in its metadata.
    pub fn split_documents(&self, docs: &[RawDocument]) -> Vec<DocumentChunk> {
        docs.iter().flat_map(|doc| self.split_document(doc)).collect()
    }

    /// Chunks of a single document, in order.
    pub fn split_document(&self, doc: &RawDocument) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        for (start, text) in self.split_with_offsets(&doc.text) {
            let mut chunk = DocumentChunk::new(text, doc.source.clone());
            if let Some(title) = &doc.title {
                chunk
                    .metadata
                    .insert("title".to_string(), title.clone().into());
            }
            chunk
                .metadata
                .insert("start_index".to_string(), (start as u64).into());
            chunk
                .metadata
                .insert("hash".to_string(), content_hash(&chunk.text).into());
            chunks.push(chunk);
        }
        chunks
    }

    /// Byte ranges of the trimmed chunks within `text`, in order.
    fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        self.split_recursive(text, 0..text.len(), &self.separators)
    }

    fn split_recursive(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[String],
    ) -> Vec<Range<usize>> {
        let base = range.start;
        let (separator, finer) = pick_separator(&text[range.clone()], separators);
        let pieces = split_keeping_separator(&text[range], separator)
            .into_iter()
            .map(|p| base + p.start..base + p.end);

        let mut final_spans = Vec::new();
        let mut good: Vec<Range<usize>> = Vec::new();

        for piece in pieces {
            if char_len(&text[piece.clone()]) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                final_spans.extend(self.merge_splits(text, &good));
                good.clear();
            }
            if finer.is_empty() {
                // Only reachable at the hard-cut level, where a piece is one char.
                push_trimmed(&mut final_spans, text, piece);
            } else {
                final_spans.extend(self.split_recursive(text, piece, finer));
            }
        }

        if !good.is_empty() {
            final_spans.extend(self.merge_splits(text, &good));
        }

        final_spans
    }

    /// Greedily join adjacent pieces. `pieces` are contiguous in `text`, so a
    /// window of them is itself one range.
    fn merge_splits(&self, text: &str, pieces: &[Range<usize>]) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut current: VecDeque<Range<usize>> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(&text[piece.clone()]);
            if total + len > self.chunk_size && !current.is_empty() {
                push_trimmed(&mut spans, text, window(&current));
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(&text[front]),
                        None => break,
                    }
                }
            }
            current.push_back(piece.clone());
            total += len;
        }

        push_trimmed(&mut spans, text, window(&current));
        spans
    }
}

/// SHA-256 hex digest of a chunk's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Choose the first separator present in `text`; returns it and the finer ones.
fn pick_separator<'s>(text: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return ("", &[]);
        }
        if text.contains(sep.as_str()) {
            return (sep.as_str(), &separators[i + 1..]);
        }
    }
    match separators.last() {
        Some(last) => (last.as_str(), &[]),
        None => ("", &[]),
    }
}

/// Split `text` on `separator`, attaching each separator to the piece after it.
///
/// Returns byte ranges into `text`. `"a\n\nb"` with `"\n\n"` gives the ranges
/// of `"a"` and `"\n\nb"`. The empty separator splits into single characters.
/// Empty pieces are never returned, and the pieces cover `text` exactly.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| i..i + c.len_utf8())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(start..idx);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(start..text.len());
    }
    pieces
}

/// The range from the first to the last piece of a contiguous window.
fn window(pieces: &VecDeque<Range<usize>>) -> Range<usize> {
    match (pieces.front(), pieces.back()) {
        (Some(first), Some(last)) => first.start..last.end,
        _ => 0..0,
    }
}

/// Push `span` with surrounding whitespace removed; whitespace-only spans are dropped.
fn push_trimmed(out: &mut Vec<Range<usize>>, text: &str, span: Range<usize>) {
    let slice = &text[span.clone()];
    let start = span.start + (slice.len() - slice.trim_start().len());
    let end = span.start + slice.trim_end().len();
    if start < end {
        out.push(start..end);
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_small_text_single_chunk() {
        let splitter = TextSplitter::new(600, 50).unwrap();
        let chunks = splitter.split_text("Chains are sequences of calls.");
        assert_eq!(chunks, vec!["Chains are sequences of calls."]);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let splitter = TextSplitter::new(600, 50).unwrap();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("  \n\n \n").is_empty());
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(50, 50).is_err());
        assert!(TextSplitter::new(50, 80).is_err());
        assert!(TextSplitter::new(50, 49).is_ok());
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let splitter = TextSplitter::new(40, 0).unwrap();
        let text = "First paragraph is here.\n\nSecond paragraph is here.";
        let chunks = splitter.split_text(text);
        assert_eq!(
            chunks,
            vec!["First paragraph is here.", "Second paragraph is here."]
        );
    }

    #[test]
    fn test_chunks_never_exceed_size() {
        let text = format!(
            "{}\n\n{}\n{}\n\n{}",
            words(120),
            "x".repeat(333),
            words(40),
            "┌──────────────┐ │ multibyte │ └──────────────┘ ".repeat(20)
        );
        for (size, overlap) in [(1, 0), (7, 3), (50, 10), (100, 0), (600, 50)] {
            let splitter = TextSplitter::new(size, overlap).unwrap();
            let chunks = splitter.split_text(&text);
            assert!(!chunks.is_empty());
            for c in &chunks {
                assert!(
                    c.chars().count() <= size,
                    "chunk of {} chars exceeds {}: {:?}",
                    c.chars().count(),
                    size,
                    c
                );
            }
        }
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let splitter = TextSplitter::new(10, 2).unwrap();
        let chunks = splitter.split_text(&"a".repeat(25));
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.len() <= 10));
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = words(200);
        let splitter = TextSplitter::new(50, 10).unwrap();
        let located = splitter.split_with_offsets(&text);
        assert!(located.len() > 2);
        for pair in located.windows(2) {
            let (prev_start, prev) = &pair[0];
            let (next_start, _) = &pair[1];
            let prev_end = prev_start + prev.chars().count();
            assert!(
                next_start < &prev_end,
                "no overlap between chunk at {} (ends {}) and chunk at {}",
                prev_start,
                prev_end,
                next_start
            );
            assert!(next_start > prev_start);
        }
    }

    #[test]
    fn test_offsets_locate_chunks_and_cover_text() {
        let text = format!(
            "Intro line.\n\n{}\n\nTail paragraph with ünïcödé text.\n{}",
            words(90),
            words(30)
        );
        let splitter = TextSplitter::new(64, 16).unwrap();
        let located = splitter.split_with_offsets(&text);
        let chars: Vec<char> = text.chars().collect();

        for (start, chunk) in &located {
            let len = chunk.chars().count();
            let slice: String = chars[*start..start + len].iter().collect();
            assert_eq!(&slice, chunk);
        }

        for (i, c) in chars.iter().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let covered = located
                .iter()
                .any(|(start, chunk)| i >= *start && i < start + chunk.chars().count());
            assert!(covered, "character {:?} at {} not covered", c, i);
        }
    }

    #[test]
    fn test_overlap_removed_reconstructs_text() {
        let text = words(150);
        let splitter = TextSplitter::new(40, 12).unwrap();
        let located = splitter.split_with_offsets(&text);

        let chars: Vec<char> = text.chars().collect();
        let mut rebuilt = String::new();
        let mut cursor = 0usize;
        for (start, chunk) in &located {
            let end = start + chunk.chars().count();
            if end > cursor {
                let from = cursor.max(*start);
                if from > cursor {
                    rebuilt.extend(&chars[cursor..from]);
                }
                rebuilt.extend(&chars[from..end]);
                cursor = end;
            }
        }
        assert_eq!(rebuilt.trim_end(), text.trim_end());
    }

    #[test]
    fn test_split_documents_metadata() {
        let splitter = TextSplitter::new(600, 50).unwrap();
        let docs =
            vec![RawDocument::new("docs/chains.html", "Chains are sequences of calls.")
                .with_title("Chains")];
        let chunks = splitter.split_documents(&docs);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source, "docs/chains.html");
        assert_eq!(chunks[0].metadata["title"], "Chains");
        assert_eq!(chunks[0].metadata["start_index"], 0);
        assert_eq!(
            chunks[0].metadata["hash"],
            content_hash("Chains are sequences of calls.")
        );
    }

    #[test]
    fn test_deterministic() {
        let text = format!("{}\n\n{}", words(60), words(70));
        let splitter = TextSplitter::new(45, 9).unwrap();
        assert_eq!(splitter.split_text(&text), splitter.split_text(&text));
    }

    fn pieces<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
        split_keeping_separator(text, separator)
            .into_iter()
            .map(|r| &text[r])
            .collect()
    }

    #[test]
    fn test_separator_kept_on_following_piece() {
        assert_eq!(pieces("a\n\nb", "\n\n"), vec!["a", "\n\nb"]);
        assert_eq!(
            pieces("\n\na\n\n\n\nb", "\n\n"),
            vec!["\n\na", "\n\n", "\n\nb"]
        );
        assert_eq!(pieces("ab", ""), vec!["a", "b"]);
    }

    #[test]
    fn test_offsets_with_repeated_text_in_overlap() {
        let splitter = TextSplitter::new(7, 1).unwrap();
        let located = splitter.split_with_offsets("x zaxc.. .\n\n\nyacxbbzx  yzc \nzy");
        assert_eq!(located[0], (0, "x".to_string()));
        assert_eq!(located[1], (2, "zaxc..".to_string()));
        assert_eq!(located[2], (9, ".".to_string()));
    }

    /// Every chunk sits at its reported offset, fits the size bound, and
    /// together the chunks cover every non-whitespace character.
    fn assert_offsets_sound(text: &str, size: usize, overlap: usize) {
        let splitter = TextSplitter::new(size, overlap).unwrap();
        let located = splitter.split_with_offsets(text);
        let chars: Vec<char> = text.chars().collect();

        for (start, chunk) in &located {
            let len = chunk.chars().count();
            assert!(len <= size, "{:?} longer than {}", chunk, size);
            let slice: String = chars[*start..start + len].iter().collect();
            assert_eq!(&slice, chunk, "text {:?} size {} overlap {}", text, size, overlap);
        }
        for pair in located.windows(2) {
            assert!(pair[1].0 >= pair[0].0);
        }
        for (i, c) in chars.iter().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            assert!(
                located
                    .iter()
                    .any(|(start, chunk)| i >= *start && i < start + chunk.chars().count()),
                "char {} uncovered in {:?} size {} overlap {}",
                i,
                text,
                size,
                overlap
            );
        }
    }

    #[test]
    fn test_random_texts_offsets_and_coverage() {
        // xorshift64; fixed seed keeps failures reproducible.
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = move |bound: usize| -> usize {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % bound as u64) as usize
        };
        let alphabet: Vec<char> = "xyzabc. \né".chars().collect();

        for _ in 0..3000 {
            let size = 1 + next(12);
            let overlap = next(size);
            let len = next(61);
            let text: String = (0..len).map(|_| alphabet[next(alphabet.len())]).collect();
            assert_offsets_sound(&text, size, overlap);
        }
    }
}
