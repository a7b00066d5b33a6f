//! Recursive text chunking with bounded size and overlap

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Chunk, Document};

/// Separators tried before sentence boundaries, strongest first
const LINE_SEPARATORS: [&str; 2] = ["\n\n", "\n"];

/// Splits documents into overlapping chunks of at most `chunk_size` characters
///
/// Inside each window the chunker breaks on the last paragraph break, then
/// line break, then sentence boundary, then whitespace, and only cuts
/// mid-word when the window has none of those past its overlap region. Every
/// chunk is an exact slice of its parent document.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Maximum overlap between consecutive chunks in characters
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; `overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        Self::from_config(&ChunkingConfig {
            chunk_size,
            chunk_overlap: overlap,
        })
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        })
    }

    /// Chunk every document, preserving document order
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| self.chunk_document(doc))
            .collect()
    }

    /// Chunk a single document; metadata is copied to every chunk
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        let text = doc.content.as_str();
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut chunk_index = 0u32;
        // Span starts only move forward, so char offsets can be counted incrementally
        let mut counted_bytes = 0usize;
        let mut counted_chars = 0usize;

        for span in self.split_spans(text) {
            counted_chars += text[counted_bytes..span.start].chars().count();
            counted_bytes = span.start;

            let content = &text[span];
            if content.trim().is_empty() {
                continue;
            }

            chunks.push(Chunk::new(
                content.to_string(),
                doc.metadata.clone(),
                chunk_index,
                counted_chars,
            ));
            chunk_index += 1;
        }

        chunks
    }

    /// Compute the byte ranges of every chunk of `text`
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut start = 0usize;

        while start < text.len() {
            let limit = advance_chars(text, start, self.chunk_size);
            if limit >= text.len() {
                spans.push(start..text.len());
                break;
            }

            // Breaking past the overlap region guarantees the next start moves forward
            let floor = advance_chars(text, start, self.overlap + 1);
            let end = find_break(text, start, floor, limit);
            spans.push(start..end);

            let next = self.overlap_start(text, start, end);
            start = if next > start { next } else { end };
        }

        spans
    }

    /// Where the chunk after `start..end` begins
    ///
    /// The start lies in the last `overlap` characters of the previous chunk
    /// (or at `end`) and snaps to the strongest boundary found there, using
    /// the same preference order as the end of a chunk.
    fn overlap_start(&self, text: &str, start: usize, end: usize) -> usize {
        let back = retreat_chars(text, end, self.overlap);
        let region = &text[back..end];

        for separator in LINE_SEPARATORS {
            if let Some(pos) = region.find(separator) {
                return back + pos + separator.len();
            }
        }

        // Sentence starts need context on both sides of `end`
        let lookahead = advance_chars(text, end, self.chunk_size);
        let sentence = text[start..lookahead]
            .split_sentence_bound_indices()
            .map(|(i, _)| start + i)
            .find(|at| *at >= back && *at <= end);
        if let Some(at) = sentence {
            return at;
        }

        align_to_word(text, back, end)
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

/// Pick the strongest break position in `floor..=limit`
fn find_break(text: &str, start: usize, floor: usize, limit: usize) -> usize {
    let window = &text[start..limit];

    for separator in LINE_SEPARATORS {
        if let Some(pos) = window.rfind(separator) {
            let at = start + pos + separator.len();
            if at >= floor {
                return at;
            }
        }
    }

    let sentence = window
        .split_sentence_bound_indices()
        .map(|(i, _)| start + i)
        .filter(|at| *at > start && *at >= floor)
        .last();
    if let Some(at) = sentence {
        return at;
    }

    if let Some((i, c)) = window.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        let at = start + i + c.len_utf8();
        if at >= floor {
            return at;
        }
    }

    limit
}

/// Byte index reached after moving `n` characters forward from `from`
fn advance_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// Byte index reached after moving `n` characters back from `to`
fn retreat_chars(text: &str, to: usize, n: usize) -> usize {
    if n == 0 {
        return to;
    }
    text[..to]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Move a chunk start out of the middle of a word, staying before `end`
fn align_to_word(text: &str, at: usize, end: usize) -> usize {
    let starts_word = at == 0
        || text[..at]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
    if starts_word {
        return at;
    }

    match text[at..end].char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((i, c)) => at + i + c.len_utf8(),
        None => at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceMetadata;
    use proptest::prelude::*;

    fn doc(text: &str) -> Document {
        Document::new(text, SourceMetadata::page("report.pdf", 2))
    }

    /// Rebuild the covered text from chunk offsets, checking the overlap bound
    /// and that anything skipped between chunks is whitespace
    fn reconstruct(text: &str, chunks: &[Chunk], overlap: usize) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut rebuilt = String::new();
        let mut covered = 0usize;

        for chunk in chunks {
            let len = chunk.char_len();
            let expected: String = chars[chunk.char_start..chunk.char_start + len].iter().collect();
            assert_eq!(chunk.content, expected);

            if chunk.char_start <= covered {
                assert!(covered - chunk.char_start <= overlap);
                rebuilt.extend(chunk.content.chars().skip(covered - chunk.char_start));
            } else {
                let gap: String = chars[covered..chunk.char_start].iter().collect();
                assert!(gap.trim().is_empty(), "non-whitespace gap {:?}", gap);
                rebuilt.push_str(&gap);
                rebuilt.push_str(&chunk.content);
            }
            covered = chunk.char_start + len;
        }

        let tail: String = chars[covered..].iter().collect();
        assert!(tail.trim().is_empty(), "uncovered tail {:?}", tail);
        rebuilt
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(TextChunker::new(10, 10).is_err());
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(10, 9).is_ok());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = TextChunker::default();
        let chunks = chunker.chunk_document(&doc("Alice met Bob at the park."));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Alice met Bob at the park.");
        assert_eq!(chunks[0].char_start, 0);
        assert_eq!(chunks[0].metadata, SourceMetadata::page("report.pdf", 2));
    }

    #[test]
    fn test_blank_document_has_no_chunks() {
        let chunker = TextChunker::default();
        assert!(chunker.chunk_document(&doc("")).is_empty());
        assert!(chunker.chunk_document(&doc(" \n\n\t ")).is_empty());
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let chunker = TextChunker::new(60, 10).unwrap();
        let text = "The first paragraph is here.\n\nThe second paragraph follows it and is longer.";
        let chunks = chunker.chunk_document(&doc(text));

        assert_eq!(chunks[0].content, "The first paragraph is here.\n\n");
        assert_eq!(chunks[1].content, "The second paragraph follows it and is longer.");
        assert_eq!(chunks[1].char_start, 30);
    }

    #[test]
    fn test_overlap_does_not_cross_line_breaks() {
        let chunker = TextChunker::new(40, 15).unwrap();
        let text = "Item one is listed here\nItem two follows on the next line\nItem three";
        let chunks = chunker.chunk_document(&doc(text));

        assert_eq!(chunks[0].content, "Item one is listed here\n");
        for chunk in &chunks[1..] {
            assert!(chunk.content.starts_with("Item"), "chunk starts mid-line: {:?}", chunk.content);
        }
        assert_eq!(reconstruct(text, &chunks, 15), text);
    }

    #[test]
    fn test_overlap_starts_at_sentence() {
        let chunker = TextChunker::new(40, 27).unwrap();
        let text = "Cats purr softly. Dogs bark at night and wake the neighbours up again.";
        let chunks = chunker.chunk_document(&doc(text));

        // "softly." starts a word inside the overlap, but "Dogs" starts a sentence
        assert_eq!(chunks[0].content, "Cats purr softly. Dogs bark at night ");
        assert_eq!(chunks[1].char_start, 18);
        assert!(chunks[1].content.starts_with("Dogs"));
    }

    #[test]
    fn test_prefers_sentences_over_words() {
        let chunker = TextChunker::new(40, 5).unwrap();
        let text = "One short sentence. Another sentence that keeps going on and on.";
        let chunks = chunker.chunk_document(&doc(text));

        assert_eq!(chunks[0].content, "One short sentence. ");
        assert_eq!(chunks[1].char_start, 20);
    }

    #[test]
    fn test_falls_back_to_words_then_hard_cut() {
        let chunker = TextChunker::new(12, 2).unwrap();
        let chunks = chunker.chunk_document(&doc("alpha beta gamma delta"));
        assert!(chunks.iter().all(|c| c.char_len() <= 12));
        assert_eq!(chunks[0].content, "alpha beta ");

        let chunks = chunker.chunk_document(&doc("abcdefghijklmnopqrstuvwxyz"));
        assert_eq!(chunks[0].content, "abcdefghijkl");
        // Hard cuts keep the full overlap
        assert_eq!(chunks[1].char_start, 10);
    }

    #[test]
    fn test_overlap_starts_on_word_boundary() {
        let chunker = TextChunker::new(30, 12).unwrap();
        let text = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod";
        let chunks = chunker.chunk_document(&doc(text));

        for pair in chunks.windows(2) {
            let prev_end = pair[0].char_start + pair[0].char_len();
            assert!(pair[1].char_start < prev_end, "chunks should overlap");
            assert!(prev_end - pair[1].char_start <= 12);
            let before: Option<char> = text.chars().nth(pair[1].char_start - 1);
            assert_eq!(before, Some(' '));
        }
        assert_eq!(reconstruct(text, &chunks, 12), text);
    }

    #[test]
    fn test_multibyte_text_is_measured_in_characters() {
        let chunker = TextChunker::new(8, 2).unwrap();
        let text = "日本語のテキストを正しく分割できるか確認します。";
        let chunks = chunker.chunk_document(&doc(text));

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.char_len() <= 8));
        assert_eq!(reconstruct(text, &chunks, 2), text);
    }

    #[test]
    fn test_chunk_indices_and_metadata_across_documents() {
        let chunker = TextChunker::new(20, 4).unwrap();
        let docs = vec![
            Document::new("page one text that is long enough to split", SourceMetadata::page("a.pdf", 1)),
            Document::new("page two", SourceMetadata::page("a.pdf", 2)),
        ];
        let chunks = chunker.chunk_documents(&docs);

        let first_page: Vec<_> = chunks.iter().filter(|c| c.metadata.page == Some(1)).collect();
        assert!(first_page.len() > 1);
        for (i, chunk) in first_page.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
        }

        let last = chunks.last().unwrap();
        assert_eq!(last.metadata, SourceMetadata::page("a.pdf", 2));
        assert_eq!(last.chunk_index, 0);
    }

    #[test]
    fn test_deterministic() {
        let chunker = TextChunker::new(50, 10).unwrap();
        let text = "Sentence one is here. Sentence two follows.\nA new line.\n\nA new paragraph with words.";

        let a: Vec<_> = chunker
            .chunk_document(&doc(text))
            .into_iter()
            .map(|c| (c.content, c.char_start, c.chunk_index))
            .collect();
        let b: Vec<_> = chunker
            .chunk_document(&doc(text))
            .into_iter()
            .map(|c| (c.content, c.char_start, c.chunk_index))
            .collect();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_chunks_are_bounded_and_reconstruct_the_text(
            text in "[a-zA-Zé漢 .!?\n]{0,1200}",
            size in 1usize..200,
            overlap_pct in 0usize..100,
        ) {
            let overlap = (size - 1) * overlap_pct / 100;
            let chunker = TextChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk_document(&doc(&text));

            for chunk in &chunks {
                prop_assert!(chunk.char_len() <= size);
                prop_assert!(!chunk.content.trim().is_empty());
            }
            for pair in chunks.windows(2) {
                prop_assert!(pair[1].char_start > pair[0].char_start);
            }
            prop_assert_eq!(reconstruct(&text, &chunks, overlap), text.clone());

            let again = chunker.chunk_document(&doc(&text));
            let first: Vec<_> = chunks.iter().map(|c| (&c.content, c.char_start)).collect();
            let second: Vec<_> = again.iter().map(|c| (&c.content, c.char_start)).collect();
            prop_assert_eq!(first, second);
        }
    }
}
