//! Document chunking.
//!
//! Splits document text into overlapping segments sized for embedding.
//! Consecutive chunks share exactly `overlap` characters, so the original
//! (trimmed) text can be rebuilt by concatenating the first chunk with every
//! later chunk minus its first `overlap` characters.

use crate::error::{RagError, Result};

/// Preferred boundary kind when a chunk has to be cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Prefer blank-line boundaries, then sentence punctuation.
    Paragraph,
    /// Prefer sentence punctuation.
    Sentence,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Maximum chunk length in characters.
    pub max_len: usize,
    /// Characters shared between consecutive chunks. Must be smaller than
    /// `max_len`.
    pub overlap: usize,
    pub strategy: SplitStrategy,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_len: 1024,
            overlap: 100,
            strategy: SplitStrategy::Sentence,
        }
    }
}

const SENTENCE_BREAKS: [&str; 6] = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        if config.max_len == 0 {
            return Err(RagError::Validation(
                "chunk max_len must be greater than zero".to_string(),
            ));
        }
        if config.overlap >= config.max_len {
            return Err(RagError::Validation(format!(
                "chunk overlap ({}) must be smaller than max_len ({})",
                config.overlap, config.max_len
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split text into ordered, overlapping chunks.
    ///
    /// Empty or whitespace-only input yields no chunks; input at most
    /// `max_len` characters long yields exactly one.
    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, with the end as sentinel.
        // All window arithmetic is in characters; slicing goes through this
        // table so multi-byte input can never split a code point.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = boundaries.len() - 1;

        if total_chars <= self.config.max_len {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < total_chars {
            let hard_end = (start + self.config.max_len).min(total_chars);
            let end = if hard_end < total_chars {
                self.break_point(text, &boundaries, start, hard_end)
                    .unwrap_or(hard_end)
            } else {
                hard_end
            };

            chunks.push(text[boundaries[start]..boundaries[end]].to_string());

            if end == total_chars {
                break;
            }
            start = end - self.config.overlap;
        }

        chunks
    }

    /// Find a strategy-appropriate break point inside the current window.
    ///
    /// Returns a char index in `(start + overlap, hard_end)`, or None when
    /// no acceptable boundary exists and the hard cut has to be used. The
    /// lower bound keeps every window advancing by more than `overlap`
    /// characters, which the reconstruction contract depends on.
    fn break_point(
        &self,
        text: &str,
        boundaries: &[usize],
        start: usize,
        hard_end: usize,
    ) -> Option<usize> {
        let window = &text[boundaries[start]..boundaries[hard_end]];
        let min_step = (self.config.max_len / 3).max(self.config.overlap);

        let mut patterns: Vec<&str> = Vec::new();
        if self.config.strategy == SplitStrategy::Paragraph {
            patterns.push("\n\n");
        }
        patterns.extend(SENTENCE_BREAKS);
        patterns.push("\n");
        patterns.push(" ");

        for pattern in patterns {
            if let Some(pos) = window.rfind(pattern) {
                let candidate_byte = boundaries[start] + pos + pattern.len();
                // Break patterns are ASCII, so the candidate is always a
                // char boundary; a failed lookup just skips the pattern.
                if let Ok(candidate) = boundaries.binary_search(&candidate_byte) {
                    if candidate - start > min_step {
                        return Some(candidate);
                    }
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_len: usize, overlap: usize, strategy: SplitStrategy) -> Chunker {
        Chunker::new(ChunkerConfig {
            max_len,
            overlap,
            strategy,
        })
        .expect("valid config")
    }

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = chunker(100, 10, SplitStrategy::Sentence);
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("   \n\t ").is_empty());
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let chunker = chunker(100, 10, SplitStrategy::Sentence);
        let chunks = chunker.split("  Hello world  ");
        assert_eq!(chunks, vec!["Hello world".to_string()]);
    }

    #[test]
    fn chunks_respect_max_len() {
        let chunker = chunker(30, 5, SplitStrategy::Sentence);
        let text = "Cats are independent pets. Dogs are loyal companions.";
        let chunks = chunker.split(text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 30, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn stripping_overlap_reconstructs_original() {
        let overlap = 12;
        let chunker = chunker(80, overlap, SplitStrategy::Sentence);
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let text = text.trim().to_string();

        let chunks = chunker.split(&text);
        assert!(chunks.len() > 2);

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.push_str(&chunk.chars().skip(overlap).collect::<String>());
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn consecutive_chunks_share_overlap() {
        let overlap = 7;
        let chunker = chunker(50, overlap, SplitStrategy::Sentence);
        let text = "One sentence here. Another sentence there. ".repeat(10);
        let chunks = chunker.split(text.trim());
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let prev_tail: String = pair[0]
                .chars()
                .skip(char_len(&pair[0]) - overlap)
                .collect();
            let next_head: String = pair[1].chars().take(overlap).collect();
            assert_eq!(prev_tail, next_head);
        }
    }

    #[test]
    fn paragraph_strategy_prefers_blank_lines() {
        let chunker = chunker(60, 5, SplitStrategy::Paragraph);
        let text = format!("{}\n\n{}", "alpha beta gamma delta epsilon zeta", "eta theta iota kappa lambda mu nu xi");
        let chunks = chunker.split(&text);
        assert!(chunks.len() >= 2);
        assert!(chunks[0].ends_with("\n\n"), "first chunk: {:?}", chunks[0]);
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let chunker = chunker(20, 4, SplitStrategy::Sentence);
        let text = "früh über straße. ".repeat(10);
        let chunks = chunker.split(text.trim());
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 20);
        }
    }

    #[test]
    fn rejects_overlap_not_smaller_than_max_len() {
        assert!(Chunker::new(ChunkerConfig {
            max_len: 10,
            overlap: 10,
            strategy: SplitStrategy::Sentence,
        })
        .is_err());
        assert!(Chunker::new(ChunkerConfig {
            max_len: 0,
            overlap: 0,
            strategy: SplitStrategy::Sentence,
        })
        .is_err());
    }
}
