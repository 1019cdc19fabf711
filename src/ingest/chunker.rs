//! Character-budgeted semantic chunking for page text.
//!
//! Splitting delegates to `semchunk-rs`, which prefers sentence and word boundaries and
//! falls back to hard character cuts when a single span exceeds the budget. Budgets are
//! expressed in characters because retrieval quality for mixed PDF text tracks span
//! length, not any one model's tokenizer. Overlap is applied as a second pass: the tail
//! of each chunk is carried into its successor, then the result is trimmed from the
//! front so the budget still holds.

use semchunk_rs::Chunker;
use thiserror::Error;

/// One chunk of page text with its position within the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChunk {
    /// Chunk text content.
    pub text: String,
    /// 0-based order of the chunk within its page; stored as `para_no`.
    pub local_index: usize,
}

/// Errors produced while turning page text into chunks.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Caller configured an impossible character budget.
    #[error("invalid chunk budget: overlap {overlap_chars} must be smaller than max {max_chars}")]
    InvalidBudget {
        /// Requested upper bound on chunk length.
        max_chars: usize,
        /// Requested overlap between consecutive chunks.
        overlap_chars: usize,
    },
}

/// Split one page of text into overlapping chunks of at most `max_chars` characters.
///
/// Whitespace-only input produces an empty sequence. The output is deterministic for
/// identical input and parameters, which ingestion retries rely on.
pub fn split_page(
    page_text: &str,
    max_chars: usize,
    overlap_chars: usize,
) -> Result<Vec<PageChunk>, ChunkError> {
    if max_chars == 0 || overlap_chars >= max_chars {
        return Err(ChunkError::InvalidBudget {
            max_chars,
            overlap_chars,
        });
    }
    if page_text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chunker = Chunker::new(max_chars, Box::new(char_count));
    let base = chunker.chunk(page_text);
    let overlapped = apply_overlap(base, max_chars, overlap_chars);

    Ok(overlapped
        .into_iter()
        .enumerate()
        .map(|(local_index, text)| PageChunk { text, local_index })
        .collect())
}

fn char_count(segment: &str) -> usize {
    segment.chars().count()
}

/// Carry the tail of each chunk into its successor, keeping every chunk within budget.
fn apply_overlap(chunks: Vec<String>, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    if overlap_chars == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    overlapped.push(chunks[0].clone());

    for index in 1..chunks.len() {
        let tail = trailing_chars(&chunks[index - 1], overlap_chars);
        let current = &chunks[index];
        let mut combined = String::with_capacity(tail.len() + current.len() + 1);

        if !tail.is_empty() {
            combined.push_str(tail);
            if !tail.ends_with(char::is_whitespace) && !current.starts_with(char::is_whitespace) {
                combined.push(' ');
            }
        }
        combined.push_str(current);

        overlapped.push(keep_last_chars(&combined, max_chars));
    }

    overlapped
}

/// Suffix of `text` holding at most `limit` characters, cut on a char boundary.
fn trailing_chars(text: &str, limit: usize) -> &str {
    if limit == 0 {
        return "";
    }
    let total = text.chars().count();
    if total <= limit {
        return text.trim_start();
    }
    let skip = total - limit;
    let byte_start = text
        .char_indices()
        .nth(skip)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    text[byte_start..].trim_start()
}

/// Trim `text` from the front until it fits within `budget` characters.
fn keep_last_chars(text: &str, budget: usize) -> String {
    let total = text.chars().count();
    if total <= budget {
        return text.to_string();
    }
    let skip = total - budget;
    let byte_start = text
        .char_indices()
        .nth(skip)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    text[byte_start..].trim_start().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_budgets() {
        assert!(matches!(
            split_page("hello", 0, 0),
            Err(ChunkError::InvalidBudget { .. })
        ));
        assert!(matches!(
            split_page("hello", 10, 10),
            Err(ChunkError::InvalidBudget { .. })
        ));
        assert!(matches!(
            split_page("hello", 10, 12),
            Err(ChunkError::InvalidBudget { .. })
        ));
    }

    #[test]
    fn whitespace_only_input_produces_no_chunks() {
        assert!(split_page("", 100, 10).expect("chunks").is_empty());
        assert!(split_page("  \n\t ", 100, 10).expect("chunks").is_empty());
    }

    #[test]
    fn chunks_respect_character_budget() {
        let text = "The quick brown fox jumps over the lazy dog. \
                    Pack my box with five dozen liquor jugs. \
                    How vexingly quick daft zebras jump.";
        for overlap in [0, 8, 15] {
            let chunks = split_page(text, 40, overlap).expect("chunks");
            assert!(chunks.len() > 1);
            for chunk in &chunks {
                assert!(chunk.text.chars().count() <= 40, "chunk: {:?}", chunk.text);
            }
        }
    }

    #[test]
    fn local_index_counts_from_zero_in_page_order() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = split_page(text, 12, 0).expect("chunks");
        for (expected, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.local_index, expected);
        }
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota kappa.";
        let first = split_page(text, 25, 6).expect("chunks");
        let second = split_page(text, 25, 6).expect("chunks");
        assert_eq!(first, second);
    }

    #[test]
    fn chunks_without_overlap_reconstruct_the_page() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let chunks = split_page(text, 20, 0).expect("chunks");
        let chunk_words: Vec<&str> = chunks
            .iter()
            .flat_map(|chunk| chunk.text.split_whitespace())
            .collect();
        let original_words: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(chunk_words, original_words);
    }

    #[test]
    fn overlap_carries_trailing_context_forward() {
        let chunks = apply_overlap(
            vec!["one two three".to_string(), "four five".to_string()],
            15,
            6,
        );
        assert_eq!(chunks, vec!["one two three", "three four five"]);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 15);
        }
    }

    #[test]
    fn overlap_trims_back_to_budget() {
        let chunks = apply_overlap(
            vec!["aaaaaaaaaa".to_string(), "bbbbbbbbbb".to_string()],
            10,
            4,
        );
        assert_eq!(chunks[0], "aaaaaaaaaa");
        // Tail plus separator would exceed the budget, so the front is trimmed away again.
        assert_eq!(chunks[1], "bbbbbbbbbb");
    }

    #[test]
    fn hard_cuts_apply_when_a_single_span_exceeds_the_budget() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = split_page(text, 10, 0).expect("chunks");
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 10);
        }
    }
}
