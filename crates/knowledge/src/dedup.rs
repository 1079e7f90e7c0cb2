//! Chunk deduplication over an oversampled candidate list.

use crate::types::{Chunk, RetrievalResult};
use std::collections::HashSet;

/// Keep the first `k` chunks with distinct texts, in order of first occurrence.
pub fn dedupe_top_k(candidates: Vec<Chunk>, k: usize) -> RetrievalResult {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(k.min(candidates.len()));

    for chunk in candidates {
        if kept.len() == k {
            break;
        }
        if seen.insert(chunk.text.clone()) {
            kept.push(chunk);
        }
    }

    RetrievalResult::from_distinct(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts.iter().map(|t| Chunk::new(*t)).collect()
    }

    fn texts(result: &RetrievalResult) -> Vec<&str> {
        result.chunks().iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_keeps_first_distinct_texts() {
        let result = dedupe_top_k(chunks(&["A", "A", "B", "C", "C", "D"]), 2);
        assert_eq!(texts(&result), vec!["A", "B"]);
    }

    #[test]
    fn test_fewer_distinct_than_k() {
        let result = dedupe_top_k(chunks(&["A", "A", "B"]), 5);
        assert_eq!(texts(&result), vec!["A", "B"]);
    }

    #[test]
    fn test_empty_input_and_zero_k() {
        assert!(dedupe_top_k(Vec::new(), 3).is_empty());
        assert!(dedupe_top_k(chunks(&["A"]), 0).is_empty());
    }

    #[test]
    fn test_first_occurrence_metadata_wins() {
        let candidates = vec![
            Chunk::new("A").with_metadata(serde_json::json!({"page": 1})),
            Chunk::new("A").with_metadata(serde_json::json!({"page": 7})),
        ];

        let result = dedupe_top_k(candidates, 2);
        assert_eq!(result.len(), 1);
        assert_eq!(result.chunks()[0].metadata["page"], 1);
    }

    #[test]
    fn test_output_bounded_and_distinct() {
        let candidates = chunks(&["x", "y", "x", "z", "y", "w", "z", "v"]);
        let distinct = 5;

        for k in 0..10 {
            let result = dedupe_top_k(candidates.clone(), k);
            assert!(result.len() <= k);
            assert!(result.len() <= distinct);

            let unique: HashSet<_> = texts(&result).into_iter().collect();
            assert_eq!(unique.len(), result.len());
        }
    }

    #[test]
    fn test_texts_differing_only_in_whitespace_are_distinct() {
        let result = dedupe_top_k(chunks(&["A polity", "A polity "]), 5);
        assert_eq!(result.len(), 2);
    }
}
