//! Deterministic sentence chunking.
//!
//! Splitting is deliberately literal: trim the whole input, split on `'.'`,
//! drop segments that are empty. Abbreviations, decimal numbers and
//! multi-byte punctuation get no special handling; retrieval quality leans
//! on the embedding space rather than on sentence-boundary heuristics.

/// Splits `input` into ordered, non-empty retrievable units.
///
/// The input is trimmed as a whole before splitting, but individual
/// segments keep their surrounding whitespace: `"A. B."` yields
/// `["A", " B"]`. Empty or whitespace-only input (and input consisting
/// only of periods) yields no chunks; callers treat that as "nothing to
/// ingest".
///
/// The function is pure — the same input always produces the same output.
#[must_use]
pub fn chunk_text(input: &str) -> Vec<String> {
    input
        .trim()
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_periods_keeping_inner_whitespace() {
        let chunks = chunk_text("The sky is blue. Water boils at 100 degrees.");
        assert_eq!(
            chunks,
            vec![
                "The sky is blue".to_string(),
                " Water boils at 100 degrees".to_string(),
            ]
        );
    }

    #[test]
    fn empty_and_whitespace_input_yield_no_chunks() {
        assert!(chunk_text("").is_empty());
        assert!(chunk_text("   \n\t  ").is_empty());
    }

    #[test]
    fn periods_only_yield_no_chunks() {
        assert!(chunk_text("...").is_empty());
        assert!(chunk_text(" . ").is_empty());
    }

    #[test]
    fn consecutive_periods_produce_no_empty_segments() {
        let chunks = chunk_text("one..two");
        assert_eq!(chunks, vec!["one".to_string(), "two".to_string()]);
        assert!(chunks.iter().all(|chunk| !chunk.is_empty()));
    }

    #[test]
    fn output_order_matches_input_order() {
        let chunks = chunk_text("first. second. third.");
        assert_eq!(chunks[0], "first");
        assert_eq!(chunks[1], " second");
        assert_eq!(chunks[2], " third");
    }

    #[test]
    fn trailing_text_without_period_is_kept() {
        let chunks = chunk_text("done. almost");
        assert_eq!(chunks, vec!["done".to_string(), " almost".to_string()]);
    }
}
