//! Sentence segmentation capability.

use unicode_segmentation::UnicodeSegmentation;

/// Splits text into ordered sentences.
///
/// Implementations are loaded once and shared read-only across worker
/// threads, so they must be deterministic for a given input.
pub trait SentenceSegmenter: Send + Sync {
    /// Ordered, trimmed, non-empty sentences of `text`.
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Segmenter based on Unicode sentence boundaries (UAX #29).
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSentenceSegmenter;

impl SentenceSegmenter for UnicodeSentenceSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        text.split_sentence_bounds()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences =
            UnicodeSentenceSegmenter.segment("Meals were weighed. Was intake lower? It was!");
        assert_eq!(
            sentences,
            vec!["Meals were weighed.", "Was intake lower?", "It was!"]
        );
    }

    #[test]
    fn trims_and_drops_blank_pieces() {
        let sentences = UnicodeSentenceSegmenter.segment("   One sentence.   \n\n  ");
        assert_eq!(sentences, vec!["One sentence."]);
        assert!(UnicodeSentenceSegmenter.segment("  \n ").is_empty());
    }

    #[test]
    fn unterminated_text_is_one_sentence() {
        let sentences = UnicodeSentenceSegmenter.segment("no terminal punctuation here");
        assert_eq!(sentences, vec!["no terminal punctuation here"]);
    }
}
