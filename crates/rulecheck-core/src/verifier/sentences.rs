//! Approximate sentence segmentation.

use super::patterns::SENTENCE_BOUNDARY;

/// Split text into sentences at `.`, `!` or `?` followed by whitespace.
///
/// This is not a real segmenter: "Dr. Smith" and "v. 2. 1" are split too.
/// Punctuation stays with the sentence it ends; the whitespace between
/// sentences is discarded. Text without a trailing boundary yields its
/// remainder as the last sentence (possibly empty).
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        // punctuation is a single ASCII byte
        let end = boundary.start() + 1;
        sentences.push(&text[start..end]);
        start = boundary.end();
    }
    sentences.push(&text[start..]);

    sentences
}
