//! Text patterns used by evidence verification.
//!
//! Kept deliberately simple: the sentence boundary does not know about
//! abbreviations or decimal numbers, and evidence matching depends on
//! that exact behavior.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Terminal punctuation followed by whitespace. The boundary sits right
    /// after the punctuation mark; the whitespace run is dropped.
    pub static ref SENTENCE_BOUNDARY: Regex = Regex::new(r"[.!?]\s+").unwrap();

    /// A single-quoted span on one line. Greedy, so it runs from the first
    /// quote to the last quote of that line.
    pub static ref QUOTED_SPAN: Regex = Regex::new(r"'(.+)'").unwrap();

    /// A leading `label:` prefix and the whitespace after it.
    pub static ref LABEL_PREFIX: Regex = Regex::new(r"^.*?:\s*").unwrap();

    /// Word tokens in a rule.
    pub static ref WORD: Regex = Regex::new(r"\w+").unwrap();
}
