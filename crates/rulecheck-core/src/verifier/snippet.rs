//! Snippet extraction and location.
//!
//! Two explicit stages turn an evidence claim into the text that gets
//! searched for:
//! 1. a single-quoted span, if the claim has one;
//! 2. otherwise the claim with any leading `label:` prefix removed.

use super::patterns::{LABEL_PREFIX, QUOTED_SPAN};
use super::sentences::split_sentences;
use crate::page::PageStore;

/// Where a snippet was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetLocation {
    /// Page the snippet was found on
    pub page: u32,

    /// The sentence containing the snippet, or the snippet itself when it
    /// spans a sentence boundary
    pub sentence: String,
}

/// Extract the searchable snippet from an evidence claim.
///
/// Edge cases:
/// - `"p1: 'a' and 'b'"` yields `a' and 'b` (greedy quote match);
/// - `"''"` has no quoted content, so the prefix rule applies;
/// - a claim without a colon is used whole.
///
/// The returned snippet is trimmed.
pub fn extract_snippet(evidence: &str) -> String {
    let snippet = match QUOTED_SPAN.captures(evidence) {
        Some(caps) => caps[1].to_string(),
        None => LABEL_PREFIX.replace(evidence, "").into_owned(),
    };
    snippet.trim().to_string()
}

/// Find the first page containing `snippet`, and the sentence holding it.
///
/// Pages are searched in order and blank pages are skipped. An empty
/// snippet is never found.
pub fn locate_snippet(snippet: &str, pages: &PageStore) -> Option<SnippetLocation> {
    let snippet = snippet.trim();
    // An empty string occurs in every page, so a bare label such as
    // "Page 3: " would verify against page 1 and earn the verified floor.
    // It is scored as missing evidence instead.
    if snippet.is_empty() {
        return None;
    }

    let page = pages
        .iter()
        .filter(|p| !p.is_blank())
        .find(|p| p.text.contains(snippet))?;

    let sentence = split_sentences(&page.text)
        .into_iter()
        .find(|s| s.contains(snippet))
        .map(str::trim)
        .unwrap_or(snippet);

    Some(SnippetLocation {
        page: page.page,
        sentence: sentence.to_string(),
    })
}
