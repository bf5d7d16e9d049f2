//! # rulecheck-core
//!
//! Deterministic evidence verification for LLM-judged document rules.
//!
//! Given the pages of a document and a natural-language rule, an LLM is
//! asked whether the rule holds. This crate owns everything around that
//! call that can be made deterministic:
//! - building the prompt from the pages ([`build_prompt`]);
//! - parsing the model's reply into a claim ([`parse_response`]);
//! - verifying the claimed evidence against the extracted text and
//!   calibrating confidence ([`verify`]).
//!
//! ## Key Guarantees
//!
//! 1. **Total**: no input shape makes parsing or verification fail
//! 2. **No I/O**: the LLM is a caller-supplied function
//! 3. **Grounded**: confidence only rises above the model's claim when
//!    the quoted evidence literally occurs in the document
//! 4. **Parallel-safe**: a [`PageStore`] is read-only and can be shared
//!    across rules
//!
//! ## Example
//!
//! ```rust
//! use rulecheck_core::{check_rule, PageStore};
//!
//! let pages = PageStore::from_texts(["The device was tested. It passed inspection."]);
//! let result = check_rule(&pages, "device was tested", |_prompt| {
//!     r#"{"status": "pass", "evidence": "Found in page 1: 'The device was tested'", "confidence": 50}"#
//!         .to_string()
//! });
//!
//! assert_eq!(result.evidence, "Found in page 1: 'The device was tested.'");
//! assert_eq!(result.confidence, 70);
//! ```

pub mod page;
pub mod prompt;
pub mod response;
pub mod rules;
pub mod types;
pub mod verifier;

// Re-export main types at crate root
pub use page::{normalize_page_text, Page, PageStore, PageStoreError};
pub use prompt::{build_prompt, SYSTEM_PROMPT};
pub use response::{parse_response, LlmClaim};
pub use rules::{RuleEntry, RuleObject, RuleSet, RuleSetError};
pub use types::{RuleCheckResult, Status, DEFAULT_CONFIDENCE};
pub use verifier::{verify, verify_detailed, VerificationOutcome};

/// Check one rule against a document.
///
/// Runs prompt building, the caller's `generate` function (the LLM call),
/// response parsing and verification. Whatever `generate` returns,
/// including an empty or error-describing string, yields a result.
pub fn check_rule<F>(pages: &PageStore, rule: &str, mut generate: F) -> RuleCheckResult
where
    F: FnMut(&str) -> String,
{
    let prompt = build_prompt(pages, rule);
    let raw = generate(&prompt);
    score_response(pages, rule, &raw)
}

/// Parse and verify a raw model response for `rule`.
pub fn score_response(pages: &PageStore, rule: &str, raw: &str) -> RuleCheckResult {
    let claim = parse_response(raw, rule);
    verify(&claim, pages)
}

/// Check every rule in order, one `generate` call per rule.
///
/// Results are returned in the same order as `rules`.
pub fn check_rules<'a, I, F>(pages: &PageStore, rules: I, mut generate: F) -> Vec<RuleCheckResult>
where
    I: IntoIterator<Item = &'a str>,
    F: FnMut(&str) -> String,
{
    rules
        .into_iter()
        .map(|rule| check_rule(pages, rule, &mut generate))
        .collect()
}
