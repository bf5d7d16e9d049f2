//! Evidence verification and confidence scoring.
//!
//! # Core Principle
//! The model is untrusted for factual grounding. Any confidence above the
//! model's bare claim must be earned by text that literally occurs in the
//! document. Status (`pass`/`fail`) is never overridden here; only the
//! confidence and the evidence presentation change.
//!
//! # Scoring
//! | Outcome | Confidence |
//! |---------|------------|
//! | Evidence found, status pass | `max(c, 70)`, at most 100 |
//! | Evidence found, other status | `max(c, 40)`, at most 80 |
//! | Evidence not found | `max(5, floor(c * 0.4))` |
//! | No evidence, rule keyword on a page | `min(60, c + 30)` |
//! | No evidence, no keyword | `c` |
//!
//! The scale is hand-tuned, not learned, so results are auditable.

mod patterns;
mod sentences;
mod snippet;

pub use sentences::split_sentences;
pub use snippet::{extract_snippet, locate_snippet, SnippetLocation};

use crate::page::PageStore;
use crate::response::{clamp_confidence, LlmClaim};
use crate::types::{RuleCheckResult, Status};
use patterns::WORD;

/// Appended to the reasoning when quoted evidence is not in the document.
pub const NOT_FOUND_NOTE: &str = " (evidence not found verbatim in extracted text)";

/// Appended to the reasoning when only a rule keyword supports the claim.
pub const KEYWORD_NOTE: &str = " (heuristic keyword match found)";

const VERIFIED_PASS_FLOOR: i64 = 70;
const VERIFIED_PASS_CEILING: i64 = 100;
const VERIFIED_FAIL_FLOOR: i64 = 40;
const VERIFIED_FAIL_CEILING: i64 = 80;
const MISS_FLOOR: i64 = 5;
const KEYWORD_BOOST: i64 = 30;
const KEYWORD_CEILING: i64 = 60;

/// Rule tokens must be longer than this to count as keywords.
const MIN_KEYWORD_CHARS: usize = 3;

/// How a claim was scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The evidence snippet was found on a page
    Verified(SnippetLocation),

    /// Evidence was given but does not occur in the document
    NotFound { snippet: String },

    /// No evidence; a rule keyword occurs in the document
    KeywordMatch,

    /// No evidence and no keyword support
    Unsupported,
}

/// Verify a claim against the document and produce the final result.
///
/// Total: any claim shape and any page store (including an empty one)
/// yield a result with confidence in `[0, 100]`.
pub fn verify(claim: &LlmClaim, pages: &PageStore) -> RuleCheckResult {
    verify_detailed(claim, pages).0
}

/// Like [`verify`], also reporting which scoring branch was taken.
///
/// The branch formulas run on the coerced, unbounded confidence; only the
/// outcome is clamped into `[0, 100]`.
pub fn verify_detailed(
    claim: &LlmClaim,
    pages: &PageStore,
) -> (RuleCheckResult, VerificationOutcome) {
    let confidence = claim.raw_confidence();

    let mut result = RuleCheckResult {
        rule: claim.rule_text(""),
        status: claim.status_text(),
        evidence: claim.evidence_text(),
        reasoning: claim.reasoning_text(),
        confidence: 0,
    };

    let (outcome, score) = if result.evidence.is_empty() {
        score_without_evidence(&mut result, confidence, pages)
    } else {
        score_with_evidence(&mut result, confidence, pages)
    };
    result.confidence = clamp_confidence(score);

    tracing::debug!(
        rule = %result.rule,
        outcome = ?outcome,
        confidence = result.confidence,
        "Verified rule claim"
    );

    (result, outcome)
}

fn score_with_evidence(
    result: &mut RuleCheckResult,
    confidence: i64,
    pages: &PageStore,
) -> (VerificationOutcome, i64) {
    let snippet = extract_snippet(&result.evidence);

    match locate_snippet(&snippet, pages) {
        Some(location) => {
            let score = match Status::from_label(&result.status) {
                Status::Pass => confidence.clamp(VERIFIED_PASS_FLOOR, VERIFIED_PASS_CEILING),
                Status::Fail => confidence.clamp(VERIFIED_FAIL_FLOOR, VERIFIED_FAIL_CEILING),
            };
            result.evidence = canonical_evidence(&location);
            (VerificationOutcome::Verified(location), score)
        }
        None => {
            result.reasoning = annotate_trimmed(&result.reasoning, NOT_FOUND_NOTE);
            (VerificationOutcome::NotFound { snippet }, penalize(confidence))
        }
    }
}

fn score_without_evidence(
    result: &mut RuleCheckResult,
    confidence: i64,
    pages: &PageStore,
) -> (VerificationOutcome, i64) {
    let keywords = rule_keywords(&result.rule);
    if keywords.is_empty() {
        return (VerificationOutcome::Unsupported, confidence);
    }

    let matched = pages.iter().any(|page| {
        let text = page.text.to_lowercase();
        keywords.iter().any(|k| text.contains(k.as_str()))
    });

    if matched {
        result.reasoning = annotate(&result.reasoning, KEYWORD_NOTE);
        let score = confidence.saturating_add(KEYWORD_BOOST).min(KEYWORD_CEILING);
        (VerificationOutcome::KeywordMatch, score)
    } else {
        (VerificationOutcome::Unsupported, confidence)
    }
}

/// The evidence form written back for verified claims.
pub fn canonical_evidence(location: &SnippetLocation) -> String {
    format!("Found in page {}: '{}'", location.page, location.sentence)
}

/// Lower-cased rule tokens longer than three characters.
pub fn rule_keywords(rule: &str) -> Vec<String> {
    WORD.find_iter(rule)
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() > MIN_KEYWORD_CHARS)
        .map(str::to_lowercase)
        .collect()
}

/// `max(5, floor(c * 0.4))`
fn penalize(confidence: i64) -> i64 {
    confidence.saturating_mul(2).div_euclid(5).max(MISS_FLOOR)
}

fn already_annotated(reasoning: &str, note: &str) -> bool {
    reasoning.trim_end().ends_with(note.trim())
}

fn annotate(reasoning: &str, note: &str) -> String {
    if already_annotated(reasoning, note) {
        return reasoning.to_string();
    }
    format!("{}{}", reasoning, note)
}

fn annotate_trimmed(reasoning: &str, note: &str) -> String {
    if already_annotated(reasoning, note) {
        return reasoning.trim().to_string();
    }
    format!("{}{}", reasoning, note).trim().to_string()
}

impl From<&RuleCheckResult> for LlmClaim {
    fn from(result: &RuleCheckResult) -> Self {
        Self {
            rule: Some(result.rule.clone().into()),
            status: Some(result.status.clone().into()),
            evidence: Some(result.evidence.clone().into()),
            reasoning: Some(result.reasoning.clone().into()),
            confidence: Some(result.confidence.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use proptest::prelude::*;
    use serde_json::json;

    fn claim(value: serde_json::Value) -> LlmClaim {
        LlmClaim::from_value(&value)
    }

    fn inspection_page() -> PageStore {
        PageStore::from_pages(vec![Page::new(
            3,
            "The device was tested. It passed inspection.",
        )])
        .unwrap()
    }

    #[test]
    fn test_verified_pass_rewrites_evidence() {
        let c = claim(json!({
            "rule": "device is tested",
            "status": "pass",
            "evidence": "device was tested: 'The device was tested'",
            "reasoning": "stated",
            "confidence": 50
        }));
        let (result, outcome) = verify_detailed(&c, &inspection_page());

        assert_eq!(result.evidence, "Found in page 3: 'The device was tested.'");
        assert_eq!(result.confidence, 70);
        assert_eq!(result.reasoning, "stated");
        assert!(matches!(outcome, VerificationOutcome::Verified(_)));
    }

    #[test]
    fn test_verified_pass_keeps_higher_confidence() {
        let c = claim(json!({
            "status": "PASS",
            "evidence": "'It passed inspection'",
            "confidence": 95
        }));
        let result = verify(&c, &inspection_page());
        assert_eq!(result.confidence, 95);
        assert_eq!(result.status, "PASS");
        assert_eq!(result.evidence, "Found in page 3: 'It passed inspection.'");
    }

    #[test]
    fn test_verified_fail_is_capped_at_80() {
        let low = verify(
            &claim(json!({"status": "fail", "evidence": "'It passed'", "confidence": 10})),
            &inspection_page(),
        );
        assert_eq!(low.confidence, 40);

        let high = verify(
            &claim(json!({"status": "fail", "evidence": "'It passed'", "confidence": 99})),
            &inspection_page(),
        );
        assert_eq!(high.confidence, 80);
    }

    #[test]
    fn test_unknown_status_scored_as_fail() {
        let result = verify(
            &claim(json!({"status": "unclear", "evidence": "'It passed'", "confidence": 90})),
            &inspection_page(),
        );
        assert_eq!(result.confidence, 80);
        assert_eq!(result.status, "unclear");
    }

    #[test]
    fn test_missing_evidence_penalized() {
        let c = claim(json!({
            "status": "fail",
            "evidence": "'not present anywhere'",
            "reasoning": "model says so",
            "confidence": 50
        }));
        let (result, outcome) = verify_detailed(&c, &inspection_page());

        assert_eq!(result.confidence, 20);
        assert!(result.reasoning.contains("evidence not found verbatim"));
        assert_eq!(
            result.reasoning,
            "model says so (evidence not found verbatim in extracted text)"
        );
        assert_eq!(result.evidence, "'not present anywhere'");
        assert_eq!(
            outcome,
            VerificationOutcome::NotFound {
                snippet: "not present anywhere".to_string()
            }
        );
    }

    #[test]
    fn test_penalty_has_floor_of_five() {
        let result = verify(
            &claim(json!({"status": "pass", "evidence": "'nope'", "confidence": 12})),
            &inspection_page(),
        );
        assert_eq!(result.confidence, 5);
        // status is never overridden
        assert_eq!(result.status, "pass");
    }

    #[test]
    fn test_not_found_note_without_prior_reasoning_is_trimmed() {
        let result = verify(
            &claim(json!({"evidence": "'nope'", "confidence": 50})),
            &inspection_page(),
        );
        assert_eq!(result.reasoning, "(evidence not found verbatim in extracted text)");
    }

    #[test]
    fn test_reverify_does_not_duplicate_note() {
        let pages = inspection_page();
        let first = verify(
            &claim(json!({"evidence": "'nope'", "reasoning": "r", "confidence": 100})),
            &pages,
        );
        let second = verify(&LlmClaim::from(&first), &pages);

        assert_eq!(first.confidence, 40);
        assert_eq!(second.confidence, 16);
        assert_eq!(second.reasoning.matches("evidence not found").count(), 1);
    }

    #[test]
    fn test_keyword_fallback() {
        let pages = PageStore::from_texts(["Published 2024"]);
        let c = claim(json!({
            "rule": "document mentions published date",
            "status": "pass",
            "evidence": "",
            "reasoning": "looks fine",
            "confidence": 10
        }));
        let (result, outcome) = verify_detailed(&c, &pages);

        assert_eq!(result.confidence, 40);
        assert!(result.reasoning.contains("heuristic keyword match found"));
        assert_eq!(result.reasoning, "looks fine (heuristic keyword match found)");
        assert_eq!(outcome, VerificationOutcome::KeywordMatch);
    }

    #[test]
    fn test_keyword_fallback_caps_at_60() {
        let pages = PageStore::from_texts(["Published 2024"]);
        let result = verify(
            &claim(json!({"rule": "published", "confidence": 90})),
            &pages,
        );
        assert_eq!(result.confidence, 60);
    }

    #[test]
    fn test_no_evidence_no_keyword_unchanged() {
        let pages = PageStore::from_texts(["Nothing relevant here"]);
        let c = claim(json!({
            "rule": "mentions warranty terms",
            "status": "fail",
            "evidence": "",
            "reasoning": "absent",
            "confidence": 33
        }));
        let (result, outcome) = verify_detailed(&c, &pages);

        assert_eq!(result.confidence, 33);
        assert_eq!(result.reasoning, "absent");
        assert_eq!(outcome, VerificationOutcome::Unsupported);
    }

    #[test]
    fn test_short_rule_words_are_not_keywords() {
        assert_eq!(rule_keywords("is it a big one"), Vec::<String>::new());
        assert_eq!(rule_keywords("Has Title page"), vec!["title", "page"]);

        let pages = PageStore::from_texts(["it is big"]);
        let result = verify(&claim(json!({"rule": "is it big", "confidence": 10})), &pages);
        assert_eq!(result.confidence, 10);
    }

    #[test]
    fn test_malformed_confidence_coerced_to_default() {
        let pages = PageStore::from_texts(["Nothing relevant here"]);
        let c = claim(json!({
            "rule": "xyz",
            "status": "fail",
            "evidence": "",
            "reasoning": "",
            "confidence": "not-a-number"
        }));
        assert_eq!(verify(&c, &pages).confidence, 20);
    }

    #[test]
    fn test_non_string_evidence_is_coerced() {
        let pages = inspection_page();
        let c = claim(json!({
            "status": "pass",
            "evidence": ["Found in page 3: 'It passed inspection'", "other"],
            "confidence": 50
        }));
        let result = verify(&c, &pages);
        assert_eq!(result.evidence, "Found in page 3: 'It passed inspection.'");

        let c = claim(json!({"status": "pass", "evidence": {"page": 3}, "confidence": 50}));
        assert_eq!(verify(&c, &pages).evidence, "");
    }

    #[test]
    fn test_empty_store() {
        let c = claim(json!({"evidence": "'x'", "confidence": 50}));
        assert_eq!(verify(&c, &PageStore::default()).confidence, 20);

        let c = claim(json!({"rule": "anything goes", "confidence": 50}));
        assert_eq!(verify(&c, &PageStore::default()).confidence, 50);
    }

    #[test]
    fn test_penalize_values() {
        assert_eq!(penalize(100), 40);
        assert_eq!(penalize(50), 20);
        assert_eq!(penalize(49), 19);
        assert_eq!(penalize(0), 5);
        assert_eq!(penalize(150), 60);
        assert_eq!(penalize(-10), 5);
        assert_eq!(penalize(i64::MAX), i64::MAX / 5);
    }

    #[test]
    fn test_out_of_range_confidence_scored_before_clamping() {
        let pages = PageStore::from_pages(vec![Page::new(
            3,
            "The device was tested. It passed inspection.",
        )])
        .unwrap();

        let miss = claim(json!({"status": "pass", "evidence": "'absent text'", "confidence": 150}));
        assert_eq!(verify(&miss, &pages).confidence, 60);

        let keyword = claim(json!({"rule": "device inspection", "confidence": -10}));
        let (result, outcome) = verify_detailed(&keyword, &pages);
        assert_eq!(outcome, VerificationOutcome::KeywordMatch);
        assert_eq!(result.confidence, 20);

        let verified = claim(json!({"status": "pass", "evidence": "'It passed inspection'", "confidence": 900}));
        assert_eq!(verify(&verified, &pages).confidence, 100);

        let unsupported = claim(json!({"rule": "zzzz", "confidence": -40}));
        assert_eq!(verify(&unsupported, &pages).confidence, 0);
    }

    #[test]
    fn test_bare_page_label_is_not_evidence() {
        let bare = claim(json!({"status": "pass", "evidence": "Page 3: ", "confidence": 50}));
        let (result, outcome) = verify_detailed(&bare, &inspection_page());
        assert!(matches!(outcome, VerificationOutcome::NotFound { .. }));
        assert_eq!(result.confidence, 20);
    }

    proptest! {
        #[test]
        fn prop_verify_is_total(
            evidence in proptest::option::of(".{0,40}"),
            confidence in proptest::option::of(any::<i64>()),
            status in "(pass|fail|PASS|[a-z]{0,5})",
            rule in "[a-zA-Z ]{0,30}",
            texts in proptest::collection::vec("[a-zA-Z .!?']{0,60}", 0..4),
        ) {
            let mut value = json!({"rule": rule, "status": status});
            if let Some(e) = evidence {
                value["evidence"] = json!(e);
            }
            if let Some(c) = confidence {
                value["confidence"] = json!(c);
            }
            let pages = PageStore::from_texts(texts);
            let result = verify(&claim(value), &pages);
            prop_assert!(result.confidence <= 100);
        }

        #[test]
        fn prop_verified_evidence_is_canonical(
            sentence in "[A-Z][a-z]{2,10}( [a-z]{2,8}){1,4}\\.",
            page in 1u32..50,
        ) {
            let pages = PageStore::from_pages(vec![Page::new(page, &sentence)]).unwrap();
            let quoted = sentence.trim_end_matches('.').to_string();
            let c = claim(json!({
                "status": "pass",
                "evidence": format!("Found: '{}'", quoted),
                "confidence": 0
            }));
            let result = verify(&c, &pages);
            prop_assert_eq!(result.evidence, format!("Found in page {}: '{}'", page, sentence));
            prop_assert_eq!(result.confidence, 70);
        }
    }
}
