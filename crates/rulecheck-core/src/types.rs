//! Core result types.

use serde::{Deserialize, Serialize};

/// Default confidence when the model gives none (or an unusable one).
pub const DEFAULT_CONFIDENCE: u8 = 20;

/// Pass/fail outcome of a rule check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
}

impl Status {
    /// Interpret a model-supplied status label.
    ///
    /// Only `pass` (any case, surrounding whitespace ignored) counts as a
    /// pass; every other label is a fail.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("pass") {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final, verified judgment for one (document, rule) pair.
///
/// Serializes to exactly five keys: `rule`, `status`, `evidence`,
/// `reasoning`, `confidence`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleCheckResult {
    /// The rule that was checked
    pub rule: String,

    /// Status label as the model wrote it (never overridden by verification)
    pub status: String,

    /// Evidence, rewritten to `Found in page N: '...'` when verified
    pub evidence: String,

    /// Model reasoning plus any verification annotation
    pub reasoning: String,

    /// Calibrated confidence, 0-100
    pub confidence: u8,
}

impl RuleCheckResult {
    /// Interpreted status.
    pub fn status_kind(&self) -> Status {
        Status::from_label(&self.status)
    }

    /// Whether the model judged the rule as satisfied.
    pub fn passed(&self) -> bool {
        self.status_kind() == Status::Pass
    }
}
