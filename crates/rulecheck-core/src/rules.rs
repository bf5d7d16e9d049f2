//! Rule sets loaded from YAML/JSON.
//!
//! A rule set is an ordered list of natural-language rules. Results are
//! always reported in the order rules appear here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading rule sets.
#[derive(Error, Debug)]
pub enum RuleSetError {
    #[error("Failed to read rule file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Rule set validation failed: {0}")]
    ValidationError(String),
}

/// A rule entry: bare text or a `{rule: ...}` object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RuleEntry {
    Text(String),
    Object(RuleObject),
}

/// Object form of a rule entry. Results carry only the rule text, so
/// other keys (such as `id`) are rejected rather than silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleObject {
    pub rule: String,
}

impl RuleEntry {
    pub fn text(&self) -> &str {
        match self {
            RuleEntry::Text(rule) => rule,
            RuleEntry::Object(object) => &object.rule,
        }
    }
}

/// Wire shape of a rule file: a list, or a mapping with `rules`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RuleFile {
    List(Vec<RuleEntry>),
    Named {
        #[serde(default)]
        name: Option<String>,
        rules: Vec<RuleEntry>,
    },
}

/// An ordered set of rules to check a document against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RuleSet {
    /// Optional human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Rules in submission order
    pub rules: Vec<String>,
}

impl RuleSet {
    /// Create a rule set from rule texts.
    pub fn new<I, S>(rules: I) -> Result<Self, RuleSetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = Self {
            name: None,
            rules: rules.into_iter().map(Into::into).collect(),
        };
        set.validate()?;
        Ok(set)
    }

    /// Parse a rule set from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuleSetError> {
        let file: RuleFile = serde_yaml::from_str(yaml)?;
        Self::from_file_shape(file)
    }

    /// Parse a rule set from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, RuleSetError> {
        let file: RuleFile = serde_json::from_str(json)?;
        Self::from_file_shape(file)
    }

    /// Load a rule set from a file, choosing the format by extension.
    ///
    /// `.json` is parsed as JSON; anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    fn from_file_shape(file: RuleFile) -> Result<Self, RuleSetError> {
        let (name, entries) = match file {
            RuleFile::List(entries) => (None, entries),
            RuleFile::Named { name, rules } => (name, rules),
        };
        let set = Self {
            name,
            rules: entries.iter().map(|e| e.text().to_string()).collect(),
        };
        set.validate()?;
        Ok(set)
    }

    /// Append more rules, keeping order.
    pub fn extend<I, S>(&mut self, rules: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.extend(rules.into_iter().map(Into::into));
    }

    /// Validate the rule set structure.
    pub fn validate(&self) -> Result<(), RuleSetError> {
        if self.rules.is_empty() {
            return Err(RuleSetError::ValidationError(
                "at least one rule is required".to_string(),
            ));
        }

        if let Some(position) = self.rules.iter().position(|r| r.trim().is_empty()) {
            return Err(RuleSetError::ValidationError(format!(
                "rule {} is blank",
                position + 1
            )));
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(String::as_str)
    }
}
