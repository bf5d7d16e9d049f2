//! # rulecheck-runtime
//!
//! The I/O side of rulecheck: PDF text extraction (with optional OCR),
//! LLM providers and a concurrent [`RuleChecker`].
//!
//! All scoring decisions live in `rulecheck-core`. This crate only gets
//! text in and model replies out; whatever a provider returns, including
//! an error, is handed to the core parser as text.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rulecheck_runtime::{extract_file, PdfExtractor, ProviderRegistry, RuleChecker, RuntimeConfig};
//! use rulecheck_core::RuleSet;
//!
//! let pages = extract_file(&PdfExtractor::new(), "contract.pdf");
//! let rules = RuleSet::new(["The document states a termination notice period"])?;
//!
//! let checker = RuleChecker::from_config(RuntimeConfig::default(), &ProviderRegistry::with_defaults())?;
//! let report = checker.check(&pages, &rules).await.with_document("contract.pdf");
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

pub mod checker;
pub mod config;
pub mod extract;
pub mod providers;
pub mod usage;

pub use checker::{CheckReport, CheckerError, RuleChecker, RuleCheckerBuilder};
pub use config::{ConfigError, RetryConfig, RuntimeConfig};
pub use extract::{
    extract_file, OcrCapability, OcrEngine, OcrError, PageExtractor, PdfExtractor, TesseractOcr,
};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderFactory, ProviderRegistry, TokenUsage,
};
pub use usage::{LlmUsage, UsageTracker};
