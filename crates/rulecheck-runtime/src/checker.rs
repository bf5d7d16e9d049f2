//! Concurrent rule checking against an LLM provider.
//!
//! One prompt per rule is sent to the provider with bounded concurrency.
//! Each call gets a timeout and bounded exponential retry; a call that
//! still fails is turned into an error string and handed to the response
//! parser, so the rule degrades to a low-confidence `fail` instead of
//! failing the whole check.

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rulecheck_core::{build_prompt, score_response, PageStore, RuleCheckResult, RuleSet, SYSTEM_PROMPT};

use crate::config::{ConfigError, RetryConfig, RuntimeConfig};
use crate::providers::{
    ChatMessage, CompletionConfig, LlmProvider, ProviderError, ProviderRegistry,
};
use crate::usage::{LlmUsage, UsageTracker};

/// Errors building a [`RuleChecker`]. Checking itself never fails.
#[derive(Error, Debug)]
pub enum CheckerError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Outcome of checking a rule set against one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    /// Document name, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,

    pub page_count: usize,

    pub checked_at: DateTime<Utc>,

    pub provider: String,

    pub model: String,

    /// One result per rule, in submission order
    pub results: Vec<RuleCheckResult>,

    pub usage: LlmUsage,
}

impl CheckReport {
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Number of rules whose status is `pass`.
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }
}

/// Checks rule sets against documents through an [`LlmProvider`].
pub struct RuleChecker {
    provider: Arc<dyn LlmProvider>,
    completion: CompletionConfig,
    retry: RetryConfig,
    max_concurrency: usize,
}

impl std::fmt::Debug for RuleChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleChecker")
            .field("provider", &self.provider.name())
            .field("model", &self.completion.model)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl RuleChecker {
    pub fn builder() -> RuleCheckerBuilder {
        RuleCheckerBuilder::new()
    }

    /// Create the configured provider from `registry` and build a checker.
    pub fn from_config(
        config: RuntimeConfig,
        registry: &ProviderRegistry,
    ) -> Result<Self, CheckerError> {
        config.validate()?;
        registry.validate(&config.provider, &config.provider_options)?;

        let provider = registry.create(&config.provider, &config.provider_options)?;
        let default_model = registry.default_model(&config.provider).unwrap_or_default();

        RuleCheckerBuilder::new()
            .provider(provider)
            .default_model(default_model)
            .config(config)
            .build()
    }

    pub fn model(&self) -> &str {
        &self.completion.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Check every rule against `pages`.
    ///
    /// Results come back in rule order regardless of which call finishes
    /// first. When the provider fails its health check no call is made and
    /// every rule degrades to a low-confidence `fail`.
    pub async fn check(&self, pages: &PageStore, rules: &RuleSet) -> CheckReport {
        let usage = UsageTracker::new();

        tracing::info!(
            rules = rules.len(),
            pages = pages.len(),
            provider = self.provider.name(),
            model = %self.completion.model,
            "Checking rules"
        );

        let results: Vec<RuleCheckResult> = if self.provider.health_check().await {
            stream::iter(rules.iter())
                .map(|rule| self.check_rule(pages, rule, &usage))
                .buffered(self.max_concurrency)
                .collect()
                .await
        } else {
            tracing::warn!(
                provider = self.provider.name(),
                "Provider failed its health check, skipping LLM calls"
            );
            let reply = format!("LLM call failed: provider {} is unavailable", self.provider.name());
            rules
                .iter()
                .map(|rule| {
                    usage.record_failure();
                    score_response(pages, rule, &reply)
                })
                .collect()
        };

        CheckReport {
            document: None,
            page_count: pages.len(),
            checked_at: Utc::now(),
            provider: self.provider.name().to_string(),
            model: self.completion.model.clone(),
            results,
            usage: usage.into_usage(),
        }
    }

    async fn check_rule(&self, pages: &PageStore, rule: &str, usage: &UsageTracker) -> RuleCheckResult {
        let prompt = build_prompt(pages, rule);
        let raw = self.generate(prompt, rule, usage).await;
        let result = score_response(pages, rule, &raw);

        tracing::debug!(
            rule,
            status = %result.status,
            confidence = result.confidence,
            "Rule checked"
        );
        result
    }

    /// Run the LLM call; failures become an error-describing reply.
    async fn generate(&self, prompt: String, rule: &str, usage: &UsageTracker) -> String {
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];

        let provider = &self.provider;
        let config = &self.completion;
        let messages = &messages;

        let attempt = || async move {
            match tokio::time::timeout(config.timeout, provider.complete(messages.clone(), config))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(config.timeout)),
            }
        };

        let outcome = attempt
            .retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(ProviderError::is_retryable)
            .notify(|e: &ProviderError, delay: Duration| {
                tracing::warn!(rule, error = %e, delay = ?delay, "LLM call failed, retrying");
            })
            .await;

        match outcome {
            Ok(response) => {
                usage.record(&response.usage, &response.model);
                response.content
            }
            Err(e) => {
                tracing::warn!(rule, error = %e, "LLM call failed");
                usage.record_failure();
                format!("LLM call failed: {}", e)
            }
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.retry.min_delay)
            .with_max_delay(self.retry.max_delay)
            .with_max_times(self.retry.max_attempts.saturating_sub(1) as usize)
            .with_jitter()
    }
}

/// Builder for [`RuleChecker`].
pub struct RuleCheckerBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    config: RuntimeConfig,
    default_model: Option<String>,
}

impl RuleCheckerBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: RuntimeConfig::default(),
            default_model: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Model used when the config does not name one.
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn build(self) -> Result<RuleChecker, CheckerError> {
        let provider = self
            .provider
            .ok_or_else(|| CheckerError::ProviderNotConfigured("No provider set".to_string()))?;

        self.config.validate()?;

        let default_model = self.default_model.unwrap_or_default();
        let completion = self.config.completion_config(&default_model);
        if completion.model.trim().is_empty() {
            return Err(ConfigError::Invalid("no model configured".to_string()).into());
        }

        Ok(RuleChecker {
            provider,
            completion,
            retry: self.config.retry,
            max_concurrency: self.config.max_concurrency,
        })
    }
}

impl Default for RuleCheckerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
