//! Token and cost accounting for the LLM calls of one check request.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::providers::TokenUsage;

/// Accumulated LLM usage for a check request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Total tokens used
    pub total_tokens: u32,

    /// Prompt/input tokens
    pub prompt_tokens: u32,

    /// Completion/output tokens
    pub completion_tokens: u32,

    /// Number of successful LLM calls
    pub llm_calls: u32,

    /// Calls that ended in an error after retries
    pub failed_calls: u32,

    /// Estimated cost in USD
    pub estimated_cost: f64,

    /// Tokens written to cache
    pub cache_creation_tokens: u32,

    /// Tokens read from cache
    pub cache_read_tokens: u32,
}

impl LlmUsage {
    /// Add token usage from a provider response.
    pub fn add(&mut self, usage: &TokenUsage, model: &str) {
        // Counters saturate; a provider can report any u32.
        self.prompt_tokens = self.prompt_tokens.saturating_add(usage.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(usage.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(usage.total());
        self.llm_calls = self.llm_calls.saturating_add(1);
        self.cache_creation_tokens = self
            .cache_creation_tokens
            .saturating_add(usage.cache_creation_tokens);
        self.cache_read_tokens = self.cache_read_tokens.saturating_add(usage.cache_read_tokens);

        self.estimated_cost += Self::estimate_cost(usage, model);
    }

    /// Estimate cost in USD for a usage entry.
    pub fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
        // Pricing per million tokens: input, output, cache write, cache read
        let (input_rate, output_rate, cache_write_rate, cache_read_rate) = match model {
            m if m.contains("sonnet") => (3.0, 15.0, 3.75, 0.3),
            m if m.contains("opus") => (5.0, 25.0, 6.25, 0.5),
            m if m.contains("haiku") => (1.0, 5.0, 1.25, 0.1),
            m if m.contains("flash-lite") => (0.10, 0.40, 0.0, 0.025),
            m if m.contains("flash") => (0.30, 2.50, 0.0, 0.075),
            m if m.contains("gemini") && m.contains("pro") => (1.25, 10.0, 0.0, 0.31),
            _ => (3.0, 15.0, 3.75, 0.3),
        };

        let per_token = |count: u32, rate: f64| (count as f64 / 1_000_000.0) * rate;

        per_token(usage.prompt_tokens, input_rate)
            + per_token(usage.completion_tokens, output_rate)
            + per_token(usage.cache_creation_tokens, cache_write_rate)
            + per_token(usage.cache_read_tokens, cache_read_rate)
    }
}

/// Usage shared by the concurrent calls of a single request.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: RwLock<LlmUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful call.
    pub fn record(&self, usage: &TokenUsage, model: &str) {
        self.usage.write().add(usage, model);
    }

    /// Record a call that failed after all retries.
    pub fn record_failure(&self) {
        let mut usage = self.usage.write();
        usage.failed_calls = usage.failed_calls.saturating_add(1);
    }

    /// Snapshot of the usage so far.
    pub fn snapshot(&self) -> LlmUsage {
        self.usage.read().clone()
    }

    pub fn into_usage(self) -> LlmUsage {
        self.usage.into_inner()
    }
}
