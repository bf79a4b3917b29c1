//! Token usage records and cumulative tracking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Usage of one completed exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub key: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(key: impl Into<String>, prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            key: key.into(),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Cost at `price` per 1000 tokens.
    pub fn cost(&self, price: f64) -> f64 {
        self.total_tokens as f64 / 1000.0 * price
    }
}

/// Prompt/completion token pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenTotals {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }

    fn add(&mut self, usage: &Usage) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
    }
}

/// Tracks cumulative usage overall and per key.
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    total: TokenTotals,
    by_key: HashMap<String, TokenTotals>,
    call_count: u64,
    cost: f64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one exchange billed at `price` per 1000 tokens.
    pub fn record(&mut self, usage: &Usage, price: f64) {
        self.total.add(usage);
        self.by_key.entry(usage.key.clone()).or_default().add(usage);
        self.call_count += 1;
        self.cost += usage.cost(price);
    }

    pub fn total(&self) -> &TokenTotals {
        &self.total
    }

    pub fn for_key(&self, key: &str) -> Option<&TokenTotals> {
        self.by_key.get(key)
    }

    pub fn total_tokens(&self) -> u64 {
        self.total.total_tokens()
    }

    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
