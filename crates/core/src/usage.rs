// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token usage accounting
//!
//! Adapters with `output_format: json` report usage incrementally; the step
//! executor accumulates it here and the relay engine compares the running
//! total against the persona's context window.

use serde::{Deserialize, Serialize};

/// Cumulative token usage for one adapter invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Fold another report into this one.
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }

    /// Usage as a percentage of a context window. Zero-width windows read
    /// as fully consumed.
    pub fn percent_of(&self, context_window: u64) -> f64 {
        if context_window == 0 {
            return 100.0;
        }
        (self.total() as f64 / context_window as f64) * 100.0
    }

    /// True once usage reaches `threshold_percent` of the window.
    pub fn crossed_threshold(&self, threshold_percent: u8, context_window: u64) -> bool {
        self.percent_of(context_window) >= f64::from(threshold_percent)
    }
}

#[cfg(test)]
#[path = "usage_tests.rs"]
mod tests;
