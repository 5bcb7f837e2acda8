//! Cost estimation: a static per-model rate table.
//!
//! Rates drift from real provider pricing; the result is a best-effort
//! display value, never a billing source of truth.

use std::fmt;

use serde::{Serialize, Serializer};

use super::types::Provider;

/// Estimated cost in integer micro-USD. Fixed-precision by construction;
/// rendered with six decimal places, never via floating arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostUsd(pub u64);

impl fmt::Display for CostUsd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

impl Serialize for CostUsd {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Micro-USD per 1000 tokens.
const OPENAI_RATES: &[(&str, u64)] = &[
    ("gpt-4", 60_000),
    ("gpt-4-turbo", 30_000),
    ("gpt-3.5-turbo", 2_000),
];
const OPENAI_DEFAULT_RATE: u64 = 30_000;

const ANTHROPIC_RATES: &[(&str, u64)] = &[
    ("claude-3-opus", 75_000),
    ("claude-3-sonnet", 15_000),
    ("claude-3-haiku", 2_500),
];
const ANTHROPIC_DEFAULT_RATE: u64 = 15_000;

pub fn estimate(provider: Provider, model: &str, tokens_used: i64) -> CostUsd {
    let (table, fallback) = match provider {
        Provider::OpenAi => (OPENAI_RATES, OPENAI_DEFAULT_RATE),
        Provider::Anthropic => (ANTHROPIC_RATES, ANTHROPIC_DEFAULT_RATE),
    };

    let rate = table
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, rate)| *rate)
        .unwrap_or(fallback);

    let tokens = tokens_used.max(0) as u64;
    CostUsd(tokens * rate / 1000)
}
