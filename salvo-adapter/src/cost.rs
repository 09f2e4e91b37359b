//! Static cost estimation from token usage.
//!
//! Pricing is a pure lookup, not a network call: a small table of known
//! models plus an alias map for dated/versioned model strings. A model this
//! table doesn't know about prices as `None`, never `0` — zero cost is an
//! assertion-worthy fact about a model, not a stand-in for "unknown".

use rust_decimal::Decimal;
use salvo_types::TokenUsage;
use std::collections::HashMap;
use std::sync::LazyLock;

/// USD price per token, input and output, for one model.
#[derive(Debug, Clone, Copy)]
struct Rate {
    input_per_token: Decimal,
    output_per_token: Decimal,
}

fn per_million(input_usd: i64, output_usd: i64) -> Rate {
    Rate {
        input_per_token: Decimal::new(input_usd, 0) / Decimal::new(1_000_000, 0),
        output_per_token: Decimal::new(output_usd, 0) / Decimal::new(1_000_000, 0),
    }
}

static PRICING: LazyLock<HashMap<&'static str, Rate>> = LazyLock::new(|| {
    HashMap::from([
        ("gpt-4o", per_million(5, 15)),
        ("gpt-4o-mini", per_million(0, 1)),
        ("gpt-4-turbo", per_million(10, 30)),
        ("claude-3-5-sonnet", per_million(3, 15)),
        ("claude-3-5-haiku", per_million(1, 5)),
        ("claude-3-opus", per_million(15, 75)),
    ])
});

/// Aliases so that dated/versioned model strings resolve to a base rate
/// (e.g. `"gpt-4o-2024-08-06"` and `"gpt-4o-mini-2024-07-18"` both resolve
/// through here, in addition to an exact match in `PRICING`).
static ALIASES: LazyLock<Vec<(&'static str, &'static str)>> = LazyLock::new(|| {
    vec![
        ("gpt-4o-mini", "gpt-4o-mini"),
        ("gpt-4o", "gpt-4o"),
        ("gpt-4-turbo", "gpt-4-turbo"),
        ("claude-3-5-sonnet", "claude-3-5-sonnet"),
        ("claude-3-5-haiku", "claude-3-5-haiku"),
        ("claude-3-opus", "claude-3-opus"),
    ]
});

fn resolve_rate(model: &str) -> Option<Rate> {
    if let Some(rate) = PRICING.get(model) {
        return Some(*rate);
    }
    ALIASES
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .and_then(|(_, canonical)| PRICING.get(canonical))
        .copied()
}

/// Estimate the USD cost of a single adapter call from its model and token
/// usage. Returns `None` if the model isn't in the pricing table.
pub fn estimate_cost(model: &str, usage: TokenUsage) -> Option<Decimal> {
    let rate = resolve_rate(model)?;
    let input_cost = rate.input_per_token * Decimal::new(usage.input_tokens as i64, 0);
    let output_cost = rate.output_per_token * Decimal::new(usage.output_tokens as i64, 0);
    Some(input_cost + output_cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_prices_nonzero() {
        let usage = TokenUsage { input_tokens: 1000, output_tokens: 1000 };
        let cost = estimate_cost("gpt-4o", usage).unwrap();
        assert!(cost > Decimal::ZERO);
    }

    #[test]
    fn dated_model_resolves_via_alias() {
        let usage = TokenUsage { input_tokens: 1000, output_tokens: 1000 };
        let dated = estimate_cost("gpt-4o-2024-08-06", usage);
        let base = estimate_cost("gpt-4o", usage);
        assert_eq!(dated, base);
    }

    #[test]
    fn unknown_model_prices_as_none_never_zero() {
        let usage = TokenUsage { input_tokens: 1000, output_tokens: 1000 };
        assert_eq!(estimate_cost("some-unreleased-model-x1", usage), None);
    }

    #[test]
    fn zero_usage_is_zero_not_none_for_known_model() {
        let usage = TokenUsage::default();
        assert_eq!(estimate_cost("gpt-4o-mini", usage), Some(Decimal::ZERO));
    }
}
