//! `cost_limit` and `latency_limit` assertion evaluation.

use rust_decimal::Decimal;
use salvo_types::{EvalResult, Trace};

/// Evaluate a `cost_limit` assertion.
///
/// An unknown total cost (pricing table had no entry for the model used)
/// cannot be compared against a limit, so the assertion fails rather than
/// silently passing — a hard fail here is a signal to add the model to the
/// pricing table, not a false pass.
pub fn evaluate_cost_limit(trace: &Trace, max_usd: Decimal, weight: f64, required: bool) -> EvalResult {
    match trace.total_cost_usd {
        Some(actual) => {
            let passed = actual <= max_usd;
            EvalResult::boolean("cost_limit", passed, weight, required, format!("cost ${actual} against limit ${max_usd}"))
        }
        None => EvalResult::boolean("cost_limit", false, weight, required, "trial cost is unknown (unpriced model), cannot evaluate cost_limit".to_string()),
    }
}

/// Evaluate a `latency_limit` assertion against the trial's total
/// wall-clock latency.
pub fn evaluate_latency_limit(trace: &Trace, max_seconds: f64, weight: f64, required: bool) -> EvalResult {
    let actual_seconds = trace.total_latency_ms as f64 / 1000.0;
    let passed = actual_seconds <= max_seconds;
    EvalResult::boolean("latency_limit", passed, weight, required, format!("latency {actual_seconds:.2}s against limit {max_seconds:.2}s"))
}
