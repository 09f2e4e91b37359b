//! Human-readable renderings of core output types. `--json` bypasses all of
//! this and prints the serialized value directly.

use salvo_record::ReplayView;
use salvo_runner::RunnerEvent;
use salvo_types::{RevalResult, SuiteResult, Verdict};

/// One-line progress rendering for a single `RunnerEvent`, printed as a run
/// executes rather than buffered for the final report.
pub fn runner_event(event: &RunnerEvent) -> String {
    match event {
        RunnerEvent::TurnStarted { trial_index, turn } => format!("trial {trial_index}: turn {turn} started\n"),
        RunnerEvent::ToolResolved { trial_index, turn, tool, resolved } => {
            let status = if *resolved { "resolved" } else { "no mock found" };
            format!("trial {trial_index}: turn {turn}: tool '{tool}' {status}\n")
        }
        RunnerEvent::TrialFinished { trial_index, stop_condition } => format!("trial {trial_index}: finished ({stop_condition:?})\n"),
    }
}

pub fn suite_result(result: &SuiteResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("scenario: {}\n", result.scenario_id));
    out.push_str(&format!("verdict:  {}\n", verdict_label(result.verdict)));
    out.push_str(&format!("trials:   {}\n", result.trials.len()));
    out.push_str(&format!("pass rate: {:.0}%\n", result.pass_rate * 100.0));
    out.push_str(&format!("mean score: {:.3}\n", result.mean_score));
    out.push_str(&format!("latency p50/p95: {:.0}ms / {:.0}ms\n", result.latency_p50_ms, result.latency_p95_ms));
    match result.cost_total_usd {
        Some(cost) => out.push_str(&format!("agent cost: ${cost}\n")),
        None => out.push_str("agent cost: unknown (unpriced trial)\n"),
    }
    match result.judge_cost_total_usd {
        Some(cost) if cost > rust_decimal::Decimal::ZERO => out.push_str(&format!("judge cost: ${cost}\n")),
        _ => {}
    }
    if !result.failure_ranking.is_empty() {
        out.push_str("\ntop failures:\n");
        for row in result.failure_ranking.iter().take(5) {
            out.push_str(&format!(
                "  [{}] {} — failed {}x, avg weight lost {:.2}\n",
                row.assertion_index, row.assertion_type, row.failure_count, row.average_weight_lost
            ));
            if let Some(sample) = row.sample_explanations.first() {
                out.push_str(&format!("      e.g. {sample}\n"));
            }
        }
    }
    out
}

fn verdict_label(v: Verdict) -> &'static str {
    match v {
        Verdict::Pass => "PASS",
        Verdict::Fail => "FAIL",
        Verdict::HardFail => "HARD_FAIL",
        Verdict::Partial => "PARTIAL",
        Verdict::InfraError => "INFRA_ERROR",
    }
}

pub fn replay_view(view: &ReplayView) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} trace {}\n", view.banner, view.trace_id));
    out.push_str(&format!("mode: {:?}\n", view.mode));
    out.push_str(&format!("stop condition: {:?}\n", view.stop_condition));
    out.push_str(&format!("cost: {}\n", view.cost_label));
    out.push_str(&format!("latency: {}\n", view.latency_label));
    if !view.tool_call_sequence.is_empty() {
        out.push_str(&format!("tool calls: {}\n", view.tool_call_sequence.join(" -> ")));
    }
    if let Some(final_output) = &view.final_output {
        out.push_str(&format!("final output: {final_output}\n"));
    }
    out
}

pub fn reval_result(result: &RevalResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("reval: {}\n", result.reval_id));
    out.push_str(&format!("original trace: {}\n", result.original_trace_id));
    out.push_str(&format!("scenario hash at re-eval: {}\n", result.scenario_hash_at_reeval));
    out.push_str(&format!("score: {:.3}\n", result.score));
    out.push_str(&format!("passed: {}\n", result.passed));
    out.push_str(&format!("assertions evaluated: {}\n", result.eval_results.len()));
    out
}
