//! `judge` assertion evaluation: k-vote LLM scoring with median aggregation.

use rust_decimal::Decimal;
use salvo_adapter::cost::estimate_cost;
use salvo_adapter::registry::AdapterDyn;
use salvo_types::{AdapterConfig, Criterion, EvalResult, Message, Role, ToolDefinition, Trace};
use std::collections::BTreeMap;
use std::sync::Arc;

const SUBMIT_SCORES_TOOL: &str = "submit_scores";

fn submit_scores_tool(criteria: &[Criterion]) -> ToolDefinition {
    let properties: serde_json::Map<String, serde_json::Value> = criteria
        .iter()
        .map(|c| {
            (
                c.name.clone(),
                serde_json::json!({
                    "type": "number",
                    "minimum": 0,
                    "maximum": 1,
                    "description": c.description,
                }),
            )
        })
        .collect();

    ToolDefinition {
        name: SUBMIT_SCORES_TOOL.into(),
        description: "Submit a score from 0.0 to 1.0 for each criterion.".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": criteria.iter().map(|c| c.name.clone()).collect::<Vec<_>>(),
        }),
        mock_response: serde_json::Value::Null,
    }
}

fn build_prompt(trace: &Trace, criteria: &[Criterion], custom_prompt: Option<&str>) -> String {
    if let Some(custom) = custom_prompt {
        return custom.to_string();
    }
    let criteria_list = criteria.iter().map(|c| format!("- {}: {}", c.name, c.description)).collect::<Vec<_>>().join("\n");
    let transcript = render_transcript(trace);
    format!(
        "You are grading an AI agent's conversation transcript against the following criteria:\n{criteria_list}\n\n\
         Transcript:\n{transcript}\n\n\
         Call `{SUBMIT_SCORES_TOOL}` with a score from 0.0 to 1.0 for each criterion."
    )
}

fn render_transcript(trace: &Trace) -> String {
    let mut out = String::new();
    for turn in &trace.turns {
        if !turn.assistant_content.is_empty() {
            out.push_str(&format!("assistant: {}\n", turn.assistant_content));
        }
        for call in &turn.tool_calls {
            out.push_str(&format!("tool_call: {}({})\n", call.name, serde_json::Value::Object(call.arguments.clone())));
        }
        for result in &turn.tool_results {
            out.push_str(&format!("tool_result[{}]: {}\n", result.tool_name.as_deref().unwrap_or(""), result.content));
        }
    }
    out
}

/// One vote's raw per-criterion scores, parsed from either a tool call or a
/// JSON object embedded in the model's text response.
fn parse_vote(assistant_content: &str, tool_calls: &[salvo_types::ToolCall]) -> Option<BTreeMap<String, f64>> {
    if let Some(call) = tool_calls.iter().find(|c| c.name == SUBMIT_SCORES_TOOL) {
        return Some(object_to_scores(&call.arguments));
    }
    let json = extract_json_object(assistant_content)?;
    let obj = json.as_object()?;
    Some(object_to_scores(obj))
}

fn object_to_scores(obj: &serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, f64> {
    obj.iter().filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n.clamp(0.0, 1.0)))).collect()
}

/// Pull a JSON object out of a judge's free-text response, trying
/// progressively looser strategies: the whole response is valid JSON; the
/// first brace-depth-balanced substring is; a fenced ```json code block
/// contains one. Stops at the first strategy that parses.
fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(text.trim()) {
        if v.is_object() {
            return Some(v);
        }
    }

    if let Some(v) = first_balanced_object(text) {
        return Some(v);
    }

    extract_fenced_json(text)
}

/// Scans for the first `{...}` substring whose braces are balanced,
/// ignoring braces that appear inside string literals.
fn first_balanced_object(text: &str) -> Option<serde_json::Value> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset;
                    return serde_json::from_str(&text[start..=end]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts JSON from a fenced ```json ... ``` (or bare ``` ... ```) block.
fn extract_fenced_json(text: &str) -> Option<serde_json::Value> {
    let fence_start = text.find("```")?;
    let after_fence = &text[fence_start + 3..];
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let fence_end = body.find("```")?;
    serde_json::from_str(body[..fence_end].trim()).ok()
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Run k independent judge votes and aggregate them into a weighted score.
#[allow(clippy::too_many_arguments)]
pub async fn evaluate_judge(
    trace: &Trace,
    criteria: &[Criterion],
    judge_model: Option<&str>,
    default_judge_model: &str,
    k: u32,
    include_system_prompt: bool,
    scenario_system_prompt: Option<&str>,
    custom_prompt: Option<&str>,
    temperature: f64,
    threshold: f64,
    weight: f64,
    required: bool,
    judge_adapter: &Arc<dyn AdapterDyn>,
) -> EvalResult {
    let model = judge_model.unwrap_or(default_judge_model).to_string();
    let tool = submit_scores_tool(criteria);
    let prompt = build_prompt(trace, criteria, custom_prompt);

    let mut messages = Vec::new();
    if include_system_prompt {
        if let Some(system) = scenario_system_prompt {
            messages.push(Message::text(Role::System, format!("The agent under evaluation was given this system prompt:\n{system}")));
        }
    }
    messages.push(Message::text(Role::User, prompt));

    let config = AdapterConfig { model, temperature: Some(temperature), max_tokens: Some(1024), ..Default::default() };

    let mut votes: Vec<BTreeMap<String, f64>> = Vec::new();
    let mut cost = Some(Decimal::ZERO);
    for vote_index in 0..k.max(1) {
        match judge_adapter.send_turn_boxed(&messages, std::slice::from_ref(&tool), &config).await {
            Ok(result) => {
                cost = match (cost, estimate_cost(&config.model, result.usage)) {
                    (Some(acc), Some(c)) => Some(acc + c),
                    _ => None,
                };
                match parse_vote(&result.assistant_content, &result.tool_calls) {
                    Some(scores) => votes.push(scores),
                    None => tracing::warn!(vote = vote_index, "judge vote produced no parseable scores"),
                }
            }
            Err(e) => tracing::warn!(vote = vote_index, error = %e, "judge vote failed"),
        }
    }

    if votes.is_empty() {
        let mut result = EvalResult::boolean("judge", false, weight, required, "no judge vote produced a usable score".to_string());
        result.judge_cost_usd = cost;
        return result;
    }

    let mut judge_detail = BTreeMap::new();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for criterion in criteria {
        let per_vote: Vec<f64> = votes.iter().filter_map(|v| v.get(&criterion.name).copied()).collect();
        if per_vote.is_empty() {
            continue;
        }
        let m = median(per_vote);
        judge_detail.insert(criterion.name.clone(), m);
        weighted_sum += m * criterion.weight;
        weight_total += criterion.weight;
    }

    let score = if weight_total > 0.0 { weighted_sum / weight_total } else { 0.0 };
    let passed = score >= threshold;

    EvalResult {
        assertion_index: 0,
        assertion_type: "judge".into(),
        passed,
        weight,
        required,
        score,
        explanation: format!("judge score {score:.2} against threshold {threshold:.2} ({} of {k} votes usable)", votes.len()),
        judge_detail,
        judge_cost_usd: cost,
    }
}
