//! Implementations of each CLI subcommand. Every function returns the
//! process exit code it wants `main` to use.

use crate::config::ProjectConfig;
use crate::error::CliError;
use crate::{adapters, render};
use salvo_orchestrator::OrchestratorConfig;
use salvo_record::{RevalOptions, reevaluate, replay};
use salvo_redact::Redactor;
use salvo_store::FileStore;
use salvo_types::{RecordMode, Scenario, SuiteResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SCAFFOLD: &str = r#"adapter: openai
model: gpt-4o-mini
description: Describe what this scenario checks.
system_prompt: You are a helpful assistant.
prompt: Say hello.
threshold: 0.8
max_turns: 10
assertions:
  - type: output_contains
    value: hello
"#;

pub fn init(path: &Path) -> Result<i32, CliError> {
    if path.exists() {
        return Err(CliError::Config(format!("{} already exists", path.display())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, SCAFFOLD)?;
    println!("wrote scaffold scenario to {}", path.display());
    Ok(0)
}

pub fn validate(path: &Path) -> Result<i32, CliError> {
    match salvo_scenario::load(path) {
        Ok(scenario) => {
            println!("{} is valid ({} assertions, {} tools)", path.display(), scenario.assertions.len(), scenario.tools.len());
            Ok(0)
        }
        Err(e) => {
            eprintln!("{} is invalid: {e}", path.display());
            Ok(1)
        }
    }
}

pub struct RunArgs {
    pub path: PathBuf,
    pub trial_count: u32,
    pub parallel: usize,
    pub record: bool,
    pub early_stop: bool,
    pub allow_infra: bool,
    pub threshold_override: Option<f64>,
    pub json: bool,
}

pub async fn run(args: RunArgs, config: &ProjectConfig) -> Result<i32, CliError> {
    let mut scenario = salvo_scenario::load(&args.path)?;
    if let Some(threshold) = args.threshold_override {
        scenario.pass_threshold = threshold;
    }
    let scenario = Arc::new(scenario);

    let registry = adapters::registry_from_env();
    let factory = adapters::factory_for(&registry, &scenario.provider).ok_or_else(|| CliError::UnknownProvider(scenario.provider.clone()))?;

    let judge_provider = config.judge.adapter.as_deref().unwrap_or(&scenario.provider);
    let judge_adapter = registry.get(judge_provider);
    let default_judge_model = config.judge.model.clone().unwrap_or_else(|| scenario.model.clone());

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel();

    let orch_config = OrchestratorConfig {
        trial_count: args.trial_count,
        parallel: args.parallel.max(1),
        max_retries: 2,
        early_stop: args.early_stop,
        allow_infra: args.allow_infra,
        default_judge_model,
        judge_default_k: Some(config.judge.k),
        judge_default_temperature: Some(config.judge.temperature),
        judge_default_threshold: Some(config.judge.default_threshold),
        progress: if args.json { None } else { Some(progress_tx) },
    };

    let render_progress = !args.json;
    let progress_task = render_progress.then(|| {
        tokio::spawn(async move {
            while let Some(event) = progress_rx.recv().await {
                print!("{}", render::runner_event(&event));
            }
        })
    });

    let result = salvo_orchestrator::run_suite(Arc::clone(&scenario), factory, judge_adapter, orch_config).await;

    if let Some(task) = progress_task {
        let _ = task.await;
    }

    let store = FileStore::new(config.storage_dir.clone());
    store.write_json(&store.run_path(result.run_id.as_str()), &result).await?;

    if args.record {
        record_trials(&store, config, &result).await?;
    }

    print_suite_result(&result, args.json);
    Ok(result.verdict.exit_code())
}

async fn record_trials(store: &FileStore, config: &ProjectConfig, result: &SuiteResult) -> Result<(), CliError> {
    let mut redactor = Redactor::new();
    for pattern in &config.recording.custom_patterns {
        let regex = regex::Regex::new(pattern).map_err(|e| CliError::Config(format!("invalid recording pattern '{pattern}': {e}")))?;
        redactor = redactor.with_custom_pattern(regex);
    }
    let mode: RecordMode = config.recording.mode.into();

    for trial in &result.trials {
        let status = if trial.passed { "passed" } else if trial.hard_failed { "hard_failed" } else { "failed" };
        salvo_record::record(store, &redactor, result.run_id.as_str(), &trial.trace, mode, status).await?;
    }
    Ok(())
}

fn print_suite_result(result: &SuiteResult, json: bool) {
    if json {
        println!("{}", serde_json::to_string_pretty(result).expect("SuiteResult always serializes"));
    } else {
        print!("{}", render::suite_result(result));
    }
}

pub struct ReportArgs {
    pub run_id: Option<String>,
    pub history: bool,
    pub failures_only: bool,
    pub scenario: Option<String>,
    pub limit: usize,
}

pub async fn report(args: ReportArgs, config: &ProjectConfig) -> Result<i32, CliError> {
    let store = FileStore::new(config.storage_dir.clone());
    let run_id = match args.run_id {
        Some(id) => id,
        None => store.read_latest().await?.ok_or_else(|| CliError::UnknownRun("(no runs recorded yet)".into()))?,
    };
    let result: SuiteResult = store
        .read_json(&store.run_path(&run_id))
        .await?
        .ok_or_else(|| CliError::UnknownRun(run_id.clone()))?;

    if let Some(scenario_id) = &args.scenario {
        if &result.scenario_id != scenario_id {
            println!("run {run_id} belongs to scenario '{}', not '{scenario_id}'", result.scenario_id);
            return Ok(0);
        }
    }

    if !args.failures_only {
        print!("{}", render::suite_result(&result));
    }
    if args.history {
        for row in result.failure_ranking.iter().skip(5).take(args.limit) {
            println!("  [{}] {} — failed {}x", row.assertion_index, row.assertion_type, row.failure_count);
        }
    } else if args.failures_only {
        for row in result.failure_ranking.iter().take(args.limit) {
            println!("  [{}] {} — failed {}x", row.assertion_index, row.assertion_type, row.failure_count);
        }
    }
    Ok(0)
}

pub async fn replay_cmd(trace_id: &str, allow_partial: bool, config: &ProjectConfig) -> Result<i32, CliError> {
    let store = FileStore::new(config.storage_dir.clone());
    match replay(&store, trace_id).await {
        Ok(view) => {
            print!("{}", render::replay_view(&view));
            Ok(0)
        }
        Err(e) => {
            if allow_partial {
                eprintln!("warning: {e}");
                Ok(0)
            } else {
                eprintln!("{e}");
                Ok(1)
            }
        }
    }
}

pub struct ReevalArgs {
    pub trace_id: String,
    pub scenario_path: Option<PathBuf>,
    pub allow_partial_reeval: bool,
    pub strict_scenario: bool,
}

pub async fn reeval_cmd(args: ReevalArgs, config: &ProjectConfig) -> Result<i32, CliError> {
    let store = FileStore::new(config.storage_dir.clone());
    let recorded = store
        .read_json(&store.recorded_trace_path(&args.trace_id))
        .await?
        .ok_or_else(|| CliError::UnknownRun(args.trace_id.clone()))?;

    let scenario_path = args
        .scenario_path
        .as_ref()
        .ok_or_else(|| CliError::Config("reeval needs --scenario: recorded traces keep only the scenario's id and content hash, not a full snapshot to re-check against".into()))?;
    let scenario: Scenario = salvo_scenario::load(scenario_path)?;

    let registry = adapters::registry_from_env();
    let judge_provider = config.judge.adapter.as_deref().unwrap_or(&scenario.provider);
    let judge_adapter = registry.get(judge_provider);
    let default_judge_model = config.judge.model.clone().unwrap_or_else(|| scenario.model.clone());

    let opts = RevalOptions { strict_scenario: args.strict_scenario, allow_partial_reeval: args.allow_partial_reeval };
    let result = reevaluate(
        &store,
        &recorded,
        &scenario,
        &opts,
        judge_adapter,
        &default_judge_model,
        Some(config.judge.k),
        Some(config.judge.temperature),
        Some(config.judge.default_threshold),
    )
    .await?;

    print!("{}", render::reval_result(&result));
    Ok(if result.passed { 0 } else { 1 })
}
