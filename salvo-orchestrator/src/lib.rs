//! Trial orchestrator: runs N independent trials of a scenario, bounded to
//! P concurrent in flight, retries transient adapter failures with full
//! jitter backoff, optionally cuts a run short once its verdict is already
//! decided, and folds the results into a `SuiteResult`.
//!
//! Each trial gets its own adapter instance (built fresh from the caller's
//! factory) and its own scratch directory — nothing is shared across
//! trials except the read-only `Scenario` and, when configured, a judge
//! adapter used purely for grading.

use rand::Rng;
use salvo_adapter::registry::AdapterDyn;
use salvo_eval::{evaluate_all, EvalContext};
use salvo_runner::{run_trial_with_events, RunnerEvent};
use salvo_score::score_trial;
use salvo_types::{time_sortable_id, RunId, Scenario, StopCondition, SuiteResult, TraceId, TrialResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};

const RETRY_BASE_MS: u64 = 500;
const RETRY_CAP_MS: u64 = 30_000;

/// Knobs for a single `run_suite` call.
#[derive(Clone)]
pub struct OrchestratorConfig {
    /// Number of independent trials to run.
    pub trial_count: u32,
    /// Maximum trials in flight at once. `1` runs strictly sequentially.
    pub parallel: usize,
    /// Maximum retry attempts for a trial whose trace came back with a
    /// retryable adapter error.
    pub max_retries: u32,
    /// Cut the run short once the verdict is already decided — a hard
    /// fail has landed, or no remaining trial could lift the mean score
    /// above threshold even if it scored a perfect 1.0.
    pub early_stop: bool,
    /// Exclude infra-errored trials from the pass-rate/mean-score/verdict
    /// base set instead of counting them as ordinary failures.
    pub allow_infra: bool,
    /// Model used for `judge` assertions that don't name their own.
    pub default_judge_model: String,
    /// Project-level default vote count for `judge` assertions that don't
    /// name their own `k`.
    pub judge_default_k: Option<u32>,
    /// Project-level default sampling temperature for `judge` assertions
    /// that don't name their own.
    pub judge_default_temperature: Option<f64>,
    /// Project-level default pass threshold for `judge` assertions that
    /// don't name their own.
    pub judge_default_threshold: Option<f64>,
    /// Optional sink for turn/tool/trial progress events, forwarded from
    /// every trial's runner loop. `None` disables event emission entirely.
    pub progress: Option<tokio::sync::mpsc::UnboundedSender<RunnerEvent>>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            trial_count: 1,
            parallel: 4,
            max_retries: 2,
            early_stop: false,
            allow_infra: false,
            default_judge_model: "gpt-4o-mini".into(),
            judge_default_k: None,
            judge_default_temperature: None,
            judge_default_threshold: None,
            progress: None,
        }
    }
}

impl std::fmt::Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("trial_count", &self.trial_count)
            .field("parallel", &self.parallel)
            .field("max_retries", &self.max_retries)
            .field("early_stop", &self.early_stop)
            .field("allow_infra", &self.allow_infra)
            .field("default_judge_model", &self.default_judge_model)
            .field("judge_default_k", &self.judge_default_k)
            .field("judge_default_temperature", &self.judge_default_temperature)
            .field("judge_default_threshold", &self.judge_default_threshold)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Run `scenario` for `config.trial_count` trials and aggregate the result.
///
/// `adapter_factory` is called once per trial — never shared across
/// trials, since a provider client may cache connection or rate-limit
/// state that should stay scoped to the trial that built it.
/// `judge_adapter` is shared across every `judge` assertion evaluation in
/// the run; it only ever reads model output, so sharing it carries none
/// of the cross-trial contamination risk a shared agent adapter would.
pub async fn run_suite<F>(scenario: Arc<Scenario>, adapter_factory: F, judge_adapter: Option<Arc<dyn AdapterDyn>>, config: OrchestratorConfig) -> SuiteResult
where
    F: Fn() -> Arc<dyn AdapterDyn> + Send + Sync + 'static,
{
    let run_id = RunId::new(time_sortable_id());
    let adapter_factory = Arc::new(adapter_factory);
    let semaphore = Arc::new(Semaphore::new(config.parallel.max(1)));
    let cancelled = Arc::new(AtomicBool::new(false));
    let completed_scores = Arc::new(Mutex::new(Vec::<f64>::with_capacity(config.trial_count as usize)));

    let mut handles = Vec::with_capacity(config.trial_count as usize);
    for trial_index in 0..config.trial_count {
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        let permit = Arc::clone(&semaphore).acquire_owned().await.expect("semaphore is never closed");
        let scenario = Arc::clone(&scenario);
        let adapter_factory = Arc::clone(&adapter_factory);
        let judge_adapter = judge_adapter.clone();
        let run_id = run_id.clone();
        let cancelled = Arc::clone(&cancelled);
        let completed_scores = Arc::clone(&completed_scores);
        let trial_count = config.trial_count;
        let max_retries = config.max_retries;
        let default_judge_model = config.default_judge_model.clone();
        let judge_default_k = config.judge_default_k;
        let judge_default_temperature = config.judge_default_temperature;
        let judge_default_threshold = config.judge_default_threshold;
        let progress = config.progress.clone();
        let early_stop = config.early_stop;

        let handle = tokio::spawn(async move {
            let _permit = permit;

            if cancelled.load(Ordering::SeqCst) {
                return TrialResult::infra_error(run_id, TraceId::new(time_sortable_id()), trial_index, scenario.id.clone(), scenario.content_hash(), &scenario.provider, &scenario.model, 0, "cancelled before start");
            }

            let result = run_one_trial(
                &scenario,
                adapter_factory.as_ref(),
                judge_adapter,
                &default_judge_model,
                judge_default_k,
                judge_default_temperature,
                judge_default_threshold,
                run_id,
                trial_index,
                max_retries,
                progress,
            )
            .await;

            if early_stop {
                let mut scores = completed_scores.lock().expect("completed_scores mutex poisoned");
                scores.push(result.score);
                let remaining = trial_count as usize - scores.len();
                let best_possible_mean = (scores.iter().sum::<f64>() + remaining as f64) / trial_count as f64;
                if result.hard_failed || best_possible_mean < scenario.pass_threshold {
                    cancelled.store(true, Ordering::SeqCst);
                }
            }

            result
        });
        handles.push(handle);
    }

    let mut trials = Vec::with_capacity(handles.len());
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(result) => trials.push(result),
            Err(join_err) => trials.push(TrialResult::infra_error(
                run_id.clone(),
                TraceId::new(time_sortable_id()),
                index as u32,
                scenario.id.clone(),
                scenario.content_hash(),
                &scenario.provider,
                &scenario.model,
                0,
                format!("trial task panicked: {join_err}"),
            )),
        }
    }
    trials.sort_by_key(|t| t.trial_index);

    SuiteResult::aggregate(run_id, scenario.id.clone(), trials, config.allow_infra)
}

/// Run a single trial end to end: isolate it, execute it with retries,
/// evaluate its assertions, and score it.
#[allow(clippy::too_many_arguments)]
async fn run_one_trial<F>(
    scenario: &Scenario,
    adapter_factory: &F,
    judge_adapter: Option<Arc<dyn AdapterDyn>>,
    default_judge_model: &str,
    judge_default_k: Option<u32>,
    judge_default_temperature: Option<f64>,
    judge_default_threshold: Option<f64>,
    run_id: RunId,
    trial_index: u32,
    max_retries: u32,
    progress: Option<tokio::sync::mpsc::UnboundedSender<RunnerEvent>>,
) -> TrialResult
where
    F: Fn() -> Arc<dyn AdapterDyn>,
{
    // trace_id is minted before anything fallible runs, so it identifies
    // this trial on both the success and the infra-error path.
    let trace_id = TraceId::new(time_sortable_id());

    // Each trial gets its own scratch directory. Tool mocks in this
    // implementation never touch disk, but the directory still exists for
    // the lifetime of the trial so a future mock or adapter that does can
    // rely on per-trial isolation without the orchestrator changing shape.
    let _scratch = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            return TrialResult::infra_error(run_id, trace_id, trial_index, scenario.id.clone(), scenario.content_hash(), &scenario.provider, &scenario.model, 0, format!("could not allocate scratch directory: {e}"))
        }
    };

    let adapter = adapter_factory();

    let mut attempt = 0;
    let trace = loop {
        let trace = run_trial_with_events(scenario, Arc::clone(&adapter), trace_id.clone(), trial_index, progress.clone()).await;

        let should_retry = trace.stop_condition == StopCondition::AdapterError && trace.retryable && attempt < max_retries;
        if !should_retry {
            break trace;
        }

        sleep(backoff_delay(attempt)).await;
        attempt += 1;
    };

    let ctx = EvalContext {
        trace: &trace,
        scenario_system_prompt: scenario.system_prompt.as_deref(),
        judge_adapter,
        default_judge_model: default_judge_model.to_string(),
        judge_default_k,
        judge_default_temperature,
        judge_default_threshold,
    };
    let evaluations = evaluate_all(&ctx, &scenario.assertions).await;

    score_trial(run_id, trace_id, trial_index, attempt, trace, evaluations, scenario.pass_threshold)
}

/// Full-jitter exponential backoff: a uniformly random delay between 0 and
/// `min(cap, base * 2^attempt)`.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = RETRY_BASE_MS.saturating_mul(1u64 << attempt.min(6));
    let capped = exp.min(RETRY_CAP_MS);
    let jittered = rand::thread_rng().gen_range(0..=capped);
    Duration::from_millis(jittered)
}
