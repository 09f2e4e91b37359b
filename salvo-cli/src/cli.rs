//! Argument parsing. One `Commands` variant per subcommand in the CLI
//! surface; `main` matches on it and dispatches into `commands`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "salvo", about = "Reliability testing for tool-using LLM agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scaffold a starter scenario file.
    Init {
        /// Where to write the scaffold.
        #[arg(default_value = "scenario.yaml")]
        path: PathBuf,
    },
    /// Load and validate a scenario file without running it.
    Validate {
        path: PathBuf,
    },
    /// Run a scenario across N trials.
    Run {
        path: PathBuf,
        /// Number of independent trials.
        #[arg(short = 'n', long, default_value_t = 1)]
        trial_count: u32,
        /// Maximum trials in flight at once.
        #[arg(long, default_value_t = 4)]
        parallel: usize,
        /// Persist redacted traces after the run.
        #[arg(long)]
        record: bool,
        /// Cut the run short once the verdict is already decided.
        #[arg(long)]
        early_stop: bool,
        /// Exclude infra-errored trials from the pass-rate/verdict base set.
        #[arg(long)]
        allow_infra: bool,
        /// Override the scenario's pass threshold.
        #[arg(long)]
        threshold: Option<f64>,
        /// Emit the SuiteResult as JSON instead of a rendered summary.
        #[arg(long)]
        json: bool,
    },
    /// Summarize a previously recorded suite run.
    Report {
        run_id: Option<String>,
        /// Show failure-ranking history beyond the top 5.
        #[arg(long)]
        history: bool,
        /// Only show failing assertions.
        #[arg(long)]
        failures: bool,
        /// Restrict to a specific scenario id.
        #[arg(long)]
        scenario: Option<String>,
        /// Cap the number of additional failure rows shown.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Render a previously recorded trace with no adapter calls.
    Replay {
        /// Trace id, or "latest".
        #[arg(default_value = "latest")]
        trace_id: String,
        /// Don't fail if the trace is missing.
        #[arg(long)]
        allow_partial: bool,
    },
    /// Re-evaluate a recorded trace's assertions against a scenario.
    Reeval {
        trace_id: String,
        /// Scenario file to re-evaluate against.
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Skip content-dependent assertions on a metadata_only recording
        /// instead of refusing the whole re-evaluation.
        #[arg(long)]
        allow_partial_reeval: bool,
        /// Refuse re-evaluation entirely if the scenario has drifted.
        #[arg(long)]
        strict_scenario: bool,
    },
}
