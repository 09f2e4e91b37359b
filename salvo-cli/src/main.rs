mod adapters;
mod cli;
mod commands;
mod config;
mod error;
mod render;

use clap::Parser;
use cli::{Cli, Commands};
use config::ProjectConfig;
use error::CliError;

#[tokio::main]
async fn main() {
    init_tracing();
    let exit_code = match dispatch().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("salvo: {e}");
            e.exit_code()
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let non_interactive = std::env::var("CI").is_ok();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_ansi(!non_interactive).init();
}

async fn dispatch() -> Result<i32, CliError> {
    let cli = Cli::parse();
    let config = ProjectConfig::load_or_default()?;

    match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Validate { path } => commands::validate(&path),
        Commands::Run { path, trial_count, parallel, record, early_stop, allow_infra, threshold, json } => {
            commands::run(
                commands::RunArgs { path, trial_count, parallel, record, early_stop, allow_infra, threshold_override: threshold, json },
                &config,
            )
            .await
        }
        Commands::Report { run_id, history, failures, scenario, limit } => {
            commands::report(commands::ReportArgs { run_id, history, failures_only: failures, scenario, limit }, &config).await
        }
        Commands::Replay { trace_id, allow_partial } => commands::replay_cmd(&trace_id, allow_partial, &config).await,
        Commands::Reeval { trace_id, scenario, allow_partial_reeval, strict_scenario } => {
            commands::reeval_cmd(commands::ReevalArgs { trace_id, scenario_path: scenario, allow_partial_reeval, strict_scenario }, &config).await
        }
    }
}
