//! Top-level CLI error, wrapping every fallible subsystem the commands
//! touch. `exit_code` is what `main` actually returns to the shell.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("scenario error: {0}")]
    Scenario(#[from] salvo_scenario::ScenarioLoadError),
    #[error("store error: {0}")]
    Store(#[from] salvo_store::StoreError),
    #[error("replay error: {0}")]
    Replay(#[from] salvo_record::ReplayError),
    #[error("re-evaluation error: {0}")]
    Reval(#[from] salvo_record::RevalError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("no adapter registered for provider '{0}' (set OPENAI_API_KEY / ANTHROPIC_API_KEY or register a custom one)")]
    UnknownProvider(String),
    #[error("no run found with id '{0}'")]
    UnknownRun(String),
}

impl CliError {
    /// Process exit code for errors that occur before a `Verdict` exists.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Replay(_) => 1,
            _ => 3,
        }
    }
}
