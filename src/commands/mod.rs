use std::io::IsTerminal;

use crate::config::ConfigError;
use crate::process_manager::StartFailure;
use crate::tui::multiprocess::ProcessTuiError;
use crate::ui::theme::resolve_color_enabled;
use crate::ui::{OutputMode, PlainRenderer};
use crate::Command;

mod inspect;
mod run;

pub use inspect::{render_environment, render_processes};
pub use run::run_stack;

#[derive(Debug)]
pub enum CommandError {
    Config(ConfigError),
    Tui(ProcessTuiError),
    Ui(String),
    StartFailures { failures: Vec<StartFailure> },
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Config(err) => write!(f, "{err}"),
            CommandError::Tui(err) => write!(f, "process view failed: {err}"),
            CommandError::Ui(msg) => write!(f, "ui render failed: {msg}"),
            CommandError::StartFailures { failures } => write!(
                f,
                "failed to start: {}",
                failures
                    .iter()
                    .map(|failure| format!("{} ({})", failure.process, failure.message))
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Config(err) => Some(err),
            CommandError::Tui(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for CommandError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ProcessTuiError> for CommandError {
    fn from(value: ProcessTuiError) -> Self {
        Self::Tui(value)
    }
}

impl From<crate::ui::UiError> for CommandError {
    fn from(value: crate::ui::UiError) -> Self {
        Self::Ui(value.to_string())
    }
}

/// Runs a parsed command and returns whatever should be printed to stdout.
pub fn run_command(cmd: Command) -> Result<String, CommandError> {
    match cmd {
        Command::Run(args) => run_stack(&crate::config::resolve_stack(&args)?),
        Command::Env(args) => {
            render_environment(&crate::config::resolve_stack(&args)?, color_enabled())
        }
        Command::Processes(args) => {
            render_processes(&crate::config::resolve_stack(&args)?, color_enabled())
        }
        Command::Help => Ok(String::new()),
    }
}

fn color_enabled() -> bool {
    resolve_color_enabled(OutputMode::from_env(), std::io::stdout().is_terminal())
}

fn into_output(renderer: PlainRenderer<Vec<u8>>) -> Result<String, CommandError> {
    String::from_utf8(renderer.into_inner())
        .map_err(|error| CommandError::Ui(format!("invalid utf-8 in rendered output: {error}")))
}
