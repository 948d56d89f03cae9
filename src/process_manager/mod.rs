//! Process supervision runtime.
//!
//! A [`Supervisor`] owns one [`ProcessRunner`] per child process and chains
//! their startup through [`ReadinessSignal`]s. Every runner streams the raw
//! stdout/stderr bytes of its child into a shared [`LogBuffer`] that the UI
//! reads at its own pace. A single [`CancelScope`] created by the entry point
//! reaches every blocking call.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

mod cancel;
mod log_buffer;
mod readiness;
mod runner;
mod supervisor;

pub use cancel::CancelScope;
pub use log_buffer::{LogBuffer, DEFAULT_LOG_BUFFER_BYTES, TRUNCATED_MARKER};
pub use readiness::{ReadinessSignal, WaitOutcome};
pub use runner::{ExitReport, ProcessRunner, RunnerState, StartOutcome, STOP_GRACE_PERIOD};
pub use supervisor::{ShutdownProgress, StartFailure, Supervisor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub title: String,
    pub binary: PathBuf,
    pub args: Vec<String>,
    /// Complete child environment, one `KEY=VALUE` entry each.
    pub env: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(title: impl Into<String>, binary: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            binary: binary.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env<I, S>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env = env.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Entries without a `=` are skipped.
    pub fn env_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.env.iter().filter_map(|entry| entry.split_once('='))
    }

    pub fn command_line(&self) -> String {
        let mut rendered = self.binary.display().to_string();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }
}

#[derive(Debug)]
pub enum ProcessManagerError {
    Spawn {
        process: String,
        binary: PathBuf,
        error: std::io::Error,
    },
    MissingStdio {
        process: String,
    },
    InvalidState {
        process: String,
        state: RunnerState,
        operation: &'static str,
    },
}

impl std::fmt::Display for ProcessManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessManagerError::Spawn {
                process,
                binary,
                error,
            } => write!(
                f,
                "failed to spawn process `{process}` from `{}`: {error}",
                binary.display()
            ),
            ProcessManagerError::MissingStdio { process } => {
                write!(f, "process `{process}` missing stdout/stderr pipe")
            }
            ProcessManagerError::InvalidState {
                process,
                state,
                operation,
            } => write!(
                f,
                "cannot {operation} process `{process}` while it is {}",
                state.label()
            ),
        }
    }
}

impl std::error::Error for ProcessManagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessManagerError::Spawn { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Locks ignore poisoning: every guarded value here stays consistent between
/// statements, so a panicked holder leaves nothing half-written.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
