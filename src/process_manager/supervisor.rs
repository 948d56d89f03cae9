use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::{
    lock, CancelScope, ExitReport, ProcessRunner, ProcessSpec, ReadinessSignal,
    DEFAULT_LOG_BUFFER_BYTES,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartFailure {
    pub process: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownProgress {
    Stopping { process: String },
    Stopped { process: String, report: Option<ExitReport> },
    Complete { total: usize },
}

/// Owns the fleet of runners in launch order.
///
/// Runner `i` waits for runner `i - 1` to signal `did_start` before it
/// spawns; the first runner starts immediately.
#[derive(Debug)]
pub struct Supervisor {
    runners: Vec<ProcessRunner>,
    cancel: CancelScope,
    failures: Arc<Mutex<Vec<StartFailure>>>,
    launchers: Mutex<Vec<JoinHandle<()>>>,
}

impl Supervisor {
    pub fn new(specs: Vec<ProcessSpec>, cancel: CancelScope) -> Self {
        Self::with_log_capacity(specs, cancel, DEFAULT_LOG_BUFFER_BYTES)
    }

    pub fn with_log_capacity(specs: Vec<ProcessSpec>, cancel: CancelScope, bytes: usize) -> Self {
        let runners = specs
            .into_iter()
            .map(|spec| ProcessRunner::with_log_capacity(spec, bytes))
            .collect();
        Self {
            runners,
            cancel,
            failures: Arc::new(Mutex::new(Vec::new())),
            launchers: Mutex::new(Vec::new()),
        }
    }

    pub fn runners(&self) -> &[ProcessRunner] {
        &self.runners
    }

    pub fn cancel_scope(&self) -> &CancelScope {
        &self.cancel
    }

    /// Kicks off every runner on its own launcher thread and returns
    /// immediately. A runner that fails to spawn gets `failed to start: <err>`
    /// in its log; its dependents stay blocked until cancellation.
    pub fn launch(&self) {
        let mut launchers = lock(&self.launchers);
        let mut dependency = ReadinessSignal::fired();
        for runner in &self.runners {
            let runner = runner.clone();
            let cancel = self.cancel.clone();
            let failures = self.failures.clone();
            let waits_on = dependency.clone();
            dependency = runner.did_start();
            launchers.push(thread::spawn(move || {
                if let Err(err) = runner.start(&cancel, &waits_on) {
                    runner.log_buffer().append_line(&format!("failed to start: {err}"));
                    lock(&failures).push(StartFailure {
                        process: runner.title().to_owned(),
                        message: err.to_string(),
                    });
                }
            }));
        }
    }

    pub fn start_failures(&self) -> Vec<StartFailure> {
        lock(&self.failures).clone()
    }

    pub fn stop_all(&self) {
        self.stop_all_with_progress(|_| {});
    }

    /// Cancels the shared scope, then stops runners last-to-first so that
    /// dependents go down before what they depend on.
    pub fn stop_all_with_progress<F>(&self, mut progress: F)
    where
        F: FnMut(ShutdownProgress),
    {
        self.cancel.cancel();
        for runner in self.runners.iter().rev() {
            progress(ShutdownProgress::Stopping {
                process: runner.title().to_owned(),
            });
            runner.stop();
            progress(ShutdownProgress::Stopped {
                process: runner.title().to_owned(),
                report: runner.last_exit(),
            });
        }
        let launchers = std::mem::take(&mut *lock(&self.launchers));
        for launcher in launchers {
            let _ = launcher.join();
        }
        progress(ShutdownProgress::Complete {
            total: self.runners.len(),
        });
    }

    pub fn exit_reports(&self) -> Vec<(String, Option<ExitReport>)> {
        self.runners
            .iter()
            .map(|runner| (runner.title().to_owned(), runner.last_exit()))
            .collect()
    }
}
