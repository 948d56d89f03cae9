use std::io::{ErrorKind, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command as ProcessCommand, ExitStatus, Stdio};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[cfg(unix)]
use nix::sys::signal::{kill, Signal};
#[cfg(unix)]
use nix::unistd::{setpgid, Pid};

use super::{
    lock, CancelScope, LogBuffer, ProcessManagerError, ProcessSpec, ReadinessSignal, WaitOutcome,
};

pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(40);
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
const READ_CHUNK_BYTES: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Created,
    Starting,
    Running,
    Exiting,
    Exited,
}

impl RunnerState {
    pub fn label(self) -> &'static str {
        match self {
            RunnerState::Created => "created",
            RunnerState::Starting => "starting",
            RunnerState::Running => "running",
            RunnerState::Exiting => "exiting",
            RunnerState::Exited => "exited",
        }
    }

    fn is_active(self) -> bool {
        matches!(
            self,
            RunnerState::Starting | RunnerState::Running | RunnerState::Exiting
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub clean: bool,
    pub message: String,
}

impl ExitReport {
    pub fn sentinel(&self) -> String {
        if self.clean {
            "process exited cleanly".to_owned()
        } else {
            format!("process exited with error: {}", self.message)
        }
    }
}

/// Supervises one child process. Cloning yields another handle to the same
/// runner.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    shared: Arc<RunnerShared>,
}

#[derive(Debug)]
struct RunnerShared {
    spec: ProcessSpec,
    log: Arc<LogBuffer>,
    did_start: ReadinessSignal,
    inner: Mutex<RunnerInner>,
    state_changed: Condvar,
}

#[derive(Debug)]
struct RunnerInner {
    state: RunnerState,
    launch: Option<LaunchContext>,
    run_scope: Option<CancelScope>,
    pid: Option<u32>,
    restart_count: usize,
    last_exit: Option<ExitReport>,
}

#[derive(Debug, Clone)]
struct LaunchContext {
    parent: CancelScope,
    dependency: ReadinessSignal,
}

impl ProcessRunner {
    pub fn new(spec: ProcessSpec) -> Self {
        Self::with_log_buffer(spec, Arc::new(LogBuffer::new()))
    }

    pub fn with_log_capacity(spec: ProcessSpec, capacity: usize) -> Self {
        Self::with_log_buffer(spec, Arc::new(LogBuffer::with_capacity(capacity)))
    }

    fn with_log_buffer(spec: ProcessSpec, log: Arc<LogBuffer>) -> Self {
        Self {
            shared: Arc::new(RunnerShared {
                spec,
                log,
                did_start: ReadinessSignal::new(),
                inner: Mutex::new(RunnerInner {
                    state: RunnerState::Created,
                    launch: None,
                    run_scope: None,
                    pid: None,
                    restart_count: 0,
                    last_exit: None,
                }),
                state_changed: Condvar::new(),
            }),
        }
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.shared.spec
    }

    pub fn title(&self) -> &str {
        &self.shared.spec.title
    }

    pub fn log_buffer(&self) -> Arc<LogBuffer> {
        self.shared.log.clone()
    }

    pub fn did_start(&self) -> ReadinessSignal {
        self.shared.did_start.clone()
    }

    pub fn state(&self) -> RunnerState {
        self.lock_inner().state
    }

    pub fn pid(&self) -> Option<u32> {
        self.lock_inner().pid
    }

    pub fn restart_count(&self) -> usize {
        self.lock_inner().restart_count
    }

    pub fn last_exit(&self) -> Option<ExitReport> {
        self.lock_inner().last_exit.clone()
    }

    pub fn output_size(&self) -> usize {
        self.shared.log.size()
    }

    pub fn output_slice(&self, from: usize, to: usize) -> Vec<u8> {
        self.shared.log.slice(from, to)
    }

    /// Waits for `dependency`, then spawns the child. Spawn failures leave the
    /// runner `Exited` with nothing appended to its log.
    pub fn start(
        &self,
        parent: &CancelScope,
        dependency: &ReadinessSignal,
    ) -> Result<StartOutcome, ProcessManagerError> {
        let (previous, run_scope) = {
            let mut inner = self.lock_inner();
            let previous = inner.state;
            if !matches!(previous, RunnerState::Created | RunnerState::Exited) {
                return Err(self.invalid_state(previous, "start"));
            }
            if inner.launch.is_none() {
                inner.launch = Some(LaunchContext {
                    parent: parent.clone(),
                    dependency: dependency.clone(),
                });
            }
            let run_scope = parent.child();
            inner.run_scope = Some(run_scope.clone());
            inner.state = RunnerState::Starting;
            (previous, run_scope)
        };
        self.shared.state_changed.notify_all();

        if dependency.wait(&run_scope) == WaitOutcome::Cancelled || run_scope.is_cancelled() {
            self.settle(previous, None);
            return Ok(StartOutcome::Cancelled);
        }

        let mut child = match build_command(&self.shared.spec).spawn() {
            Ok(child) => child,
            Err(error) => {
                self.settle(RunnerState::Exited, None);
                return Err(ProcessManagerError::Spawn {
                    process: self.shared.spec.title.clone(),
                    binary: self.shared.spec.binary.clone(),
                    error,
                });
            }
        };
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            self.settle(RunnerState::Exited, None);
            return Err(ProcessManagerError::MissingStdio {
                process: self.shared.spec.title.clone(),
            });
        };

        {
            let mut inner = self.lock_inner();
            inner.state = RunnerState::Running;
            inner.pid = Some(child.id());
        }
        self.shared.state_changed.notify_all();
        self.shared.did_start.signal();

        let gate = Arc::new(OutputGate::new());
        let readers = vec![
            spawn_reader(stdout, self.shared.log.clone(), gate.clone(), "stdout"),
            spawn_reader(stderr, self.shared.log.clone(), gate.clone(), "stderr"),
        ];
        let runner = self.clone();
        thread::spawn(move || runner.monitor(child, readers, gate, run_scope));
        Ok(StartOutcome::Started)
    }

    /// Interrupts the child, escalating to a kill after [`STOP_GRACE_PERIOD`],
    /// and returns once the exit sentinel is in the log. No-op when nothing
    /// is running.
    pub fn stop(&self) {
        let inner = self.lock_inner();
        if let Some(scope) = inner.run_scope.as_ref() {
            scope.cancel();
        }
        let _inner = self
            .shared
            .state_changed
            .wait_while(inner, |inner| inner.state.is_active())
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Stops the child and starts it again with the cancel scope and
    /// dependency recorded by the first `start`.
    pub fn restart(&self) -> Result<StartOutcome, ProcessManagerError> {
        let launch = {
            let inner = self.lock_inner();
            match (inner.state, inner.launch.as_ref()) {
                (RunnerState::Running | RunnerState::Exited, Some(launch)) => launch.clone(),
                (state, _) => return Err(self.invalid_state(state, "restart")),
            }
        };
        self.stop();
        let outcome = self.start(&launch.parent, &launch.dependency)?;
        if outcome == StartOutcome::Started {
            self.lock_inner().restart_count += 1;
        }
        Ok(outcome)
    }

    /// Returns `true` once the runner is no longer starting, running, or
    /// exiting.
    pub fn wait_for_exit(&self, timeout: Duration) -> bool {
        let inner = self.lock_inner();
        let (inner, _) = self
            .shared
            .state_changed
            .wait_timeout_while(inner, timeout, |inner| inner.state.is_active())
            .unwrap_or_else(PoisonError::into_inner);
        !inner.state.is_active()
    }

    fn monitor(
        &self,
        mut child: Child,
        readers: Vec<JoinHandle<()>>,
        gate: Arc<OutputGate>,
        scope: CancelScope,
    ) {
        let group = child.id();
        let mut stop_requested = false;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => {}
                Err(error) => break Err(error),
            }
            if scope.is_cancelled() {
                stop_requested = true;
                break self.terminate(&mut child);
            }
            scope.wait_timeout(EXIT_POLL_INTERVAL);
        };

        // The leader is gone; whatever it left in its group goes with it
        // before the log is sealed.
        self.stop_group(group);
        drain_readers(readers, &gate);
        let report = match status {
            Ok(status) => exit_report(status, stop_requested),
            Err(error) => ExitReport {
                clean: false,
                message: format!("wait failed: {error}"),
            },
        };
        self.shared.log.append_line(&report.sentinel());
        self.settle(RunnerState::Exited, Some(report));
    }

    #[cfg(unix)]
    fn stop_group(&self, group: u32) {
        let Some(group) = group_pid(group) else {
            return;
        };
        if !group_alive(group) {
            return;
        }
        self.mark_exiting();
        let _ = kill(group, Signal::SIGINT);
        if wait_for_group(group, STOP_GRACE_PERIOD) {
            return;
        }
        let _ = kill(group, Signal::SIGKILL);
        wait_for_group(group, READER_DRAIN_TIMEOUT);
    }

    #[cfg(not(unix))]
    fn stop_group(&self, _group: u32) {}

    fn mark_exiting(&self) {
        self.lock_inner().state = RunnerState::Exiting;
        self.shared.state_changed.notify_all();
    }

    fn terminate(&self, child: &mut Child) -> std::io::Result<ExitStatus> {
        self.mark_exiting();

        signal_child(child, StopSignal::Interrupt);
        let deadline = Instant::now() + STOP_GRACE_PERIOD;
        while Instant::now() < deadline {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
        signal_child(child, StopSignal::Kill);
        child.wait()
    }

    fn settle(&self, state: RunnerState, report: Option<ExitReport>) {
        {
            let mut inner = self.lock_inner();
            inner.state = state;
            inner.pid = None;
            inner.run_scope = None;
            if report.is_some() {
                inner.last_exit = report;
            }
        }
        self.shared.state_changed.notify_all();
    }

    fn invalid_state(&self, state: RunnerState, operation: &'static str) -> ProcessManagerError {
        ProcessManagerError::InvalidState {
            process: self.shared.spec.title.clone(),
            state,
            operation,
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, RunnerInner> {
        lock(&self.shared.inner)
    }
}

fn build_command(spec: &ProcessSpec) -> ProcessCommand {
    let mut command = ProcessCommand::new(&spec.binary);
    command
        .args(&spec.args)
        .env_clear()
        .envs(spec.env_pairs())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }
    // Own process group: a Ctrl+C aimed at the supervisor's terminal must not
    // reach the children; stop() signals the group explicitly.
    #[cfg(unix)]
    unsafe {
        command.pre_exec(|| {
            setpgid(Pid::from_raw(0), Pid::from_raw(0))
                .map_err(|error| std::io::Error::new(ErrorKind::Other, error.to_string()))
        });
    }
    command
}

/// Lets reader threads append until the runner seals the log with its exit
/// sentinel.
#[derive(Debug)]
struct OutputGate {
    open: Mutex<bool>,
}

impl OutputGate {
    fn new() -> Self {
        Self {
            open: Mutex::new(true),
        }
    }

    fn write(&self, log: &LogBuffer, bytes: &[u8]) {
        let open = lock(&self.open);
        if *open {
            log.append(bytes);
        }
    }

    fn write_line(&self, log: &LogBuffer, line: &str) {
        let open = lock(&self.open);
        if *open {
            log.append_line(line);
        }
    }

    fn close(&self) {
        *lock(&self.open) = false;
    }
}

fn spawn_reader<R>(
    mut stream: R,
    log: Arc<LogBuffer>,
    gate: Arc<OutputGate>,
    label: &'static str,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut chunk = [0u8; READ_CHUNK_BYTES];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => gate.write(&log, &chunk[..read]),
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => {
                    gate.write_line(&log, &format!("stream error ({label}): {error}"));
                    break;
                }
            }
        }
    })
}

/// Joins the readers once the group is dead. A process that left the group
/// can still hold a pipe open, so after the drain timeout the gate closes and
/// any reader still blocked can no longer reach the log.
fn drain_readers(readers: Vec<JoinHandle<()>>, gate: &OutputGate) {
    let deadline = Instant::now() + READER_DRAIN_TIMEOUT;
    for reader in readers {
        while !reader.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if reader.is_finished() {
            let _ = reader.join();
        }
    }
    gate.close();
}

#[cfg(unix)]
fn group_pid(group: u32) -> Option<Pid> {
    let group = i32::try_from(group).ok().filter(|group| *group > 0)?;
    Some(Pid::from_raw(-group))
}

#[cfg(unix)]
fn group_alive(group: Pid) -> bool {
    kill(group, None).is_ok()
}

/// Returns `true` once no process is left in the group.
#[cfg(unix)]
fn wait_for_group(group: Pid, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while group_alive(group) {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
    true
}

#[derive(Debug, Clone, Copy)]
enum StopSignal {
    Interrupt,
    Kill,
}

#[cfg(unix)]
fn signal_child(child: &mut Child, signal: StopSignal) {
    let signal = match signal {
        StopSignal::Interrupt => Signal::SIGINT,
        StopSignal::Kill => Signal::SIGKILL,
    };
    let pid = child.id() as i32;
    if pid <= 0 {
        return;
    }
    if kill(Pid::from_raw(-pid), signal).is_err() {
        let _ = kill(Pid::from_raw(pid), signal);
    }
}

#[cfg(not(unix))]
fn signal_child(child: &mut Child, _signal: StopSignal) {
    let _ = child.kill();
}

fn exit_report(status: ExitStatus, stop_requested: bool) -> ExitReport {
    if status.success() {
        return ExitReport {
            clean: true,
            message: "exit status 0".to_owned(),
        };
    }
    #[cfg(unix)]
    {
        if let Some(signal) = status.signal() {
            let name = Signal::try_from(signal)
                .map(|signal| signal.as_str().to_owned())
                .unwrap_or_else(|_| signal.to_string());
            let expected = stop_requested
                && matches!(
                    Signal::try_from(signal),
                    Ok(Signal::SIGINT | Signal::SIGKILL | Signal::SIGTERM)
                );
            return ExitReport {
                clean: expected,
                message: format!("signal: {name}"),
            };
        }
    }
    let _ = stop_requested;
    ExitReport {
        clean: false,
        message: match status.code() {
            Some(code) => format!("exit status {code}"),
            None => "exit status unknown".to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_text_distinguishes_clean_and_failed_exits() {
        let clean = ExitReport {
            clean: true,
            message: "exit status 0".to_owned(),
        };
        assert_eq!(clean.sentinel(), "process exited cleanly");
        let failed = ExitReport {
            clean: false,
            message: "exit status 1".to_owned(),
        };
        assert_eq!(failed.sentinel(), "process exited with error: exit status 1");
    }

    #[test]
    fn closed_output_gate_drops_late_reader_bytes() {
        let log = LogBuffer::new();
        let gate = OutputGate::new();
        gate.write(&log, b"early\n");
        gate.close();
        gate.write(&log, b"late\n");
        gate.write_line(&log, "stream error (stdout): broken pipe");
        assert_eq!(log.contents(), b"early\n".to_vec());
    }

    #[cfg(unix)]
    #[test]
    fn exit_report_treats_requested_interrupt_as_clean() {
        let interrupted = ExitStatus::from_raw(Signal::SIGINT as i32);
        assert!(exit_report(interrupted, true).clean);
        let report = exit_report(interrupted, false);
        assert!(!report.clean);
        assert_eq!(report.message, "signal: SIGINT");
    }

    #[cfg(unix)]
    #[test]
    fn exit_report_formats_exit_codes() {
        let failed = ExitStatus::from_raw(3 << 8);
        let report = exit_report(failed, true);
        assert!(!report.clean);
        assert_eq!(report.message, "exit status 3");
        assert!(exit_report(ExitStatus::from_raw(0), false).clean);
    }

    #[test]
    fn fresh_runner_is_created_and_idle() {
        let runner = ProcessRunner::new(ProcessSpec::new("idle", "/bin/true"));
        assert_eq!(runner.state(), RunnerState::Created);
        assert_eq!(runner.output_size(), 0);
        assert!(runner.did_start().same_as(&runner.did_start()));
        runner.stop();
        assert_eq!(runner.state(), RunnerState::Created);
        assert!(runner.wait_for_exit(Duration::from_millis(1)));
    }

    #[test]
    fn restart_before_first_start_is_rejected() {
        let runner = ProcessRunner::new(ProcessSpec::new("idle", "/bin/true"));
        let err = runner.restart().expect_err("restart should fail");
        assert!(matches!(
            err,
            ProcessManagerError::InvalidState {
                state: RunnerState::Created,
                operation: "restart",
                ..
            }
        ));
    }

    #[test]
    fn cancelled_dependency_wait_returns_to_previous_state() {
        let runner = ProcessRunner::new(ProcessSpec::new("blocked", "/bin/true"));
        let parent = CancelScope::new();
        parent.cancel();
        let outcome = runner
            .start(&parent, &ReadinessSignal::new())
            .expect("start");
        assert_eq!(outcome, StartOutcome::Cancelled);
        assert_eq!(runner.state(), RunnerState::Created);
        assert!(!runner.did_start().is_signalled());
    }
}
