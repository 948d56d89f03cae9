#![cfg(unix)]

use devstack::process_manager::{
    CancelScope, ProcessManagerError, ProcessRunner, ProcessSpec, ReadinessSignal, RunnerState,
    ShutdownProgress, StartOutcome, Supervisor,
};
use std::thread;
use std::time::{Duration, Instant};

fn wait_until<F>(what: &str, mut done: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(20));
    }
}

fn log_text(runner: &ProcessRunner) -> String {
    String::from_utf8_lossy(&runner.log_buffer().contents()).into_owned()
}

fn sh(title: &str, script: &str) -> ProcessSpec {
    ProcessSpec::new(title, "/bin/sh")
        .with_args(["-c", script])
        .with_env([format!("PATH={}", std::env::var("PATH").unwrap_or_default())])
}

#[test]
fn echo_output_is_followed_by_clean_exit_sentinel() {
    let runner = ProcessRunner::new(ProcessSpec::new("echo", "/bin/echo").with_args(["hi"]));
    let outcome = runner
        .start(&CancelScope::new(), &ReadinessSignal::fired())
        .expect("start");
    assert_eq!(outcome, StartOutcome::Started);
    assert!(runner.did_start().is_signalled());

    assert!(runner.wait_for_exit(Duration::from_secs(10)));
    assert_eq!(log_text(&runner), "hi\nprocess exited cleanly\n");
    let ready = runner.did_start().signalled_at().expect("ready");
    let first_byte = runner.log_buffer().first_write_at().expect("first byte");
    assert!(ready <= first_byte);
    assert_eq!(runner.state(), RunnerState::Exited);
    assert!(runner.last_exit().is_some_and(|report| report.clean));
}

#[test]
fn missing_binary_fails_to_spawn_without_logging() {
    let runner = ProcessRunner::new(ProcessSpec::new("ghost", "/nonexistent/astria-sequencer"));
    let err = runner
        .start(&CancelScope::new(), &ReadinessSignal::fired())
        .expect_err("spawn should fail");

    assert!(matches!(err, ProcessManagerError::Spawn { .. }));
    assert!(err.to_string().contains("/nonexistent/astria-sequencer"));
    assert!(!runner.did_start().is_signalled());
    assert_eq!(runner.output_size(), 0);
    assert_eq!(runner.state(), RunnerState::Exited);
}

#[test]
fn nonzero_exit_appends_error_sentinel_with_status() {
    let runner = ProcessRunner::new(sh("failing", "exit 1"));
    runner
        .start(&CancelScope::new(), &ReadinessSignal::fired())
        .expect("start");
    assert!(runner.wait_for_exit(Duration::from_secs(10)));

    assert!(log_text(&runner).ends_with("process exited with error: exit status 1\n"));
    let report = runner.last_exit().expect("exit report");
    assert!(!report.clean);
    assert_eq!(report.message, "exit status 1");
}

#[test]
fn stdout_and_stderr_share_one_log() {
    let runner = ProcessRunner::new(sh("both", "echo out; echo err 1>&2"));
    runner
        .start(&CancelScope::new(), &ReadinessSignal::fired())
        .expect("start");
    assert!(runner.wait_for_exit(Duration::from_secs(10)));

    let text = log_text(&runner);
    assert!(text.contains("out\n"));
    assert!(text.contains("err\n"));
    assert!(text.ends_with("process exited cleanly\n"));
}

#[test]
fn dependent_runner_waits_for_dependency_to_start() {
    let first = ProcessRunner::new(sh("first", "echo first; exec sleep 30"));
    let second = ProcessRunner::new(sh("second", "echo second"));
    let cancel = CancelScope::new();

    let waiter = {
        let second = second.clone();
        let cancel = cancel.clone();
        let dependency = first.did_start();
        thread::spawn(move || second.start(&cancel, &dependency))
    };
    thread::sleep(Duration::from_millis(150));
    assert_eq!(second.state(), RunnerState::Starting);
    assert_eq!(second.output_size(), 0);

    first.start(&cancel, &ReadinessSignal::fired()).expect("start first");
    let outcome = waiter.join().expect("join").expect("start second");
    assert_eq!(outcome, StartOutcome::Started);

    let first_started = first.did_start().signalled_at().expect("first started");
    let second_started = second.did_start().signalled_at().expect("second started");
    assert!(first_started <= second_started);

    first.stop();
    second.stop();
}

#[test]
fn stop_interrupts_long_running_child_and_freezes_log() {
    let runner = ProcessRunner::new(sh("sleeper", "echo up; exec sleep 30"));
    runner
        .start(&CancelScope::new(), &ReadinessSignal::fired())
        .expect("start");
    wait_until("first output", || log_text(&runner).contains("up"));
    assert!(runner.pid().is_some());

    let started = Instant::now();
    runner.stop();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(runner.state(), RunnerState::Exited);
    assert_eq!(runner.pid(), None);
    assert!(log_text(&runner).ends_with("process exited cleanly\n"));

    let size = runner.output_size();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(runner.output_size(), size);
}

#[test]
fn restart_keeps_spec_and_appends_after_previous_output() {
    let spec = sh("ticker", "echo tick; exec sleep 30");
    let runner = ProcessRunner::new(spec.clone());
    runner
        .start(&CancelScope::new(), &ReadinessSignal::fired())
        .expect("start");
    wait_until("first tick", || log_text(&runner).contains("tick"));
    let before = runner.output_size();

    assert_eq!(runner.restart().expect("restart"), StartOutcome::Started);
    wait_until("second tick", || log_text(&runner).matches("tick").count() == 2);

    assert!(runner.output_size() > before);
    assert_eq!(runner.output_slice(0, before), b"tick\n".to_vec());
    assert_eq!(runner.spec(), &spec);
    assert_eq!(runner.restart_count(), 1);
    assert_eq!(
        log_text(&runner),
        "tick\nprocess exited cleanly\ntick\n"
    );
    runner.stop();
}

#[test]
fn leader_exit_takes_background_group_members_down_before_sealing_log() {
    let runner = ProcessRunner::new(sh(
        "forker",
        "(sleep 8; echo late; exec sleep 30) & echo hi",
    ));
    runner
        .start(&CancelScope::new(), &ReadinessSignal::fired())
        .expect("start");
    assert!(runner.wait_for_exit(Duration::from_secs(15)));

    let sealed = runner.output_size();
    assert_eq!(log_text(&runner), "hi\nprocess exited cleanly\n");
    thread::sleep(Duration::from_secs(4));
    runner.stop();
    assert_eq!(runner.output_size(), sealed);
    assert_eq!(runner.state(), RunnerState::Exited);
}

#[test]
fn failed_restart_does_not_count_as_a_restart() {
    let runner = ProcessRunner::new(sh("flaky", "echo once"));
    let cancel = CancelScope::new();
    runner.start(&cancel, &ReadinessSignal::fired()).expect("start");
    assert!(runner.wait_for_exit(Duration::from_secs(10)));

    cancel.cancel();
    assert_eq!(runner.restart().expect("restart"), StartOutcome::Cancelled);
    assert_eq!(runner.restart_count(), 0);
    assert_eq!(runner.state(), RunnerState::Exited);
}

#[test]
fn restart_before_first_start_is_rejected() {
    let runner = ProcessRunner::new(sh("idle", "true"));
    let err = runner.restart().expect_err("restart should fail");
    assert!(matches!(
        err,
        ProcessManagerError::InvalidState {
            state: RunnerState::Created,
            ..
        }
    ));
}

#[test]
fn cancelling_parent_scope_stops_running_children() {
    let cancel = CancelScope::new();
    let runner = ProcessRunner::new(sh("sleeper", "exec sleep 30"));
    runner.start(&cancel, &ReadinessSignal::fired()).expect("start");

    cancel.cancel();
    assert!(runner.wait_for_exit(Duration::from_secs(10)));
    assert!(log_text(&runner).ends_with("process exited cleanly\n"));
}

#[test]
fn cancelled_scope_aborts_a_start_blocked_on_its_dependency() {
    let cancel = CancelScope::new();
    let runner = ProcessRunner::new(sh("blocked", "echo never"));
    let never = ReadinessSignal::new();
    let waiter = {
        let runner = runner.clone();
        let cancel = cancel.clone();
        thread::spawn(move || runner.start(&cancel, &never))
    };
    thread::sleep(Duration::from_millis(100));
    cancel.cancel();

    let outcome = waiter.join().expect("join").expect("start");
    assert_eq!(outcome, StartOutcome::Cancelled);
    assert_eq!(runner.output_size(), 0);
    assert_eq!(runner.state(), RunnerState::Created);
}

#[test]
fn supervisor_reports_spawn_failure_and_blocks_dependents() {
    let supervisor = Supervisor::new(
        vec![
            ProcessSpec::new("sequencer", "/nonexistent/astria-sequencer"),
            sh("cometbft", "echo consensus"),
        ],
        CancelScope::new(),
    );
    supervisor.launch();

    let sequencer = supervisor.runners()[0].clone();
    wait_until("start failure", || !supervisor.start_failures().is_empty());
    assert!(log_text(&sequencer)
        .starts_with("failed to start: failed to spawn process `sequencer`"));
    assert_eq!(supervisor.start_failures()[0].process, "sequencer");

    thread::sleep(Duration::from_millis(100));
    assert_eq!(supervisor.runners()[1].output_size(), 0);

    let mut steps = Vec::new();
    supervisor.stop_all_with_progress(|progress| steps.push(progress));
    assert_eq!(
        steps.first(),
        Some(&ShutdownProgress::Stopping {
            process: "cometbft".to_owned()
        })
    );
    assert_eq!(steps.last(), Some(&ShutdownProgress::Complete { total: 2 }));
    assert_eq!(supervisor.runners()[1].output_size(), 0);
}

#[test]
fn supervisor_starts_fleet_in_order_and_stops_in_reverse() {
    let supervisor = Supervisor::new(
        vec![
            sh("sequencer", "echo sequencer; exec sleep 30"),
            sh("cometbft", "echo cometbft; exec sleep 30"),
            sh("composer", "echo composer; exec sleep 30"),
        ],
        CancelScope::new(),
    );
    supervisor.launch();
    for runner in supervisor.runners() {
        wait_until(runner.title(), || log_text(runner).contains(runner.title()));
    }
    let started = supervisor
        .runners()
        .iter()
        .map(|runner| runner.did_start().signalled_at().expect("started"))
        .collect::<Vec<_>>();
    assert!(started.windows(2).all(|pair| pair[0] <= pair[1]));
    for pair in supervisor.runners().windows(2) {
        let dependency_ready = pair[0].did_start().signalled_at().expect("dependency started");
        let first_byte = pair[1].log_buffer().first_write_at().expect("dependent wrote");
        assert!(first_byte >= dependency_ready, "{} wrote early", pair[1].title());
    }

    let mut stopping = Vec::new();
    supervisor.stop_all_with_progress(|progress| {
        if let ShutdownProgress::Stopping { process } = progress {
            stopping.push(process);
        }
    });
    assert_eq!(stopping, vec!["composer", "cometbft", "sequencer"]);
    assert!(supervisor
        .exit_reports()
        .iter()
        .all(|(_, report)| report.as_ref().is_some_and(|report| report.clean)));
    assert!(supervisor.start_failures().is_empty());
}
