use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::backend::TestBackend;

use super::*;
use crate::process_manager::{CancelScope, ProcessRunner, ProcessSpec, Supervisor};
use crate::tui::core::View;

fn key(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn press(controller: &mut ViewController, code: KeyCode) -> LoopControl {
    handle_event(controller, key(code))
}

fn controller_for(titles: &[&str]) -> (ViewController, mpsc::Receiver<DrawRequest>, CancelScope) {
    let runners = titles
        .iter()
        .map(|title| ProcessRunner::new(ProcessSpec::new(*title, "/bin/true")))
        .collect::<Vec<_>>();
    controller_for_runners(runners)
}

fn controller_for_runners(
    runners: Vec<ProcessRunner>,
) -> (ViewController, mpsc::Receiver<DrawRequest>, CancelScope) {
    let cancel = CancelScope::new();
    let (tx, rx) = mpsc::channel();
    let panes = runners.into_iter().map(ProcessPane::new).collect();
    let controller = ViewController::new(
        panes,
        vec![
            ("CHAIN_ID".to_owned(), "sequencer-test-chain-0".to_owned()),
            ("LOG".to_owned(), "info".to_owned()),
        ],
        Arc::new(StateStore::new()),
        cancel.clone(),
        tx,
        RuntimeDiagnostics::new(false),
    );
    (controller, rx, cancel)
}

fn draw(controller: &mut ViewController) -> String {
    let mut terminal = Terminal::new(TestBackend::new(60, 18)).expect("terminal");
    terminal
        .draw(|frame| controller.render(frame))
        .expect("draw");
    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

fn feed(controller: &mut ViewController, pane: usize, from: usize, bytes: &[u8]) {
    controller.apply(DrawRequest::Output {
        pane,
        from,
        to: from + bytes.len(),
        bytes: bytes.to_vec(),
    });
}

#[test]
fn fullscreen_toggles_borders_and_escape_restores_main_view() {
    let (mut controller, _rx, _cancel) = controller_for(&["sequencer", "cometbft", "composer"]);
    feed(&mut controller, 1, 0, b"consensus online\n");

    press(&mut controller, KeyCode::Down);
    press(&mut controller, KeyCode::Enter);
    assert_eq!(controller.view(), View::Fullscreen { pane: 1 });
    let screen = draw(&mut controller);
    assert!(screen.contains("cometbft"));
    assert!(screen.contains("consensus online"));
    assert!(!screen.contains("sequencer"));
    assert!(!screen.contains("composer"));
    assert!(screen.contains('╭'));

    press(&mut controller, KeyCode::Char('b'));
    assert!(controller.panes()[1].borderless());
    assert!(controller.store().borderless());
    let screen = draw(&mut controller);
    assert!(!screen.contains('╭'));
    assert!(screen.starts_with("consensus online"));

    press(&mut controller, KeyCode::Esc);
    assert_eq!(controller.view(), View::Main);
    assert!(!controller.panes()[1].borderless());
    assert!(!controller.store().borderless());
    let screen = draw(&mut controller);
    assert!(screen.contains('╭'));
    for title in ["sequencer", "cometbft", "composer"] {
        assert!(screen.contains(title), "missing pane {title}");
    }
}

#[test]
fn highlight_moves_and_wraps_with_exactly_one_pane_highlighted() {
    let (mut controller, _rx, _cancel) = controller_for(&["a", "b", "c"]);
    assert_eq!(controller.highlighted(), 0);

    press(&mut controller, KeyCode::Up);
    assert_eq!(controller.highlighted(), 2);
    press(&mut controller, KeyCode::Down);
    assert_eq!(controller.highlighted(), 0);
    press(&mut controller, KeyCode::Down);
    assert_eq!(controller.highlighted(), 1);

    let highlighted = controller
        .panes()
        .iter()
        .filter(|pane| pane.is_highlighted())
        .count();
    assert_eq!(highlighted, 1);
    assert!(controller.panes()[1].is_highlighted());
}

#[test]
fn environment_overlay_returns_to_fullscreen_with_its_borderless_state() {
    let (mut controller, _rx, _cancel) = controller_for(&["sequencer", "conductor"]);
    press(&mut controller, KeyCode::Enter);
    press(&mut controller, KeyCode::Char('b'));
    assert!(controller.panes()[0].borderless());

    press(&mut controller, KeyCode::Char('e'));
    assert_eq!(controller.view(), View::Environment);
    assert!(!controller.store().borderless());
    assert!(!controller.panes()[0].borderless());
    let screen = draw(&mut controller);
    assert!(screen.contains("CHAIN_ID=sequencer-test-chain-0"));
    assert!(screen.contains("LOG=info"));

    press(&mut controller, KeyCode::Esc);
    assert_eq!(controller.view(), View::Fullscreen { pane: 0 });
    assert!(controller.store().borderless());
    assert!(controller.panes()[0].borderless());
}

#[test]
fn environment_overlay_from_main_returns_to_main() {
    let (mut controller, _rx, _cancel) = controller_for(&["sequencer"]);
    press(&mut controller, KeyCode::Char('e'));
    assert_eq!(controller.view(), View::Environment);
    press(&mut controller, KeyCode::Char('e'));
    assert_eq!(controller.view(), View::Main);
    assert!(controller.store().previous_view().is_none());
}

#[test]
fn main_view_toggles_apply_to_every_pane_and_fullscreen_to_one() {
    let (mut controller, _rx, _cancel) = controller_for(&["a", "b"]);
    press(&mut controller, KeyCode::Char('w'));
    press(&mut controller, KeyCode::Char('a'));
    assert!(controller.panes().iter().all(|pane| pane.wrap()));
    assert!(controller.panes().iter().all(|pane| !pane.autoscroll()));
    assert!(controller.store().wrap());
    assert!(!controller.store().autoscroll());

    press(&mut controller, KeyCode::Char('a'));
    press(&mut controller, KeyCode::Enter);
    press(&mut controller, KeyCode::Char('w'));
    press(&mut controller, KeyCode::Char('a'));
    assert!(!controller.panes()[0].wrap());
    assert!(!controller.panes()[0].autoscroll());
    assert!(controller.panes()[1].wrap());
    assert!(controller.panes()[1].autoscroll());
    assert!(controller.store().wrap());
}

#[test]
fn fullscreen_scrolling_only_moves_when_autoscroll_is_off() {
    let (mut controller, _rx, _cancel) = controller_for(&["sequencer"]);
    let payload = (0..40).map(|i| format!("block {i}\n")).collect::<String>();
    feed(&mut controller, 0, 0, payload.as_bytes());
    press(&mut controller, KeyCode::Enter);
    draw(&mut controller);
    let tail = controller.panes()[0].scroll_offset();
    assert!(tail > 0);

    press(&mut controller, KeyCode::Up);
    draw(&mut controller);
    assert_eq!(controller.panes()[0].scroll_offset(), tail);

    press(&mut controller, KeyCode::Char('0'));
    assert!(!controller.panes()[0].autoscroll());
    let screen = draw(&mut controller);
    assert_eq!(controller.panes()[0].scroll_offset(), 0);
    assert!(screen.contains("block 0"));

    press(&mut controller, KeyCode::Down);
    handle_event(
        &mut controller,
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        }),
    );
    draw(&mut controller);
    assert_eq!(controller.panes()[0].scroll_offset(), 2);

    press(&mut controller, KeyCode::Char('1'));
    draw(&mut controller);
    assert_eq!(controller.panes()[0].scroll_offset(), tail);
    assert!(!controller.panes()[0].autoscroll());
}

#[test]
fn quit_keys_cancel_the_root_scope() {
    let (mut controller, _rx, cancel) = controller_for(&["sequencer"]);
    assert_eq!(press(&mut controller, KeyCode::Char('x')), LoopControl::Continue);
    assert_eq!(press(&mut controller, KeyCode::Char('q')), LoopControl::Quit);
    assert!(cancel.is_cancelled());

    let (mut controller, _rx, cancel) = controller_for(&["sequencer"]);
    press(&mut controller, KeyCode::Char('e'));
    assert_eq!(press(&mut controller, KeyCode::Char('q')), LoopControl::Continue);
    let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert_eq!(handle_event(&mut controller, ctrl_c), LoopControl::Quit);
    assert!(cancel.is_cancelled());
}

#[test]
fn fullscreen_q_returns_to_main_instead_of_quitting() {
    let (mut controller, _rx, cancel) = controller_for(&["sequencer"]);
    press(&mut controller, KeyCode::Enter);
    assert_eq!(press(&mut controller, KeyCode::Char('q')), LoopControl::Continue);
    assert_eq!(controller.view(), View::Main);
    assert!(!cancel.is_cancelled());
}

#[test]
fn draw_queue_is_drained_in_bounded_batches() {
    let (mut controller, _rx, _cancel) = controller_for(&["sequencer"]);
    let (tx, rx) = mpsc::channel();
    for _ in 0..(MAX_DRAW_REQUESTS_PER_FRAME + 10) {
        tx.send(DrawRequest::Redraw).expect("send");
    }
    assert_eq!(
        drain_draw_queue(&mut controller, &rx),
        MAX_DRAW_REQUESTS_PER_FRAME
    );
    assert_eq!(drain_draw_queue(&mut controller, &rx), 10);
}

#[test]
fn empty_panes_render_without_output() {
    let (mut controller, _rx, _cancel) = controller_for(&["sequencer", "composer"]);
    let screen = draw(&mut controller);
    assert!(screen.contains("waiting for first output"));
    assert!(screen.contains("select"));
}

#[cfg(unix)]
fn wait_for_log(runner: &ProcessRunner, needle: &str, occurrences: usize) -> Vec<u8> {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let contents = runner.log_buffer().contents();
        let text = String::from_utf8_lossy(&contents);
        if text.matches(needle).count() >= occurrences {
            return contents;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {needle:?}: {text}");
        thread::sleep(Duration::from_millis(20));
    }
}

#[cfg(unix)]
#[test]
fn restart_appends_sentinel_then_new_output_without_rewinding() {
    let supervisor = Supervisor::new(
        vec![ProcessSpec::new("ticker", "/bin/sh")
            .with_args(["-c", "echo tick; exec sleep 30"])
            .with_env([format!("PATH={}", std::env::var("PATH").unwrap_or_default())])],
        CancelScope::new(),
    );
    supervisor.launch();
    let runner = supervisor.runners()[0].clone();
    let (mut controller, _rx, _cancel) = controller_for_runners(vec![runner.clone()]);

    let first = wait_for_log(&runner, "tick", 1);
    feed(&mut controller, 0, 0, &first);
    let before_restart = controller.panes()[0].last_read();

    press(&mut controller, KeyCode::Char('r'));
    let second = wait_for_log(&runner, "tick", 2);
    feed(
        &mut controller,
        0,
        before_restart,
        &second[before_restart..],
    );

    assert!(controller.panes()[0].last_read() > before_restart);
    assert_eq!(
        controller.panes()[0].lines(),
        vec![
            "tick".to_owned(),
            "process exited cleanly".to_owned(),
            "tick".to_owned(),
        ]
    );
    assert_eq!(runner.restart_count(), 1);
    assert_eq!(runner.spec().args, vec!["-c", "echo tick; exec sleep 30"]);

    supervisor.stop_all();
    controller.join_workers();
}
