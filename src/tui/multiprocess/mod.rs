//! Multi-pane view over a running [`Supervisor`].
//!
//! Producer threads never touch widgets: one feed thread per pane copies new
//! log bytes into a draw queue and the UI thread drains it between frames.

use std::io;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use crossterm::event;
use ratatui::backend::Backend;
use ratatui::Terminal;

use crate::process_manager::Supervisor;
use crate::tui::core::LoopControl;
use crate::ui::UiError;

mod config;
mod controller;
mod diagnostics;
mod events;
mod feed;
mod lifecycle;
mod pane;
mod render;
mod state;
mod terminal_text;

use config::{INPUT_POLL_WAIT, MAX_DRAW_REQUESTS_PER_FRAME, PANE_TICK};
use controller::ViewController;
use diagnostics::RuntimeDiagnostics;
use events::handle_event;
use feed::{spawn_pane_feed, DrawRequest};
use lifecycle::{init_terminal, render_summary, restore_terminal, shutdown_with_progress};
use pane::ProcessPane;
use state::StateStore;

pub(crate) use diagnostics::DIAGNOSTICS_ENV;

#[derive(Debug)]
pub enum ProcessTuiError {
    Io(io::Error),
    Ui(UiError),
    NoProcesses,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTuiOutcome {
    /// `(process, exit message)` for every runner whose last exit was not
    /// clean.
    pub failed_exits: Vec<(String, String)>,
    /// Trace lines, empty unless diagnostics are enabled.
    pub diagnostics: Vec<String>,
}

impl std::fmt::Display for ProcessTuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessTuiError::Io(err) => write!(f, "{err}"),
            ProcessTuiError::Ui(err) => write!(f, "{err}"),
            ProcessTuiError::NoProcesses => write!(f, "process view has no processes to show"),
        }
    }
}

impl std::error::Error for ProcessTuiError {}

impl From<io::Error> for ProcessTuiError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<UiError> for ProcessTuiError {
    fn from(value: UiError) -> Self {
        Self::Ui(value)
    }
}

/// Runs the interactive view until the operator quits or the supervisor's
/// cancel scope fires, then stops every runner and prints a summary.
///
/// The supervisor should already be launched; panes of runners that have not
/// started yet simply show a waiting hint.
pub fn run_process_tui(
    supervisor: &Supervisor,
    environment: Vec<(String, String)>,
) -> Result<ProcessTuiOutcome, ProcessTuiError> {
    if supervisor.runners().is_empty() {
        return Err(ProcessTuiError::NoProcesses);
    }
    let cancel = supervisor.cancel_scope().clone();
    let mut terminal = init_terminal()?;

    let (draw_tx, draw_rx) = mpsc::channel();
    let feeds = supervisor
        .runners()
        .iter()
        .enumerate()
        .map(|(idx, runner)| {
            spawn_pane_feed(
                idx,
                runner.log_buffer(),
                draw_tx.clone(),
                cancel.clone(),
                PANE_TICK,
            )
        })
        .collect::<Vec<_>>();
    let panes = supervisor
        .runners()
        .iter()
        .cloned()
        .map(ProcessPane::new)
        .collect::<Vec<ProcessPane>>();
    let mut controller = ViewController::new(
        panes,
        environment,
        Arc::new(StateStore::new()),
        cancel.clone(),
        draw_tx,
        RuntimeDiagnostics::from_env(),
    );

    let result = event_loop(&mut terminal, &mut controller, &draw_rx);

    cancel.cancel();
    shutdown_with_progress(&mut terminal, supervisor);
    controller.join_workers();
    for feed in feeds {
        let _ = feed.join();
    }
    restore_terminal(&mut terminal)?;
    let failed_exits = render_summary(supervisor)?;
    result?;

    Ok(ProcessTuiOutcome {
        failed_exits,
        diagnostics: controller.diagnostics().traces(),
    })
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    controller: &mut ViewController,
    draw_rx: &Receiver<DrawRequest>,
) -> Result<(), ProcessTuiError> {
    loop {
        if controller.is_cancelled() {
            return Ok(());
        }
        drain_draw_queue(controller, draw_rx);
        terminal.draw(|frame| controller.render(frame))?;

        if event::poll(INPUT_POLL_WAIT)? {
            if handle_event(controller, event::read()?) == LoopControl::Quit {
                return Ok(());
            }
        }
    }
}

fn drain_draw_queue(controller: &mut ViewController, draw_rx: &Receiver<DrawRequest>) -> usize {
    let mut drained = 0usize;
    while drained < MAX_DRAW_REQUESTS_PER_FRAME {
        let Ok(request) = draw_rx.try_recv() else {
            break;
        };
        controller.apply(request);
        drained += 1;
    }
    drained
}

#[cfg(test)]
#[path = "../../tests/tui_controller_tests.rs"]
mod tests;
