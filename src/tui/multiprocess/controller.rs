use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use ratatui::Frame;

use crate::process_manager::CancelScope;
use crate::tui::core::{next_index, prev_index, LoopControl, View};

use super::diagnostics::RuntimeDiagnostics;
use super::feed::DrawRequest;
use super::pane::ProcessPane;
use super::render::render_view;
use super::state::StateStore;

/// Owns the panes and the current view. Every method runs on the UI thread.
#[derive(Debug)]
pub(crate) struct ViewController {
    panes: Vec<ProcessPane>,
    store: Arc<StateStore>,
    view: View,
    highlighted: usize,
    environment: Vec<(String, String)>,
    diagnostics: RuntimeDiagnostics,
    cancel: CancelScope,
    draw_queue: Sender<DrawRequest>,
    workers: Vec<JoinHandle<()>>,
    spinner_tick: usize,
}

impl ViewController {
    pub(crate) fn new(
        mut panes: Vec<ProcessPane>,
        environment: Vec<(String, String)>,
        store: Arc<StateStore>,
        cancel: CancelScope,
        draw_queue: Sender<DrawRequest>,
        diagnostics: RuntimeDiagnostics,
    ) -> Self {
        let state = store.snapshot();
        for (idx, pane) in panes.iter_mut().enumerate() {
            pane.highlight(idx == 0);
            pane.set_autoscroll(state.autoscroll);
            pane.set_wrap(state.wrap);
            pane.set_borderless(false);
        }
        Self {
            panes,
            store,
            view: View::Main,
            highlighted: 0,
            environment,
            diagnostics,
            cancel,
            draw_queue,
            workers: Vec::new(),
            spinner_tick: 0,
        }
    }

    pub(crate) fn view(&self) -> View {
        self.view
    }

    pub(crate) fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub(crate) fn panes(&self) -> &[ProcessPane] {
        &self.panes
    }

    pub(crate) fn store(&self) -> &StateStore {
        &self.store
    }

    pub(crate) fn environment(&self) -> &[(String, String)] {
        &self.environment
    }

    pub(crate) fn diagnostics(&self) -> &RuntimeDiagnostics {
        &self.diagnostics
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut RuntimeDiagnostics {
        &mut self.diagnostics
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn apply(&mut self, request: DrawRequest) {
        match request {
            DrawRequest::Output {
                pane,
                from,
                to,
                bytes,
            } => {
                let Some(target) = self.panes.get_mut(pane) else {
                    return;
                };
                if target.apply_output(from, to, &bytes) {
                    self.diagnostics.record_output(target.title(), bytes.len());
                }
            }
            DrawRequest::Redraw => {}
        }
    }

    pub(crate) fn render(&mut self, frame: &mut Frame<'_>) {
        self.spinner_tick = self.spinner_tick.wrapping_add(1);
        self.diagnostics.record_frame();
        let spinner_tick = self.spinner_tick;
        render_view(frame, self, spinner_tick);
    }

    pub(crate) fn pane_mut(&mut self, idx: usize) -> Option<&mut ProcessPane> {
        self.panes.get_mut(idx)
    }

    pub(crate) fn request_exit(&mut self) -> LoopControl {
        self.cancel.cancel();
        LoopControl::Quit
    }

    pub(crate) fn highlight_next(&mut self) {
        self.set_highlight(next_index(self.highlighted, self.panes.len()));
    }

    pub(crate) fn highlight_prev(&mut self) {
        self.set_highlight(prev_index(self.highlighted, self.panes.len()));
    }

    fn set_highlight(&mut self, idx: usize) {
        if let Some(pane) = self.panes.get_mut(self.highlighted) {
            pane.highlight(false);
        }
        self.highlighted = idx;
        if let Some(pane) = self.panes.get_mut(idx) {
            pane.highlight(true);
        }
    }

    pub(crate) fn enter_fullscreen(&mut self) {
        if self.panes.is_empty() {
            return;
        }
        let pane = self.highlighted;
        self.switch_view(View::Fullscreen { pane });
    }

    /// Leaves fullscreen for the main grid with borders restored.
    pub(crate) fn leave_fullscreen(&mut self) {
        self.store.reset_borderless();
        if let View::Fullscreen { pane } = self.view {
            if let Some(pane) = self.panes.get_mut(pane) {
                pane.set_borderless(false);
            }
        }
        self.switch_view(View::Main);
    }

    pub(crate) fn toggle_autoscroll_all(&mut self) {
        let enabled = self.store.toggle_autoscroll();
        for pane in &mut self.panes {
            pane.set_autoscroll(enabled);
        }
    }

    pub(crate) fn toggle_wrap_all(&mut self) {
        let enabled = self.store.toggle_wrap();
        for pane in &mut self.panes {
            pane.set_wrap(enabled);
        }
    }

    pub(crate) fn toggle_borderless(&mut self, idx: usize) {
        let enabled = self.store.toggle_borderless();
        if let Some(pane) = self.panes.get_mut(idx) {
            pane.set_borderless(enabled);
        }
    }

    pub(crate) fn show_environment(&mut self) {
        self.store.set_previous_view(self.view);
        self.store.reset_borderless();
        if let View::Fullscreen { pane } = self.view {
            if let Some(pane) = self.panes.get_mut(pane) {
                pane.set_borderless(false);
            }
        }
        self.switch_view(View::Environment);
    }

    /// Returns to whichever view opened the environment overlay, with the
    /// borderless flag it had then.
    pub(crate) fn leave_environment(&mut self) {
        let Some(previous) = self.store.take_previous_view() else {
            self.switch_view(View::Main);
            return;
        };
        self.store.set_borderless(previous.borderless);
        if let View::Fullscreen { pane } = previous.view {
            if let Some(pane) = self.panes.get_mut(pane) {
                pane.set_borderless(previous.borderless);
            }
        }
        self.switch_view(previous.view);
    }

    /// Restarts the pane's runner on a worker thread; the stop grace period
    /// must not stall input handling. Errors land in the pane's log.
    pub(crate) fn restart(&mut self, idx: usize) {
        let Some(pane) = self.panes.get(idx) else {
            return;
        };
        self.diagnostics.record_restart(pane.title());
        let runner = pane.runner().clone();
        let draw_queue = self.draw_queue.clone();
        self.workers.retain(|worker| !worker.is_finished());
        self.workers.push(thread::spawn(move || {
            if let Err(err) = runner.restart() {
                runner
                    .log_buffer()
                    .append_line(&format!("restart failed: {err}"));
            }
            let _ = draw_queue.send(DrawRequest::Redraw);
        }));
    }

    pub(crate) fn join_workers(&mut self) {
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }

    fn switch_view(&mut self, view: View) {
        if self.view != view {
            self.diagnostics
                .record_view_switch(self.view.name(), view.name());
        }
        self.view = view;
    }
}
