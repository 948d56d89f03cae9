use std::collections::VecDeque;
use std::time::Instant;

use crossterm::event::KeyEvent;

const MAX_TRACE_LINES: usize = 48;
pub(crate) const DIAGNOSTICS_ENV: &str = "DEVSTACK_TUI_DIAGNOSTICS";

#[derive(Debug, Clone)]
pub(crate) struct RuntimeDiagnostics {
    enabled: bool,
    started_at: Instant,
    frame_count: usize,
    keypress_count: usize,
    draw_requests: usize,
    output_bytes: usize,
    restarts: usize,
    view_switches: usize,
    traces: VecDeque<String>,
}

impl RuntimeDiagnostics {
    pub(crate) fn from_env() -> Self {
        let enabled = std::env::var(DIAGNOSTICS_ENV)
            .ok()
            .is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true"));
        Self::new(enabled)
    }

    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started_at: Instant::now(),
            frame_count: 0,
            keypress_count: 0,
            draw_requests: 0,
            output_bytes: 0,
            restarts: 0,
            view_switches: 0,
            traces: VecDeque::new(),
        }
    }

    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn traces(&self) -> Vec<String> {
        self.traces.iter().cloned().collect()
    }

    /// One-line counter summary for the legend.
    pub(crate) fn summary_line(&self) -> String {
        format!(
            "diag t={}ms frames={} keys={} draws={} bytes={} restarts={} views={}",
            self.started_at.elapsed().as_millis(),
            self.frame_count,
            self.keypress_count,
            self.draw_requests,
            self.output_bytes,
            self.restarts,
            self.view_switches
        )
    }

    pub(crate) fn record_frame(&mut self) {
        if !self.enabled {
            return;
        }
        self.frame_count = self.frame_count.saturating_add(1);
    }

    pub(crate) fn record_keypress(&mut self, key: &KeyEvent) {
        if !self.enabled {
            return;
        }
        self.keypress_count = self.keypress_count.saturating_add(1);
        self.push_trace(format!(
            "key code={:?} modifiers={:?}",
            key.code, key.modifiers
        ));
    }

    pub(crate) fn record_output(&mut self, pane: &str, bytes: usize) {
        if !self.enabled {
            return;
        }
        self.draw_requests = self.draw_requests.saturating_add(1);
        self.output_bytes = self.output_bytes.saturating_add(bytes);
        self.push_trace(format!("output pane={pane} bytes={bytes}"));
    }

    pub(crate) fn record_restart(&mut self, pane: &str) {
        if !self.enabled {
            return;
        }
        self.restarts = self.restarts.saturating_add(1);
        self.push_trace(format!("restart pane={pane}"));
    }

    pub(crate) fn record_view_switch(&mut self, from: &str, to: &str) {
        if !self.enabled {
            return;
        }
        self.view_switches = self.view_switches.saturating_add(1);
        self.push_trace(format!("view {from} -> {to}"));
    }

    fn push_trace(&mut self, line: String) {
        self.traces.push_back(line);
        while self.traces.len() > MAX_TRACE_LINES {
            self.traces.pop_front();
        }
    }
}
