use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::ui::renderer::SpinnerHandle;

const SPINNER_TICK: Duration = Duration::from_millis(80);

/// Used when the stream is not a terminal; the renderer has already printed
/// the label as a plain line.
#[derive(Debug, Default)]
pub struct SilentSpinner;

impl SpinnerHandle for SilentSpinner {
    fn set_message(&self, _message: &str) {}

    fn finish_error(&self, _message: &str) {}
}

#[derive(Debug, Clone)]
pub struct TerminalSpinner {
    progress: ProgressBar,
}

impl TerminalSpinner {
    pub fn start(label: &str) -> Self {
        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            progress.set_style(style);
        }
        progress.set_message(label.to_owned());
        progress.enable_steady_tick(SPINNER_TICK);
        Self { progress }
    }
}

impl SpinnerHandle for TerminalSpinner {
    fn set_message(&self, message: &str) {
        self.progress.set_message(message.to_owned());
    }

    fn finish_error(&self, message: &str) {
        self.progress.abandon_with_message(message.to_owned());
    }
}
