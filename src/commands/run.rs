use crate::config::ResolvedStack;
use crate::process_manager::{CancelScope, ShutdownProgress, Supervisor};
use crate::tui::multiprocess::run_process_tui;
use crate::ui::{MessageBlock, OutputMode, PlainRenderer, Renderer};

use super::{color_enabled, into_output, CommandError};

/// Launches the resolved stack under one root cancel scope and hands the
/// terminal to the process view until the operator quits.
pub fn run_stack(stack: &ResolvedStack) -> Result<String, CommandError> {
    let supervisor = Supervisor::with_log_capacity(
        stack.processes.clone(),
        CancelScope::new(),
        stack.log_buffer_bytes,
    );
    supervisor.launch();

    let outcome = match run_process_tui(&supervisor, stack.environment_pairs()) {
        Ok(outcome) => outcome,
        Err(error) => {
            // Stops whatever is still running. When the failure came after the
            // event loop, the fleet is already down and this returns at once.
            let mut renderer = PlainRenderer::stderr(OutputMode::from_env());
            let spinner = renderer.spinner(&format!(
                "Stopping {} processes",
                supervisor.runners().len()
            ))?;
            supervisor.stop_all_with_progress(|progress| {
                if let ShutdownProgress::Stopping { process } = progress {
                    spinner.set_message(&format!("Stopping {process}"));
                }
            });
            spinner.finish_error("Stopped after process view failure");
            return Err(error.into());
        }
    };

    let failures = supervisor.start_failures();
    if !failures.is_empty() {
        return Err(CommandError::StartFailures { failures });
    }

    let mut renderer = PlainRenderer::new(Vec::<u8>::new(), color_enabled());
    for (process, message) in &outcome.failed_exits {
        renderer.warning_block(
            &MessageBlock::new(
                format!("{process} exited with an error"),
                message.clone(),
            )
            .with_hint("Its pane log holds the full output; `r` restarts a single process"),
        )?;
    }
    if !outcome.diagnostics.is_empty() {
        renderer.section("TUI Diagnostics")?;
        renderer.bullet_list("trace", &outcome.diagnostics)?;
    }
    into_output(renderer)
}
