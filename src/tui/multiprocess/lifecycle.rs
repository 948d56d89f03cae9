use std::io;
use std::time::Instant;

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use ratatui::Terminal;

use crate::process_manager::{ShutdownProgress, Supervisor};
use crate::ui::{OutputMode, PlainRenderer, ProcessOutcome, ProcessTally, Renderer};

use super::terminal_text::format_elapsed;
use super::ProcessTuiError;

pub(super) type TuiTerminal = Terminal<CrosstermBackend<std::io::Stdout>>;

pub(super) fn init_terminal() -> Result<TuiTerminal, io::Error> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

pub(super) fn restore_terminal(terminal: &mut TuiTerminal) -> Result<(), io::Error> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen,
        EnableLineWrap
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Stops every runner, last-started first, redrawing a status line between
/// steps so a slow grace period is visible.
pub(super) fn shutdown_with_progress(terminal: &mut TuiTerminal, supervisor: &Supervisor) {
    supervisor.stop_all_with_progress(|progress| {
        let label = match progress {
            ShutdownProgress::Stopping { process } => {
                format!("Shutdown: stopping {process} (interrupt, then kill after grace period)...")
            }
            ShutdownProgress::Stopped { process, .. } => format!("Shutdown: {process} stopped."),
            ShutdownProgress::Complete { total } => {
                format!("Shutdown: complete ({total} processes).")
            }
        };
        let _ = draw_shutdown_status(terminal, &label);
    });
}

/// Prints one status row per runner and returns the runners whose last exit
/// was not clean.
pub(super) fn render_summary(
    supervisor: &Supervisor,
) -> Result<Vec<(String, String)>, ProcessTuiError> {
    let mut renderer = PlainRenderer::stdout(OutputMode::from_env());
    renderer.section("Process Results")?;
    let now = Instant::now();
    let mut failed = Vec::new();
    let mut tally = ProcessTally::default();
    for runner in supervisor.runners() {
        let elapsed = runner
            .did_start()
            .signalled_at()
            .map(|started| format_elapsed(now.saturating_duration_since(started)))
            .unwrap_or_else(|| "0s".to_owned());
        let outcome = match runner.last_exit() {
            Some(report) if report.clean => ProcessOutcome::Clean { elapsed },
            Some(report) => {
                failed.push((runner.title().to_owned(), report.message.clone()));
                ProcessOutcome::Failed {
                    message: report.message,
                    elapsed,
                }
            }
            None => ProcessOutcome::NeverStarted,
        };
        tally.record(&outcome);
        renderer.process_result(runner.title(), &outcome)?;
    }
    renderer.tally(tally)?;
    renderer.text("")?;
    Ok(failed)
}

fn draw_shutdown_status(terminal: &mut TuiTerminal, status: &str) -> Result<(), io::Error> {
    terminal.draw(|frame| {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let footer = Paragraph::new(status.to_owned()).style(Style::default().fg(Color::Yellow));
        frame.render_widget(footer, chunks[1]);
    })?;
    Ok(())
}
