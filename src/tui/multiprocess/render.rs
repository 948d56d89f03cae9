use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;

use crate::tui::core::View;

use super::controller::ViewController;

mod environment;
mod footer;
mod header;

use environment::render_environment;
use footer::render_legend;
pub(super) use header::panel_block;

pub(super) fn render_view(
    frame: &mut Frame<'_>,
    controller: &mut ViewController,
    spinner_tick: usize,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    match controller.view() {
        View::Main => {
            let count = controller.panes().len();
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints(vec![Constraint::Fill(1); count.max(1)])
                .split(chunks[0]);
            for (idx, area) in rows.iter().enumerate().take(count) {
                if let Some(pane) = controller.pane_mut(idx) {
                    pane.render(frame, *area, spinner_tick);
                }
            }
        }
        View::Fullscreen { pane } => {
            if let Some(pane) = controller.pane_mut(pane) {
                pane.render(frame, chunks[0], spinner_tick);
            }
        }
        View::Environment => render_environment(frame, chunks[0], controller.environment()),
    }

    render_legend(frame, chunks[1], controller);
}
