use ratatui::style::{Color, Style};
use ratatui::symbols::border;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders};

pub(in crate::tui::multiprocess) fn panel_block(
    title: Line<'static>,
    border_color: Color,
) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(border_color))
        .title_top(title.left_aligned())
}
