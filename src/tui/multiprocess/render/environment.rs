use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

use super::header::panel_block;

pub(super) fn render_environment(
    frame: &mut Frame<'_>,
    area: Rect,
    environment: &[(String, String)],
) {
    let lines = if environment.is_empty() {
        vec![Line::from(Span::styled(
            "<no environment variables>",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        environment
            .iter()
            .map(|(key, value)| {
                Line::from(vec![
                    Span::styled(
                        key.clone(),
                        Style::default()
                            .fg(Color::LightBlue)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled("=", Style::default().fg(Color::DarkGray)),
                    Span::raw(value.clone()),
                ])
            })
            .collect()
    };
    let title = Line::from(Span::styled(
        " Environment ",
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    ));
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block(title, Color::Magenta));
    frame.render_widget(paragraph, area);
}
