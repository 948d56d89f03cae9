use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::core::View;

use super::super::controller::ViewController;

pub(super) fn render_legend(frame: &mut Frame<'_>, area: Rect, controller: &ViewController) {
    let muted = Style::default().fg(Color::DarkGray);
    let active = Style::default().fg(Color::Yellow);
    let flag = |label: &str, enabled: bool| {
        Span::styled(
            format!("{label} [{}]", if enabled { "on" } else { "off" }),
            if enabled { active } else { muted },
        )
    };

    let mut items: Vec<Span<'static>> = match controller.view() {
        View::Main => {
            let state = controller.store().snapshot();
            vec![
                Span::styled("↑/↓ select", muted),
                Span::styled("enter fullscreen", muted),
                flag("a autoscroll", state.autoscroll),
                flag("w wrap", state.wrap),
                Span::styled("r restart", muted),
                Span::styled("e env", muted),
                Span::styled("q quit", muted),
            ]
        }
        View::Fullscreen { pane } => {
            let (autoscroll, wrap, borderless) = controller
                .panes()
                .get(pane)
                .map(|pane| (pane.autoscroll(), pane.wrap(), pane.borderless()))
                .unwrap_or_default();
            vec![
                Span::styled("q/esc back", muted),
                flag("a autoscroll", autoscroll),
                flag("w wrap", wrap),
                flag("b borderless", borderless),
                Span::styled("0 head", muted),
                Span::styled("1 tail", muted),
                Span::styled("↑/↓ scroll", muted),
                Span::styled("r restart", muted),
                Span::styled("e env", muted),
                Span::styled("ctrl+c quit", muted),
            ]
        }
        View::Environment => vec![
            Span::styled("q/esc/e back", muted),
            Span::styled("ctrl+c quit", muted),
        ],
    };
    if controller.diagnostics().enabled() {
        items.push(Span::styled(
            controller.diagnostics().summary_line(),
            Style::default().fg(Color::LightBlue),
        ));
    }

    let mut spans = Vec::with_capacity(items.len() * 2);
    for (idx, item) in items.into_iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled("  |  ", muted));
        }
        spans.push(item);
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
