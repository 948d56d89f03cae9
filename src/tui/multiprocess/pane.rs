use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};
use ratatui::Frame;

use crate::process_manager::{ProcessRunner, RunnerState};

use super::render::panel_block;
use super::terminal_text::PaneText;

const SPINNER_FRAMES: [&str; 10] = [
    "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
];

/// Display side of one runner. Lives on the UI thread; its only input is the
/// bytes the pane feed posts through the draw queue.
#[derive(Debug)]
pub(crate) struct ProcessPane {
    title: String,
    runner: ProcessRunner,
    text: PaneText,
    last_read: usize,
    highlighted: bool,
    autoscroll: bool,
    wrap: bool,
    borderless: bool,
    scroll: usize,
}

impl ProcessPane {
    pub(crate) fn new(runner: ProcessRunner) -> Self {
        Self {
            title: runner.title().to_owned(),
            runner,
            text: PaneText::new(),
            last_read: 0,
            highlighted: false,
            autoscroll: true,
            wrap: false,
            borderless: false,
            scroll: 0,
        }
    }

    pub(crate) fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    pub(crate) fn last_read(&self) -> usize {
        self.last_read
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.text.lines()
    }

    pub(crate) fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub(crate) fn autoscroll(&self) -> bool {
        self.autoscroll
    }

    pub(crate) fn wrap(&self) -> bool {
        self.wrap
    }

    pub(crate) fn borderless(&self) -> bool {
        self.borderless
    }

    pub(crate) fn scroll_offset(&self) -> usize {
        self.scroll
    }

    /// Returns whether anything new was ingested. Requests that end at or
    /// before `last_read` are stale and dropped.
    pub(crate) fn apply_output(&mut self, from: usize, to: usize, bytes: &[u8]) -> bool {
        if to <= self.last_read {
            return false;
        }
        let skip = self.last_read.saturating_sub(from).min(bytes.len());
        self.text.ingest(&bytes[skip..]);
        self.last_read = to;
        true
    }

    pub(crate) fn set_autoscroll(&mut self, enabled: bool) {
        self.autoscroll = enabled;
        if enabled {
            self.scroll_to_tail();
        }
    }

    pub(crate) fn set_wrap(&mut self, enabled: bool) {
        self.wrap = enabled;
    }

    pub(crate) fn set_borderless(&mut self, enabled: bool) {
        self.borderless = enabled;
    }

    pub(crate) fn highlight(&mut self, enabled: bool) {
        self.highlighted = enabled;
    }

    pub(crate) fn scroll_to_head(&mut self) {
        self.scroll = 0;
    }

    /// Clamped to the last page on the next render.
    pub(crate) fn scroll_to_tail(&mut self) {
        self.scroll = usize::MAX;
    }

    pub(crate) fn scroll_by(&mut self, delta: isize) {
        self.scroll = self.scroll.saturating_add_signed(delta);
    }

    pub(crate) fn render(&mut self, frame: &mut Frame<'_>, area: Rect, spinner_tick: usize) {
        let block = (!self.borderless).then(|| self.block());
        let inner = block.as_ref().map_or(area, |block| block.inner(area));
        let viewport = inner.height as usize;

        if self.text.is_empty() {
            let spinner = SPINNER_FRAMES[spinner_tick % SPINNER_FRAMES.len()];
            let mut hint = Paragraph::new(Line::from(vec![
                Span::styled(spinner.to_owned(), Style::default().fg(Color::Yellow)),
                Span::styled(
                    " waiting for first output...",
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
            if let Some(block) = block {
                hint = hint.block(block);
            }
            frame.render_widget(hint, area);
            return;
        }

        let mut paragraph = Paragraph::new(self.text.styled_lines(Style::default()));
        if self.wrap {
            paragraph = paragraph.wrap(Wrap { trim: false });
        }
        let total = paragraph.line_count(inner.width.max(1));
        let max_offset = total.saturating_sub(viewport);
        self.scroll = if self.autoscroll {
            max_offset
        } else {
            self.scroll.min(max_offset)
        };
        paragraph = paragraph.scroll((self.scroll.min(u16::MAX as usize) as u16, 0));
        let bordered = block.is_some();
        if let Some(block) = block {
            paragraph = paragraph.block(block);
        }
        frame.render_widget(paragraph, area);

        if bordered && max_offset > 0 {
            let mut scrollbar_state = ScrollbarState::new(max_offset)
                .viewport_content_length(viewport.max(1))
                .position(self.scroll);
            frame.render_stateful_widget(
                Scrollbar::default().orientation(ScrollbarOrientation::VerticalRight),
                area,
                &mut scrollbar_state,
            );
        }
    }

    fn block(&self) -> ratatui::widgets::Block<'static> {
        let border_color = if self.highlighted {
            Color::Magenta
        } else {
            Color::DarkGray
        };
        let mut title = Vec::new();
        if self.highlighted {
            title.push(Span::styled(
                " ▶ ",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::REVERSED),
            ));
        }
        title.push(Span::styled(
            format!(" {} ", self.title),
            Style::default()
                .fg(if self.highlighted {
                    Color::Magenta
                } else {
                    Color::Gray
                })
                .add_modifier(Modifier::BOLD),
        ));
        panel_block(Line::from(title), border_color)
            .title_bottom(Line::from(self.status_span()).right_aligned())
    }

    fn status_span(&self) -> Span<'static> {
        let state = self.runner.state();
        let restarts = self.runner.restart_count();
        let mut label = format!(" {} ", state.label());
        if restarts > 0 {
            label = format!(" {} · restarts {restarts} ", state.label());
        }
        let color = match (state, self.runner.last_exit()) {
            (RunnerState::Running, _) => Color::Green,
            (RunnerState::Exited, Some(report)) if !report.clean => Color::Red,
            (RunnerState::Exited, _) => Color::DarkGray,
            _ => Color::Yellow,
        };
        Span::styled(label, Style::default().fg(color))
    }
}
