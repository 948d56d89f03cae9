use std::io::{IsTerminal, Write};

use anstream::{AutoStream, ColorChoice};
use anstyle::Style;

use crate::ui::progress::{SilentSpinner, TerminalSpinner};
use crate::ui::renderer::{Renderer, SpinnerHandle, UiResult};
use crate::ui::table::render_table;
use crate::ui::theme::{is_ci_environment, resolve_color_enabled, OutputMode, Theme};
use crate::ui::widgets::{KeyValue, MessageBlock, ProcessOutcome, ProcessTally, TableSpec};

/// Line-oriented renderer for stdout, stderr or an in-memory buffer. Colour
/// is applied only when enabled; spinners only when progress is enabled.
pub struct PlainRenderer<W: Write> {
    writer: W,
    color_enabled: bool,
    progress_enabled: bool,
    theme: Theme,
}

impl<W: Write> PlainRenderer<W> {
    pub fn new(writer: W, color_enabled: bool) -> Self {
        Self {
            writer,
            color_enabled,
            progress_enabled: false,
            theme: Theme::default(),
        }
    }

    pub fn with_progress_enabled(mut self, enabled: bool) -> Self {
        self.progress_enabled = enabled;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if !self.color_enabled {
            return text.to_owned();
        }
        format!("{}{}{}", style.render(), text, style.render_reset())
    }

    fn write_block(&mut self, label: &str, style: Style, block: &MessageBlock) -> UiResult<()> {
        let marker = self.paint(style, label);
        writeln!(self.writer, "{marker} {}", block.title)?;
        for line in block.body.lines() {
            writeln!(self.writer, "  {line}")?;
        }
        if let Some(hint) = &block.hint {
            let hint_label = self.paint(self.theme.muted, "hint");
            writeln!(self.writer, "  {hint_label}: {hint}")?;
        }
        Ok(())
    }

    fn outcome_text(&self, outcome: &ProcessOutcome) -> String {
        match outcome {
            ProcessOutcome::Clean { elapsed } if self.color_enabled => format!(
                "{} {}",
                self.paint(self.theme.success, "✓ OK"),
                self.paint(self.theme.muted, elapsed)
            ),
            ProcessOutcome::Clean { elapsed } => format!("OK {elapsed}"),
            ProcessOutcome::Failed { message, elapsed } => format!(
                "{} {}",
                self.paint(self.theme.error, message),
                self.paint(self.theme.muted, elapsed)
            ),
            ProcessOutcome::NeverStarted => self.paint(self.theme.warning, "never started"),
        }
    }
}

fn color_choice(mode: OutputMode) -> ColorChoice {
    match mode {
        OutputMode::Auto => ColorChoice::Auto,
        OutputMode::Always => ColorChoice::AlwaysAnsi,
        OutputMode::Never => ColorChoice::Never,
    }
}

impl PlainRenderer<AutoStream<std::io::Stdout>> {
    pub fn stdout(mode: OutputMode) -> Self {
        let is_tty = std::io::stdout().is_terminal();
        let stream = AutoStream::new(std::io::stdout(), color_choice(mode));
        Self::new(stream, resolve_color_enabled(mode, is_tty))
            .with_progress_enabled(is_tty && !is_ci_environment())
    }
}

impl PlainRenderer<AutoStream<std::io::Stderr>> {
    pub fn stderr(mode: OutputMode) -> Self {
        let is_tty = std::io::stderr().is_terminal();
        let stream = AutoStream::new(std::io::stderr(), color_choice(mode));
        Self::new(stream, resolve_color_enabled(mode, is_tty))
            .with_progress_enabled(is_tty && !is_ci_environment())
    }
}

impl<W: Write> Renderer for PlainRenderer<W> {
    fn text(&mut self, body: &str) -> UiResult<()> {
        write!(self.writer, "{body}")?;
        if !body.ends_with('\n') {
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn section(&mut self, title: &str) -> UiResult<()> {
        let rendered = self.paint(self.theme.accent, title);
        let underline = self.paint(self.theme.muted, &"─".repeat(title.chars().count()));
        writeln!(self.writer, "{rendered}")?;
        writeln!(self.writer, "{underline}")?;
        Ok(())
    }

    fn warning(&mut self, body: &str) -> UiResult<()> {
        let marker = self.paint(self.theme.warning, "!");
        writeln!(self.writer, "{marker} {body}")?;
        Ok(())
    }

    fn bullet_list(&mut self, title: &str, items: &[String]) -> UiResult<()> {
        writeln!(self.writer, "{title}:")?;
        if items.is_empty() {
            writeln!(self.writer, "- <none>")?;
            return Ok(());
        }
        for item in items {
            writeln!(self.writer, "- {item}")?;
        }
        Ok(())
    }

    fn error_block(&mut self, block: &MessageBlock) -> UiResult<()> {
        self.write_block("[error]", self.theme.error, block)
    }

    fn warning_block(&mut self, block: &MessageBlock) -> UiResult<()> {
        self.write_block("[warning]", self.theme.warning, block)
    }

    fn key_values(&mut self, items: &[KeyValue]) -> UiResult<()> {
        for item in items {
            let key = self.paint(self.theme.label, &item.key);
            let value = self.paint(self.theme.value, &item.value);
            writeln!(self.writer, "{key}: {value}")?;
        }
        Ok(())
    }

    fn process_result(&mut self, process: &str, outcome: &ProcessOutcome) -> UiResult<()> {
        let name = self.paint(self.theme.label, process);
        let status = self.outcome_text(outcome);
        writeln!(self.writer, "{name}: {status}")?;
        Ok(())
    }

    fn tally(&mut self, tally: ProcessTally) -> UiResult<()> {
        let clean = self.paint(self.theme.success, &tally.clean.to_string());
        let failed = self.paint(self.theme.error, &tally.failed.to_string());
        let never = self.paint(self.theme.warning, &tally.never_started.to_string());
        writeln!(
            self.writer,
            "{} processes  clean:{clean}  failed:{failed}  never started:{never}",
            tally.total()
        )?;
        Ok(())
    }

    fn table(&mut self, spec: &TableSpec) -> UiResult<()> {
        let rendered = render_table(spec);
        writeln!(self.writer, "{rendered}")?;
        Ok(())
    }

    fn spinner(&mut self, label: &str) -> UiResult<Box<dyn SpinnerHandle>> {
        if self.progress_enabled {
            return Ok(Box::new(TerminalSpinner::start(label)));
        }
        let marker = self.paint(self.theme.accent, "◌");
        writeln!(self.writer, "{marker} {label}")?;
        Ok(Box::new(SilentSpinner))
    }
}
