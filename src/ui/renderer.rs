use std::fmt::{Display, Formatter};

use crate::ui::widgets::{KeyValue, MessageBlock, ProcessOutcome, ProcessTally, TableSpec};

pub type UiResult<T> = Result<T, UiError>;

#[derive(Debug)]
pub enum UiError {
    Io(std::io::Error),
}

impl Display for UiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UiError::Io(error) => write!(f, "failed to write output: {error}"),
        }
    }
}

impl std::error::Error for UiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UiError::Io(error) => Some(error),
        }
    }
}

impl From<std::io::Error> for UiError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// A running spinner line. Dropping it without finishing leaves the last
/// message on screen.
pub trait SpinnerHandle {
    fn set_message(&self, message: &str);
    fn finish_error(&self, message: &str);
}

/// Operator-facing output outside the process view: command listings, the
/// exit summary and error reports.
pub trait Renderer {
    fn text(&mut self, body: &str) -> UiResult<()>;
    fn section(&mut self, title: &str) -> UiResult<()>;
    fn warning(&mut self, body: &str) -> UiResult<()>;
    fn bullet_list(&mut self, title: &str, items: &[String]) -> UiResult<()>;

    fn error_block(&mut self, block: &MessageBlock) -> UiResult<()>;
    fn warning_block(&mut self, block: &MessageBlock) -> UiResult<()>;

    fn key_values(&mut self, items: &[KeyValue]) -> UiResult<()>;
    fn process_result(&mut self, process: &str, outcome: &ProcessOutcome) -> UiResult<()>;
    fn tally(&mut self, tally: ProcessTally) -> UiResult<()>;

    fn table(&mut self, spec: &TableSpec) -> UiResult<()>;
    fn spinner(&mut self, label: &str) -> UiResult<Box<dyn SpinnerHandle>>;
}
