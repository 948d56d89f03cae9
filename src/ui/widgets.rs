/// A titled message with an optional follow-up hint, printed as an error or
/// warning block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBlock {
    pub title: String,
    pub body: String,
    pub hint: Option<String>,
}

impl MessageBlock {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// How a supervised process ended, as listed under "Process Results".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Clean { elapsed: String },
    Failed { message: String, elapsed: String },
    NeverStarted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessTally {
    pub clean: usize,
    pub failed: usize,
    pub never_started: usize,
}

impl ProcessTally {
    pub fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Clean { .. } => self.clean += 1,
            ProcessOutcome::Failed { .. } => self.failed += 1,
            ProcessOutcome::NeverStarted => self.never_started += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.clean + self.failed + self.never_started
    }
}

/// Column headers plus rows of cells. Rows shorter than the header are
/// padded when rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableSpec {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn rows<R, I, S>(self, rows: R) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        rows.into_iter().fold(self, |table, cells| table.row(cells))
    }
}
