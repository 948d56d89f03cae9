#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    Main,
    Fullscreen { pane: usize },
    Environment,
}

impl View {
    pub(crate) fn name(self) -> &'static str {
        match self {
            View::Main => "main",
            View::Fullscreen { .. } => "fullscreen",
            View::Environment => "environment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Quit,
}

pub(crate) fn next_index(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (current + 1) % len
    }
}

pub(crate) fn prev_index(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else if current == 0 {
        len - 1
    } else {
        current - 1
    }
}
