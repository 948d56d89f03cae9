use std::time::Duration;

pub(super) const PANE_TICK: Duration = Duration::from_millis(250);
pub(super) const MAX_DRAW_REQUESTS_PER_FRAME: usize = 200;
pub(super) const INPUT_POLL_WAIT: Duration = Duration::from_millis(50);
pub(super) const MAX_PANE_LINES: usize = 5000;
pub(super) const MAX_PARTIAL_LINE_BYTES: usize = 16 * 1024;
pub(super) const MOUSE_SCROLL_LINES: isize = 1;
