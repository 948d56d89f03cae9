use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::process_manager::{CancelScope, LogBuffer};

/// Work posted to the UI thread. Nothing outside the UI thread touches a
/// pane; producers only enqueue these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DrawRequest {
    /// Bytes copied from a pane's log buffer, covering logical offsets
    /// `[from, to)`. `bytes` may carry a truncation marker instead of the
    /// evicted prefix.
    Output {
        pane: usize,
        from: usize,
        to: usize,
        bytes: Vec<u8>,
    },
    Redraw,
}

/// Polls `log` every `tick` and forwards whatever grew since the last poll.
/// Exits when `cancel` fires or the UI drops the receiver.
pub(crate) fn spawn_pane_feed(
    pane: usize,
    log: Arc<LogBuffer>,
    sender: Sender<DrawRequest>,
    cancel: CancelScope,
    tick: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut cursor = 0usize;
        while !cancel.wait_timeout(tick) {
            let size = log.size();
            if size <= cursor {
                continue;
            }
            let bytes = log.slice(cursor, size);
            let request = DrawRequest::Output {
                pane,
                from: cursor,
                to: size,
                bytes,
            };
            if sender.send(request).is_err() {
                break;
            }
            cursor = size;
        }
    })
}
