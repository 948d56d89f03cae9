use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use super::lock;

/// Cooperative cancellation shared by every blocking call in the runtime.
///
/// Cloning yields another handle to the same scope. [`CancelScope::child`]
/// derives a scope that is cancelled together with its parent but can also be
/// cancelled on its own.
#[derive(Debug, Clone, Default)]
pub struct CancelScope {
    inner: Arc<ScopeInner>,
}

#[derive(Debug, Default)]
struct ScopeInner {
    cancelled: Mutex<bool>,
    changed: Condvar,
    children: Mutex<Vec<Weak<ScopeInner>>>,
}

impl CancelScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        let child = CancelScope::new();
        {
            let mut children = lock(&self.inner.children);
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        // A cancel racing with registration either sees the child in the list
        // or has already set the flag we check here.
        if self.is_cancelled() {
            child.cancel();
        }
        child
    }

    pub fn cancel(&self) {
        {
            let mut cancelled = lock(&self.inner.cancelled);
            if *cancelled {
                return;
            }
            *cancelled = true;
        }
        self.inner.changed.notify_all();
        let children = std::mem::take(&mut *lock(&self.inner.children));
        for child in children.iter().filter_map(Weak::upgrade) {
            CancelScope { inner: child }.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.cancelled)
    }

    /// Sleeps for up to `timeout`, waking early on cancellation. Returns
    /// whether the scope is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = lock(&self.inner.cancelled);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            cancelled = self
                .inner
                .changed
                .wait_timeout(cancelled, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| PoisonError::into_inner(poisoned).0);
        }
        *cancelled
    }
}
