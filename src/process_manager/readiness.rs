use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{lock, CancelScope};

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Fired,
    Cancelled,
}

/// Write-once, many-reader broadcast used to chain dependent runners.
#[derive(Debug, Clone, Default)]
pub struct ReadinessSignal {
    inner: Arc<SignalInner>,
}

#[derive(Debug, Default)]
struct SignalInner {
    fired_at: Mutex<Option<Instant>>,
    fired: Condvar,
}

impl ReadinessSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that is already fired, for the head of a startup chain.
    pub fn fired() -> Self {
        let signal = Self::new();
        signal.signal();
        signal
    }

    /// Later calls keep the first timestamp.
    pub fn signal(&self) {
        let mut fired_at = lock(&self.inner.fired_at);
        if fired_at.is_none() {
            *fired_at = Some(Instant::now());
            self.inner.fired.notify_all();
        }
    }

    pub fn is_signalled(&self) -> bool {
        lock(&self.inner.fired_at).is_some()
    }

    pub fn signalled_at(&self) -> Option<Instant> {
        *lock(&self.inner.fired_at)
    }

    /// Blocks until the signal fires or `cancel` is cancelled. A fired signal
    /// wins over a concurrent cancellation.
    pub fn wait(&self, cancel: &CancelScope) -> WaitOutcome {
        let mut fired_at = lock(&self.inner.fired_at);
        loop {
            if fired_at.is_some() {
                return WaitOutcome::Fired;
            }
            if cancel.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
            fired_at = self
                .inner
                .fired
                .wait_timeout(fired_at, CANCEL_POLL_INTERVAL)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| PoisonError::into_inner(poisoned).0);
        }
    }

    pub fn same_as(&self, other: &ReadinessSignal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
