use std::sync::Mutex;

use crate::process_manager::lock;
use crate::tui::core::View;

/// The view to return to when the environment overlay closes, together with
/// the borderless flag it had when it was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PreviousView {
    pub(crate) view: View,
    pub(crate) borderless: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UiState {
    pub(crate) autoscroll: bool,
    pub(crate) wrap: bool,
    pub(crate) borderless: bool,
    pub(crate) previous_view: Option<PreviousView>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            autoscroll: true,
            wrap: false,
            borderless: false,
            previous_view: None,
        }
    }
}

/// Display preferences shared by every pane. Each call takes the lock once;
/// readers get copies.
#[derive(Debug, Default)]
pub(crate) struct StateStore {
    inner: Mutex<UiState>,
}

impl StateStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn snapshot(&self) -> UiState {
        *lock(&self.inner)
    }

    #[cfg(test)]
    pub(crate) fn autoscroll(&self) -> bool {
        lock(&self.inner).autoscroll
    }

    #[cfg(test)]
    pub(crate) fn wrap(&self) -> bool {
        lock(&self.inner).wrap
    }

    #[cfg(test)]
    pub(crate) fn borderless(&self) -> bool {
        lock(&self.inner).borderless
    }

    pub(crate) fn toggle_autoscroll(&self) -> bool {
        let mut state = lock(&self.inner);
        state.autoscroll = !state.autoscroll;
        state.autoscroll
    }

    pub(crate) fn toggle_wrap(&self) -> bool {
        let mut state = lock(&self.inner);
        state.wrap = !state.wrap;
        state.wrap
    }

    pub(crate) fn toggle_borderless(&self) -> bool {
        let mut state = lock(&self.inner);
        state.borderless = !state.borderless;
        state.borderless
    }

    pub(crate) fn set_borderless(&self, enabled: bool) {
        lock(&self.inner).borderless = enabled;
    }

    pub(crate) fn reset_borderless(&self) {
        self.set_borderless(false);
    }

    pub(crate) fn set_previous_view(&self, view: View) {
        let mut state = lock(&self.inner);
        state.previous_view = Some(PreviousView {
            view,
            borderless: state.borderless,
        });
    }

    #[cfg(test)]
    pub(crate) fn previous_view(&self) -> Option<PreviousView> {
        lock(&self.inner).previous_view
    }

    pub(crate) fn take_previous_view(&self) -> Option<PreviousView> {
        lock(&self.inner).previous_view.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_tail_without_wrapping() {
        let store = StateStore::new();
        let state = store.snapshot();
        assert!(state.autoscroll);
        assert!(!state.wrap);
        assert!(!state.borderless);
        assert!(state.previous_view.is_none());
    }

    #[test]
    fn double_toggle_restores_every_flag() {
        let store = StateStore::new();
        let before = store.snapshot();
        store.toggle_autoscroll();
        store.toggle_wrap();
        store.toggle_borderless();
        assert_ne!(store.snapshot(), before);
        store.toggle_autoscroll();
        store.toggle_wrap();
        store.toggle_borderless();
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn reset_borderless_always_clears() {
        let store = StateStore::new();
        store.reset_borderless();
        assert!(!store.borderless());
        store.toggle_borderless();
        store.reset_borderless();
        assert!(!store.borderless());
    }

    #[test]
    fn previous_view_captures_borderless_and_is_taken_once() {
        let store = StateStore::new();
        store.set_borderless(true);
        store.set_previous_view(View::Fullscreen { pane: 2 });
        assert_eq!(
            store.previous_view(),
            Some(PreviousView {
                view: View::Fullscreen { pane: 2 },
                borderless: true,
            })
        );
        assert!(store.take_previous_view().is_some());
        assert!(store.take_previous_view().is_none());
    }
}
