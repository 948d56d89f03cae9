use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

use crate::tui::core::{LoopControl, View};

use super::config::MOUSE_SCROLL_LINES;
use super::controller::ViewController;

pub(super) fn handle_event(controller: &mut ViewController, event: Event) -> LoopControl {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(controller, key),
        Event::Mouse(mouse) => {
            let delta = match mouse.kind {
                MouseEventKind::ScrollUp => -MOUSE_SCROLL_LINES,
                MouseEventKind::ScrollDown => MOUSE_SCROLL_LINES,
                _ => return LoopControl::Continue,
            };
            if let View::Fullscreen { pane } = controller.view() {
                scroll_unless_following(controller, pane, delta);
            }
            LoopControl::Continue
        }
        _ => LoopControl::Continue,
    }
}

pub(crate) fn handle_key(controller: &mut ViewController, key: KeyEvent) -> LoopControl {
    controller.diagnostics_mut().record_keypress(&key);
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        return controller.request_exit();
    }
    match controller.view() {
        View::Main => main_keymap(controller, key),
        View::Fullscreen { pane } => fullscreen_keymap(controller, pane, key),
        View::Environment => environment_keymap(controller, key),
    }
}

fn main_keymap(controller: &mut ViewController, key: KeyEvent) -> LoopControl {
    match key.code {
        KeyCode::Char('q') => return controller.request_exit(),
        KeyCode::Up => controller.highlight_prev(),
        KeyCode::Down => controller.highlight_next(),
        KeyCode::Enter => controller.enter_fullscreen(),
        KeyCode::Char('a') => controller.toggle_autoscroll_all(),
        KeyCode::Char('w') => controller.toggle_wrap_all(),
        KeyCode::Char('r') => {
            let pane = controller.highlighted();
            controller.restart(pane);
        }
        KeyCode::Char('e') => controller.show_environment(),
        _ => {}
    }
    LoopControl::Continue
}

fn fullscreen_keymap(controller: &mut ViewController, idx: usize, key: KeyEvent) -> LoopControl {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => controller.leave_fullscreen(),
        KeyCode::Char('a') => {
            if let Some(pane) = controller.pane_mut(idx) {
                let enabled = !pane.autoscroll();
                pane.set_autoscroll(enabled);
            }
        }
        KeyCode::Char('w') => {
            if let Some(pane) = controller.pane_mut(idx) {
                let enabled = !pane.wrap();
                pane.set_wrap(enabled);
            }
        }
        KeyCode::Char('b') => controller.toggle_borderless(idx),
        KeyCode::Char('r') => controller.restart(idx),
        KeyCode::Char('0') => {
            if let Some(pane) = controller.pane_mut(idx) {
                pane.set_autoscroll(false);
                pane.scroll_to_head();
            }
        }
        KeyCode::Char('1') => {
            if let Some(pane) = controller.pane_mut(idx) {
                pane.set_autoscroll(false);
                pane.scroll_to_tail();
            }
        }
        KeyCode::Up => scroll_unless_following(controller, idx, -1),
        KeyCode::Down => scroll_unless_following(controller, idx, 1),
        KeyCode::Char('e') => controller.show_environment(),
        _ => {}
    }
    LoopControl::Continue
}

fn environment_keymap(controller: &mut ViewController, key: KeyEvent) -> LoopControl {
    if matches!(
        key.code,
        KeyCode::Char('q') | KeyCode::Esc | KeyCode::Char('e')
    ) {
        controller.leave_environment();
    }
    LoopControl::Continue
}

fn scroll_unless_following(controller: &mut ViewController, idx: usize, delta: isize) {
    if let Some(pane) = controller.pane_mut(idx) {
        if !pane.autoscroll() {
            pane.scroll_by(delta);
        }
    }
}
