//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  Adding a new keybinding is
//! a single match arm in [`handle_key_event`] (or [`handle_tab_key`] for
//! keys that only mean something on one tab).
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm that calls it.
//! 3. Update the help text in `ui::draw_status_bar`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::{App, Tab};

/// Fraction of the visible map span moved per arrow press.
const PAN_STEP: f64 = 0.2;

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if app.searching {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => app.end_search(),
            KeyCode::Backspace => app.pop_search(),
            KeyCode::Char(c) => app.push_search(c),
            _ => {}
        }
        return;
    }

    if handle_tab_key(app, key.code) {
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Char('r') => app.refresh_requested = true,
        KeyCode::Tab => app.set_tab(app.tab.next()),
        KeyCode::BackTab => app.set_tab(app.tab.previous()),
        KeyCode::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            app.set_tab(Tab::ALL[index]);
        }
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('/') => app.start_search(),
        _ => {}
    }
}

/// Keys that only apply to the active tab.  Returns whether the key was used.
fn handle_tab_key(app: &mut App, code: KeyCode) -> bool {
    match (app.tab, code) {
        (Tab::Chat, KeyCode::Char('t')) => app.cycle_chat_type(),
        (Tab::Map, KeyCode::Char('o')) => app.map.show_offline = !app.map.show_offline,
        (Tab::Map, KeyCode::Char('+') | KeyCode::Char('=')) => app.map.zoom_in(),
        (Tab::Map, KeyCode::Char('-')) => app.map.zoom_out(),
        (Tab::Map, KeyCode::Char('0')) => app.map.reset(),
        (Tab::Map, KeyCode::Left | KeyCode::Char('h')) => app.map.pan(-PAN_STEP, 0.0),
        (Tab::Map, KeyCode::Right | KeyCode::Char('l')) => app.map.pan(PAN_STEP, 0.0),
        (Tab::Map, KeyCode::Up | KeyCode::Char('k')) => app.map.pan(0.0, -PAN_STEP),
        (Tab::Map, KeyCode::Down | KeyCode::Char('j')) => app.map.pan(0.0, PAN_STEP),
        _ => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, KeyModifiers};

    fn press(app: &mut App, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn release_events_are_ignored() {
        let mut app = App::new();
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        key.state = KeyEventState::NONE;
        handle_key_event(&mut app, key);
        assert!(!app.quit);
    }

    #[test]
    fn tabs_switch_by_number_and_cycle() {
        let mut app = App::new();
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.tab, Tab::Map);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.tab, Tab::Chat);
        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.tab, Tab::Players);
    }

    #[test]
    fn search_mode_captures_keys_and_esc_leaves_it() {
        let mut app = App::new();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('/'));
        assert!(app.searching);

        for c in ['q', 'x'] {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.player_query, "q");
        assert!(!app.quit, "q is text while searching");

        press(&mut app, KeyCode::Esc);
        assert!(!app.searching);
        assert!(!app.quit);
        press(&mut app, KeyCode::Esc);
        assert!(app.quit);
    }

    #[test]
    fn map_keys_zoom_and_toggle_offline() {
        let mut app = App::new();
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('+'));
        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.map.zoom, 2.0);
        press(&mut app, KeyCode::Char('o'));
        assert!(app.map.show_offline);

        let before = app.map.center;
        press(&mut app, KeyCode::Right);
        assert!(app.map.center.0 > before.0);

        press(&mut app, KeyCode::Char('0'));
        assert_eq!(app.map.zoom, 1.0);
    }

    #[test]
    fn tab_keys_do_nothing_elsewhere() {
        let mut app = App::new();
        press(&mut app, KeyCode::Char('+'));
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.map.zoom, 1.0);
        assert_eq!(app.chat_type, None);
    }

    #[test]
    fn r_requests_refresh() {
        let mut app = App::new();
        press(&mut app, KeyCode::Char('r'));
        assert!(app.refresh_requested);
    }
}
