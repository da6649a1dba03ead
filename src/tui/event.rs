use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, Mode};

/// Result of handling a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Toggle,
    Delete,
    Submit,
    CycleFilter,
    Continue,
}

/// Handle a key press. Returns an action indicating what the event loop should do.
pub fn handle_key(app: &mut App, key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }

    match app.mode {
        Mode::Help => {
            if matches!(
                key.code,
                KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Esc
            ) {
                app.mode = Mode::Normal;
            }
            KeyAction::Continue
        }
        Mode::Adding(_) | Mode::Tagging(_) => handle_input(app, key),
        Mode::Normal => {
            app.status = None;
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
                KeyCode::Char('j') | KeyCode::Down => {
                    app.move_down();
                    KeyAction::Continue
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    app.move_up();
                    KeyAction::Continue
                }
                KeyCode::Char('g') | KeyCode::Home => {
                    app.move_top();
                    KeyAction::Continue
                }
                KeyCode::Char('G') | KeyCode::End => {
                    app.move_bottom();
                    KeyAction::Continue
                }
                KeyCode::Enter | KeyCode::Char(' ') => KeyAction::Toggle,
                KeyCode::Char('x') | KeyCode::Backspace | KeyCode::Delete => KeyAction::Delete,
                KeyCode::Char('a') => {
                    app.start_adding();
                    KeyAction::Continue
                }
                KeyCode::Char('t') => {
                    app.start_tagging();
                    KeyAction::Continue
                }
                KeyCode::Char('f') => KeyAction::CycleFilter,
                KeyCode::Char('?') => {
                    app.mode = Mode::Help;
                    KeyAction::Continue
                }
                _ => KeyAction::Continue,
            }
        }
    }
}

fn handle_input(app: &mut App, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Esc => {
            app.cancel_input();
            KeyAction::Continue
        }
        KeyCode::Enter => KeyAction::Submit,
        KeyCode::Backspace => {
            if let Some(buf) = app.mode.input_mut() {
                buf.pop();
            }
            KeyAction::Continue
        }
        KeyCode::Char(c) => {
            if let Some(buf) = app.mode.input_mut() {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    if c == 'u' {
                        buf.clear();
                    }
                } else {
                    buf.push(c);
                }
            }
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}
