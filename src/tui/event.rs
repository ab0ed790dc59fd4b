use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use std::time::Duration;

use super::{App, InputMode, Screen};

pub fn poll_event(timeout: Duration) -> anyhow::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

pub fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    // ── Prompt intercepts all keys while open ─────────────────────────
    if app.input_mode != InputMode::Normal {
        handle_input_key(app, code, modifiers);
        return;
    }

    match (code, modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            app.running = false;
            return;
        }
        (KeyCode::Tab, _) | (KeyCode::Right, KeyModifiers::SHIFT) => {
            switch_screen(app, app.screen.next());
            return;
        }
        (KeyCode::BackTab, _) | (KeyCode::Left, KeyModifiers::SHIFT) => {
            switch_screen(app, app.screen.prev());
            return;
        }
        (KeyCode::Char(c @ '1'..='3'), _) => {
            let idx = c as usize - '1' as usize;
            switch_screen(app, Screen::ALL[idx]);
            return;
        }
        _ => {}
    }

    match code {
        KeyCode::Down | KeyCode::Char('j') => {
            app.scroll = app.scroll.saturating_add(1);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.scroll = app.scroll.saturating_sub(1);
        }
        KeyCode::Home | KeyCode::Char('g') => {
            app.scroll = 0;
        }
        KeyCode::Char('a') if app.screen == Screen::Dashboard => {
            app.navigate("active-courses");
        }
        KeyCode::Char('c') if app.screen == Screen::Dashboard => {
            app.navigate("completed-courses");
        }
        KeyCode::Char(':') if app.screen == Screen::Dashboard => {
            open_prompt(app, InputMode::Fragment);
        }
        KeyCode::Char('/') if app.screen == Screen::Discover => {
            open_prompt(app, InputMode::Search);
        }
        KeyCode::Char('o') if app.screen == Screen::Certificates => {
            open_prompt(app, InputMode::FilePath);
        }
        KeyCode::Char('u') if app.screen == Screen::Certificates => {
            app.start_upload();
        }
        KeyCode::Char('r') if !app.loading => {
            app.needs_refresh = true;
        }
        _ => {}
    }
}

fn switch_screen(app: &mut App, screen: Screen) {
    app.screen = screen;
    app.scroll = 0;
}

fn open_prompt(app: &mut App, mode: InputMode) {
    app.input_mode = mode;
    app.input.clear();
}

fn handle_input_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.input.clear();
        }
        KeyCode::Enter => {
            let mode = app.input_mode;
            let input = std::mem::take(&mut app.input);
            app.input_mode = InputMode::Normal;
            submit_input(app, mode, input);
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.input_mode = InputMode::Normal;
            app.input.clear();
        }
        KeyCode::Char(c) => app.input.push(c),
        _ => {}
    }
}

fn submit_input(app: &mut App, mode: InputMode, input: String) {
    match mode {
        InputMode::Normal => {}
        InputMode::Fragment => app.navigate(&input),
        InputMode::Search => {
            let query = input.trim().to_string();
            if query.is_empty() {
                app.status_message = "Type something to search for.".into();
            } else {
                app.start_search(query);
            }
        }
        InputMode::FilePath => {
            if !input.trim().is_empty() {
                app.choose_file(&input);
            }
        }
    }
}
