use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map(|(i, _)| i).unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Works in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    if !app.open {
        handle_launcher(app, key)?;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key)?,
        InputMode::Editing => handle_editing_mode(app, key)?,
    }

    Ok(())
}

fn handle_launcher(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Char('o') | KeyCode::Enter => app.open_widget()?,
        KeyCode::Char('q') => app.should_quit = true,
        _ => {}
    }
    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        // Hide the panel, back to the launcher
        KeyCode::Esc | KeyCode::Char('q') => app.close_widget(),

        KeyCode::Char('f') => app.toggle_fullscreen(),

        KeyCode::Char('x') => app.clear_history()?,

        // Focus the input box
        KeyCode::Char('i') | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
            app.cursor = app.input.chars().count();
        }

        // Chat scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_to_bottom(),

        // Code block copy
        KeyCode::Char('c') => app.copy_selected_block(),
        KeyCode::Char('[') => app.select_prev_block(),
        KeyCode::Char(']') => app.select_next_block(),

        _ => {}
    }
    Ok(())
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        // Enter without a modifier submits; Shift-Enter is reserved for
        // multi-line input in terminals that report it.
        KeyCode::Enter if !key.modifiers.contains(KeyModifiers::SHIFT) => {
            app.submit()?;
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crossterm::event::KeyEvent;

    fn test_app(dir: &tempfile::TempDir) -> App {
        let config = Config {
            backend_url: Some("http://127.0.0.1:1".to_string()),
            content_url: Some("http://127.0.0.1:1/content.json".to_string()),
            history_path: Some(dir.path().join("session.json")),
            ..Config::new()
        };
        let mut app = App::new(config.resolve());
        app.open = true;
        app
    }

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::from(code))
    }

    #[test]
    fn typing_inserts_at_cursor_utf8_safely() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input_mode = InputMode::Editing;

        for c in "héllo".chars() {
            handle_event(&mut app, press(KeyCode::Char(c))).unwrap();
        }
        handle_event(&mut app, press(KeyCode::Home)).unwrap();
        handle_event(&mut app, press(KeyCode::Char('>'))).unwrap();
        assert_eq!(app.input, ">héllo");

        handle_event(&mut app, press(KeyCode::End)).unwrap();
        handle_event(&mut app, press(KeyCode::Backspace)).unwrap();
        assert_eq!(app.input, ">héll");
    }

    #[tokio::test]
    async fn enter_submits_trimmed_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input_mode = InputMode::Editing;
        app.input = " Hello ".to_string();
        app.cursor = app.input.chars().count();

        handle_event(&mut app, press(KeyCode::Enter)).unwrap();
        assert_eq!(app.history.turns().len(), 1);
        assert_eq!(app.history.turns()[0].text, "Hello");
        assert!(app.is_thinking());
    }

    #[test]
    fn enter_with_empty_input_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input_mode = InputMode::Editing;

        handle_event(&mut app, press(KeyCode::Enter)).unwrap();
        assert!(app.history.is_empty());
        assert!(!app.is_thinking());
    }

    #[test]
    fn esc_leaves_editing_then_closes_widget() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input_mode = InputMode::Editing;

        handle_event(&mut app, press(KeyCode::Esc)).unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.open);

        handle_event(&mut app, press(KeyCode::Esc)).unwrap();
        assert!(!app.open);
    }

    #[test]
    fn fullscreen_toggle_flips_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);

        handle_event(&mut app, press(KeyCode::Char('f'))).unwrap();
        assert!(app.fullscreen);
        handle_event(&mut app, press(KeyCode::Char('f'))).unwrap();
        assert!(!app.fullscreen);
    }
}
