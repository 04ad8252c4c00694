use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply { id, result } => app.apply_reply(id, result),
        AppEvent::Models(result) => app.apply_models(result),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('l') => {
                app.clear_chat();
                return;
            }
            _ => {}
        }
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('s') => app.toggle_settings(),
        KeyCode::Char('c') => app.clear_chat(),
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::Char('i') => {
            app.focus = FocusPane::Input;
            app.start_editing();
        }
        KeyCode::Char('e') if app.focus == FocusPane::Rules => app.start_editing(),
        KeyCode::Enter => match app.focus {
            FocusPane::Models => app.select_model(),
            FocusPane::Input | FocusPane::Rules => app.start_editing(),
            FocusPane::Chat => {}
        },
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Models => app.model_picker_nav_down(),
            _ => app.scroll_down(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Models => app.model_picker_nav_up(),
            _ => app.scroll_up(),
        },
        KeyCode::Char('G') | KeyCode::End => app.scroll_chat_to_bottom(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.focus {
        FocusPane::Input => handle_input_editing(app, key),
        FocusPane::Rules => handle_rules_editing(app, key),
        _ => app.input_mode = InputMode::Normal,
    }
}

fn handle_input_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.send_input();
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// Rules are multi-line: Enter inserts a newline, Esc leaves the editor.
fn handle_rules_editing(app: &mut App, key: KeyEvent) {
    let rules = app.session.rules_mut();
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            let byte_pos = char_to_byte_index(rules, app.rules_cursor);
            rules.insert(byte_pos, '\n');
            app.rules_cursor += 1;
        }
        KeyCode::Backspace => {
            if app.rules_cursor > 0 {
                app.rules_cursor -= 1;
                let byte_pos = char_to_byte_index(rules, app.rules_cursor);
                rules.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.rules_cursor < rules.chars().count() {
                let byte_pos = char_to_byte_index(rules, app.rules_cursor);
                rules.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.rules_cursor = app.rules_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            app.rules_cursor = (app.rules_cursor + 1).min(rules.chars().count());
        }
        KeyCode::Home => {
            app.rules_cursor = 0;
        }
        KeyCode::End => {
            app.rules_cursor = rules.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(rules, app.rules_cursor);
            rules.insert(byte_pos, c);
            app.rules_cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(),
        MouseEventKind::ScrollUp => app.scroll_up(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localchat_core::session::UI_REMEDIATION;
    use localchat_core::testing::{unreachable_url, StubOllama};
    use localchat_core::{ChatMessage, Config};
    use tokio::sync::mpsc;

    fn app_for(ollama_url: String) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = Config {
            ollama_url: Some(ollama_url),
            ..Config::new()
        };
        (App::new(&config, tx), rx)
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))).unwrap();
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    /// Feed the next background event (reply or model list) back into the app.
    async fn pump(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        let event = rx.recv().await.unwrap();
        handle_event(app, event).unwrap();
    }

    #[tokio::test]
    async fn test_hello_round_trip() {
        let stub = StubOllama::replying("Hi").start().await;
        let (mut app, mut rx) = app_for(stub.url());

        press(&mut app, KeyCode::Char('i'));
        type_text(&mut app, "Hello");
        press(&mut app, KeyCode::Enter);

        assert!(app.session.is_awaiting_reply());
        assert!(app.input.is_empty());
        assert_eq!(app.input_mode, InputMode::Normal);

        pump(&mut app, &mut rx).await;

        assert_eq!(
            app.session.messages(),
            &[ChatMessage::user("Hello"), ChatMessage::assistant("Hi")]
        );
        assert!(!app.session.is_awaiting_reply());
    }

    #[tokio::test]
    async fn test_blank_input_sends_nothing() {
        let (mut app, mut rx) = app_for(unreachable_url());

        press(&mut app, KeyCode::Char('i'));
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);

        assert!(app.session.messages().is_empty());
        assert!(!app.session.is_awaiting_reply());
        assert_eq!(app.input, "   ");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_shows_remediation() {
        let (mut app, mut rx) = app_for(unreachable_url());

        press(&mut app, KeyCode::Char('i'));
        type_text(&mut app, "ping");
        press(&mut app, KeyCode::Enter);
        pump(&mut app, &mut rx).await;

        assert_eq!(app.session.messages().len(), 2);
        assert_eq!(app.session.messages()[1].content, UI_REMEDIATION);

        // Still usable afterwards
        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[tokio::test]
    async fn test_input_disabled_while_awaiting() {
        let (mut app, _rx) = app_for(unreachable_url());

        press(&mut app, KeyCode::Char('i'));
        type_text(&mut app, "first");
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_clear_drops_late_reply() {
        let stub = StubOllama::replying("late").start().await;
        let (mut app, mut rx) = app_for(stub.url());

        press(&mut app, KeyCode::Char('i'));
        type_text(&mut app, "question");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('c'));
        assert!(app.session.messages().is_empty());

        pump(&mut app, &mut rx).await;
        assert!(app.session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_ctrl_l_clears() {
        let (mut app, _rx) = app_for(unreachable_url());
        app.session.submit("hi");

        let key = KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL);
        handle_event(&mut app, AppEvent::Key(key)).unwrap();

        assert!(app.session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_huge_reply_pins_scroll_to_bottom() {
        let (mut app, _rx) = app_for(unreachable_url());
        let pending = app.session.submit("dump everything").unwrap();

        let reply = "x\n".repeat(70_000);
        handle_event(&mut app, AppEvent::Reply { id: pending.id, result: Ok(reply) }).unwrap();

        assert_eq!(app.session.messages().len(), 2);
        assert_eq!(app.chat_scroll, u16::MAX - 20);
    }

    #[tokio::test]
    async fn test_model_list_and_selection() {
        let stub = StubOllama::with_models(&["mistral", "llama3.2"]).start().await;
        let (mut app, mut rx) = app_for(stub.url());

        app.fetch_models();
        pump(&mut app, &mut rx).await;
        assert_eq!(app.session.model_choices(), vec!["mistral", "llama3.2"]);
        // Picker starts on the configured default
        assert_eq!(app.model_picker_state.selected(), Some(1));

        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Tab); // rules
        press(&mut app, KeyCode::Tab); // models
        assert_eq!(app.focus, FocusPane::Models);

        press(&mut app, KeyCode::Char('k'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.session.selected_model(), "mistral");
    }

    #[tokio::test]
    async fn test_failed_model_list_uses_fallback() {
        let stub = StubOllama::failing().start().await;
        let (mut app, mut rx) = app_for(stub.url());

        app.fetch_models();
        pump(&mut app, &mut rx).await;

        assert_eq!(app.session.model_choices(), vec!["llama3.2", "llama3.1", "llama3", "llama2"]);
    }

    #[tokio::test]
    async fn test_rules_editing() {
        let (mut app, _rx) = app_for(unreachable_url());
        *app.session.rules_mut() = String::from("Be brief");
        app.rules_cursor = "Be brief".len();

        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, FocusPane::Rules);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.input_mode, InputMode::Editing);
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "Über alles");
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Esc);

        assert_eq!(app.session.rules(), "Be brief\nÜber alle");
        assert_eq!(app.input_mode, InputMode::Normal);

        // Hiding settings moves focus back to the input
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.focus, FocusPane::Input);
    }
}
