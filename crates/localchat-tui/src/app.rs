use localchat_core::{Config, OllamaClient, PendingRequest, Relay, RelayError, RequestId, Session};
use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Input,
    Rules,  // Settings panel only
    Models, // Settings panel only
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation, rules and model selection
    pub session: Session,
    pub relay: Relay,

    // Message input
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Settings panel
    pub show_settings: bool,
    pub rules_cursor: usize,
    pub model_picker_state: ListState,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        let relay = Relay::new(OllamaClient::new(config.ollama_url()))
            .with_default_model(config.default_model());
        let session = Session::new(config.default_rules(), config.default_model());
        let rules_cursor = session.rules().chars().count();

        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Input,

            session,
            relay,

            input: String::new(),
            input_cursor: 0,

            show_settings: false,
            rules_cursor,
            model_picker_state: ListState::default(),

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            events,
        };
        app.sync_model_picker();
        app
    }

    /// Ask the relay for the installed models; the answer arrives as
    /// [`AppEvent::Models`].
    pub fn fetch_models(&self) {
        let relay = self.relay.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = relay.list_models().await;
            let _ = events.send(AppEvent::Models(result));
        });
    }

    pub fn apply_models(&mut self, result: Result<Vec<String>, RelayError>) {
        match result {
            Ok(models) => {
                tracing::info!(count = models.len(), "loaded model list");
                self.session.set_available_models(models);
            }
            Err(e) => {
                tracing::warn!(error = %e, "falling back to built-in model list");
            }
        }
        self.sync_model_picker();
    }

    /// Submit the current input. Blank input, or input while a reply is
    /// outstanding, leaves everything as it was.
    pub fn send_input(&mut self) {
        let Some(PendingRequest { id, request }) = self.session.submit(&self.input) else {
            return;
        };

        self.input.clear();
        self.input_cursor = 0;
        self.input_mode = InputMode::Normal;
        self.animation_frame = 0;

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_chat_to_bottom();

        let relay = self.relay.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = relay.chat(&request).await;
            let _ = events.send(AppEvent::Reply { id, result });
        });
    }

    pub fn apply_reply(&mut self, id: RequestId, result: Result<String, RelayError>) {
        if self.session.apply_reply(id, result) {
            self.scroll_chat_to_bottom();
        }
    }

    pub fn clear_chat(&mut self) {
        self.session.clear();
        self.chat_scroll = 0;
    }

    pub fn toggle_settings(&mut self) {
        self.show_settings = !self.show_settings;
        if !self.show_settings && matches!(self.focus, FocusPane::Rules | FocusPane::Models) {
            self.focus = FocusPane::Input;
            self.input_mode = InputMode::Normal;
        }
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match (self.focus, self.show_settings) {
            (FocusPane::Chat, _) => FocusPane::Input,
            (FocusPane::Input, true) => FocusPane::Rules,
            (FocusPane::Input, false) => FocusPane::Chat,
            (FocusPane::Rules, _) => FocusPane::Models,
            (FocusPane::Models, _) => FocusPane::Chat,
        };
    }

    /// Start typing into the focused text field, if it accepts input.
    pub fn start_editing(&mut self) {
        match self.focus {
            FocusPane::Input if !self.session.is_awaiting_reply() => {
                self.input_mode = InputMode::Editing;
            }
            FocusPane::Rules => self.input_mode = InputMode::Editing,
            _ => {}
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_awaiting_reply() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        // Counted in usize: one long reply can exceed u16::MAX wrapped lines
        let mut total_lines: usize = 0;

        for msg in self.session.messages() {
            total_lines = total_lines.saturating_add(1); // Role line ("You:" or "Assistant:")
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add(char_count / wrap_width + 1);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.session.is_awaiting_reply() {
            total_lines = total_lines.saturating_add(2); // "Assistant:" + "Thinking..."
        }

        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    // Model picker methods
    pub fn model_picker_nav_down(&mut self) {
        let len = self.session.model_choices().len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        let choice = self
            .model_picker_state
            .selected()
            .and_then(|i| self.session.model_choices().get(i).map(|m| m.to_string()));

        if let Some(model) = choice {
            tracing::info!(model = %model, "selected model");
            self.session.select_model(model);
        }
    }

    /// Point the picker at the selected model, or the first choice if the
    /// selected model isn't listed.
    fn sync_model_picker(&mut self) {
        let choices = self.session.model_choices();
        let index = choices
            .iter()
            .position(|m| *m == self.session.selected_model())
            .unwrap_or(0);
        self.model_picker_state.select(Some(index));
    }
}
