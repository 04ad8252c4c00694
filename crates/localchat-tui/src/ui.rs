use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use localchat_core::ChatRole;
use crate::app::{App, FocusPane, InputMode};

const SETTINGS_HEIGHT: u16 = 12;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Push any accumulated plain text
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
                if found_close {
                    current_text.push_str("**");
                }
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Line and column (in chars) of a char offset into multi-line text
fn cursor_line_col(text: &str, cursor: usize) -> (usize, usize) {
    let before: String = text.chars().take(cursor).collect();
    let line = before.matches('\n').count();
    let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count());
    (line, col)
}

/// Scroll offset `(y, x)` and cursor cell `(x, y)` that keep the rules cursor
/// inside a `width` by `height` viewport. Rules lines are not wrapped, so long
/// lines scroll sideways with the cursor.
fn rules_viewport(
    text: &str,
    cursor: usize,
    width: usize,
    height: usize,
) -> ((u16, u16), (u16, u16)) {
    let (line, col) = cursor_line_col(text, cursor);
    let scroll_y = line.saturating_sub(height.saturating_sub(1));
    let scroll_x = col.saturating_sub(width.saturating_sub(1));
    let clamp = |n: usize| u16::try_from(n).unwrap_or(u16::MAX);
    (
        (clamp(scroll_y), clamp(scroll_x)),
        (clamp(col - scroll_x), clamp(line - scroll_y)),
    )
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let settings_height = if app.show_settings { SETTINGS_HEIGHT } else { 0 };

    // Main layout: header, settings (optional), chat, input, footer
    let [header_area, settings_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(settings_height),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    if app.show_settings {
        render_settings(app, frame, settings_area);
    }
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Personal AI Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("Powered by {} - Running Locally ", app.session.selected_model()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_settings(app: &mut App, frame: &mut Frame, area: Rect) {
    let [rules_area, models_area] = Layout::horizontal([
        Constraint::Percentage(65),
        Constraint::Percentage(35),
    ])
    .areas(area);

    // Rules editor
    let rules_focused = app.focus == FocusPane::Rules;
    let rules_editing = rules_focused && app.input_mode == InputMode::Editing;
    let rules_border_color = if rules_editing {
        Color::Yellow
    } else if rules_focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let rules_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(rules_border_color))
        .title(" Custom Rules (replace the model's default instructions) ");

    let (rules_scroll, (cursor_x, cursor_y)) = rules_viewport(
        app.session.rules(),
        app.rules_cursor,
        rules_area.width.saturating_sub(2) as usize,
        rules_area.height.saturating_sub(2) as usize,
    );

    let rules_text = if app.session.rules().is_empty() {
        Text::from(Span::styled(
            "Enter your custom rules here...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(app.session.rules().to_string())
    };

    let rules = Paragraph::new(rules_text)
        .block(rules_block)
        .scroll(rules_scroll);
    frame.render_widget(rules, rules_area);

    if rules_editing {
        frame.set_cursor_position((
            rules_area.x + 1 + cursor_x,
            rules_area.y + 1 + cursor_y,
        ));
    }

    // Model picker
    let models_focused = app.focus == FocusPane::Models;
    let models_border_color = if models_focused { Color::Cyan } else { Color::DarkGray };

    let [list_area, hint_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(models_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(models_border_color))
        .title(" Model ");

    let items: Vec<ListItem> = app
        .session
        .model_choices()
        .into_iter()
        .map(|model| {
            let style = if model == app.session.selected_model() {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.model_picker_state);

    let hint = Paragraph::new(" Install models with: ollama pull llama3.2")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hint, hint_area);
}

fn welcome_text() -> Text<'static> {
    let heading = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);
    let code = Style::default().fg(Color::Cyan);

    Text::from(vec![
        Line::from(Span::styled("Welcome to Your Personal AI Assistant", heading)),
        Line::from(Span::styled("Start a conversation with your custom-configured AI", dim)),
        Line::default(),
        Line::from(Span::styled("Quick Start:", heading)),
        Line::from(vec![
            Span::styled("1. Make sure Ollama is running: ", dim),
            Span::styled("ollama serve", code),
        ]),
        Line::from(vec![
            Span::styled("2. Install a model: ", dim),
            Span::styled("ollama pull llama3.2", code),
        ]),
        Line::from(Span::styled("3. Customize your rules in Settings (s)", dim)),
        Line::from(Span::styled("4. Start chatting! (i)", dim)),
    ])
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Ollama: {} ", app.session.selected_model()));

    let awaiting = app.session.is_awaiting_reply();

    if app.session.messages().is_empty() && !awaiting {
        let welcome = Paragraph::new(welcome_text())
            .block(block)
            .centered()
            .wrap(Wrap { trim: false });
        frame.render_widget(welcome, area);
        return;
    }

    let assistant_label = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = Vec::new();

    for msg in app.session.messages() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled("Assistant:", assistant_label)));
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if awaiting {
        lines.push(Line::from(Span::styled("Assistant:", assistant_label)));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let awaiting = app.session.is_awaiting_reply();
    let editing = app.focus == FocusPane::Input && app.input_mode == InputMode::Editing;

    let border_color = if awaiting {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else if app.focus == FocusPane::Input {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let title = if awaiting {
        " Waiting for reply... "
    } else {
        " Message (i to type, Enter to send) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input.is_empty() && !editing {
        Paragraph::new("Type your message...").style(Style::default().fg(Color::DarkGray))
    } else {
        let visible_text: String = app.input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        let style = if awaiting {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        };
        Paragraph::new(visible_text).style(style)
    };

    frame.render_widget(input.block(block), area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " CHAT ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match (app.input_mode, app.focus) {
        (InputMode::Editing, FocusPane::Rules) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" done ", label_style),
        ],
        (InputMode::Editing, _) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        (InputMode::Normal, focus) => {
            let mut hints = vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" Tab ", key_style),
                Span::styled(" focus ", label_style),
            ];
            match focus {
                FocusPane::Models => hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" nav ", label_style),
                    Span::styled(" Enter ", key_style),
                    Span::styled(" select ", label_style),
                ]),
                FocusPane::Rules => hints.extend(vec![
                    Span::styled(" e ", key_style),
                    Span::styled(" edit rules ", label_style),
                ]),
                FocusPane::Chat | FocusPane::Input => hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" scroll ", label_style),
                ]),
            }
            hints.extend(vec![
                Span::styled(" s ", key_style),
                Span::styled(if app.show_settings { " hide settings " } else { " settings " }, label_style),
                Span::styled(" c ", key_style),
                Span::styled(" clear chat ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
