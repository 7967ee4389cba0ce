use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
    },
    Frame,
};

use crate::app::{App, InputMode};
use crate::history::Role;
use crate::links::rewrite_links;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    if !app.open {
        render_launcher(frame, area);
        return;
    }

    let panel = if app.fullscreen { area } else { side_panel(area) };
    frame.render_widget(Clear, panel);

    let [header_area, messages_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(panel);

    render_header(app, frame, header_area);
    render_messages(app, frame, messages_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

/// The collapsed widget: a small hint box in the bottom-right corner,
/// standing in for the floating chat button.
fn render_launcher(frame: &mut Frame, area: Rect) {
    let width = 34u16.min(area.width);
    let height = 3u16.min(area.height);
    let rect = Rect {
        x: area.right().saturating_sub(width + 2).max(area.x),
        y: area.bottom().saturating_sub(height + 1).max(area.y),
        width,
        height,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" docchat ");

    let hint = Paragraph::new(Line::from(vec![
        Span::styled(" o ", Style::default().bg(Color::DarkGray).fg(Color::White)),
        Span::raw(" chat   "),
        Span::styled(" q ", Style::default().bg(Color::DarkGray).fg(Color::White)),
        Span::raw(" quit"),
    ]))
    .block(block);

    frame.render_widget(hint, rect);
}

fn side_panel(area: Rect) -> Rect {
    let width = (area.width / 2).clamp(40.min(area.width), area.width);
    let [_, panel] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(width)]).areas(area);
    panel
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let grounding = if app.content.is_loaded() {
        Span::styled(" [grounded] ", Style::default().fg(Color::Green))
    } else if app.content_task.is_some() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        Span::styled(format!(" [loading docs{dots}] "), Style::default().fg(Color::Yellow))
    } else if app.content_failed {
        Span::styled(" [docs unavailable] ", Style::default().fg(Color::Red))
    } else {
        Span::raw(" ")
    };

    let title = Line::from(vec![
        Span::styled(" AI Assistant ", Style::default().fg(Color::Cyan).bold()),
        grounding,
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let inner = block.inner(area);
    app.chat_height = inner.height;
    app.chat_width = inner.width;

    if app.history.is_empty() && !app.is_thinking() {
        let placeholder = Paragraph::new("Ask a question about the docs...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let mut lines: Vec<Line<'static>> = Vec::new();
    for turn in app.history.turns() {
        match turn.role {
            Role::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                // User turns render as plain text
                for line in turn.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
                lines.push(Line::default());
            }
            Role::Model => {
                lines.push(Line::from(Span::styled(
                    "Assistant:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                let fixed = rewrite_links(&turn.text, &app.settings.base_url);
                lines.extend(app.markdown.render(&fixed).lines);
                lines.push(Line::default());
            }
        }
    }

    if app.is_thinking() {
        lines.push(Line::from(Span::styled(
            "Assistant:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    app.total_chat_lines = lines.len() as u16;

    let messages = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(messages, area);

    if app.total_chat_lines > app.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state =
            ScrollbarState::new(app.total_chat_lines as usize).position(app.chat_scroll as usize);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin { vertical: 1, horizontal: 0 }),
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if app.copy_ack_active() {
        " Copied! ".to_string()
    } else if let (Some(i), n) = (app.selected_block, app.code_blocks.len()) {
        format!(" Ask (code block {}/{}) ", i + 1, n)
    } else {
        " Ask ".to_string()
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scroll keeps the cursor visible for long questions
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String =
        app.input.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if app.input_mode == InputMode::Editing {
        // Keep the cursor inside the box even when the area is too narrow
        // to show any text at all.
        let column = (app.cursor - scroll_offset).min(inner_width) as u16;
        frame.set_cursor_position((
            (area.x + 1 + column).min(area.right().saturating_sub(2).max(area.x)),
            area.y + 1,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" TYPE ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let hints = match app.input_mode {
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
            ];
            if !app.code_blocks.is_empty() {
                hints.extend(vec![
                    Span::styled(" [/] ", key_style),
                    Span::styled(" block ", label_style),
                    Span::styled(" c ", key_style),
                    Span::styled(" copy ", label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" f ", key_style),
                Span::styled(" fullscreen ", label_style),
                Span::styled(" x ", key_style),
                Span::styled(" clear ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" close ", label_style),
            ]);
            hints
        }
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" done ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)]
            .into_iter()
            .chain(hints)
            .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use ratatui::{backend::TestBackend, Terminal};

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

    #[test]
    fn cursor_stays_inside_a_degenerately_narrow_input_box() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input_mode = InputMode::Editing;
        app.input = "a long question".to_string();
        app.cursor = app.input.chars().count();

        // Two columns wide: the input box has no interior at all.
        let backend = TestBackend::new(2, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let pos = terminal.get_cursor_position().unwrap();
        assert!(pos.x < 2, "cursor column {} is outside the frame", pos.x);
    }

    #[test]
    fn cursor_tracks_horizontal_scroll_in_a_normal_box() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input_mode = InputMode::Editing;
        app.input = "short".to_string();
        app.cursor = 3;

        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let panel = side_panel(Rect::new(0, 0, 80, 24));
        let pos = terminal.get_cursor_position().unwrap();
        assert_eq!(pos.x, panel.x + 1 + 3);
    }
}
