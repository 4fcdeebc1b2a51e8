use std::iter::Peekable;
use std::str::Chars;

use anyhow::{bail, Result};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use nfchat_core::{ChatMessage, ChatRole};
use tracing::warn;

use crate::app::{App, InputMode};

const ACCENT: [Color; crate::app::ACCENT_COLORS] = [
    Color::Blue,
    Color::Green,
    Color::Magenta,
    Color::Rgb(99, 102, 241), // indigo
];

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, chat_area, label_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_attachment_label(app, frame, label_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.input_mode == InputMode::Upload {
        render_upload_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" ⌬ NF ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.model().to_string(), Style::default().fg(Color::Magenta)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    if app.rescroll_pending {
        app.rescroll_pending = false;
        app.scroll_to_bottom();
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let chat = Paragraph::new(Text::from(chat_lines(app)))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// Lines of the chat area: every message, then the typing placeholder.
pub(crate) fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let typing = app.controller.is_typing();
    if app.controller.messages().is_empty() && !typing {
        return vec![Line::from(Span::styled(
            "Type a message below. Ctrl+U attaches a PDF.",
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.controller.messages() {
        // One bad message must not take the whole view down
        match render_message(msg) {
            Ok(msg_lines) => lines.extend(msg_lines),
            Err(e) => {
                warn!(id = msg.id, "failed to render message: {}", e);
                lines.extend(fallback_message(msg));
            }
        }
        lines.push(Line::default());
    }

    if typing {
        lines.push(role_line(ChatRole::Assistant));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("🤖 Typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// Rows the lines occupy once wrapped to `width` cells.
pub(crate) fn wrapped_height(lines: Vec<Line<'static>>, width: u16) -> usize {
    Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .line_count(width)
}

fn render_attachment_label(app: &App, frame: &mut Frame, area: Rect) {
    let Some(name) = app.controller.uploaded_file_name() else {
        return;
    };

    let label = if app.controller.is_extracting() {
        Span::styled(format!(" 📄 {} reading...", name), Style::default().fg(Color::Yellow))
    } else {
        Span::styled(format!(" 📄 {} uploaded", name), Style::default().fg(Color::Green))
    };

    frame.render_widget(Paragraph::new(Line::from(label)), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let typing = app.controller.is_typing();
    let accent = ACCENT[app.accent.index() % ACCENT.len()];

    let (border_color, title) = if typing {
        (Color::DarkGray, " Waiting for reply... ")
    } else {
        (accent, " Message (Enter ↵ to send) ")
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.input.text.is_empty() {
        let placeholder = Paragraph::new("Type a message...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(placeholder, inner);
    } else {
        // Horizontal scroll so the cursor stays visible
        let width = inner.width.max(1) as usize;
        let start = app.input.cursor.saturating_sub(width - 1);
        let visible: String = app.input.text.chars().skip(start).take(width).collect();
        frame.render_widget(Paragraph::new(visible), inner);
    }

    if app.input_mode == InputMode::Chat {
        let width = inner.width.max(1) as usize;
        let cursor_x = app.input.cursor.min(width - 1) as u16;
        frame.set_cursor_position((inner.x + cursor_x, inner.y));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(Color::Gray);

    let hints: Vec<(&str, &str)> = match app.input_mode {
        InputMode::Chat => vec![
            ("Enter", "send"),
            ("Ctrl+U", "attach PDF"),
            ("PgUp/PgDn", "scroll"),
            ("Esc", "quit"),
        ],
        InputMode::Upload => vec![("Enter", "attach"), ("Esc", "cancel")],
    };

    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_upload_prompt(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = 6;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Attach PDF ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Path to a .pdf file. Enter to attach, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let width = input_area.width.max(1) as usize;
    let start = app.upload_input.cursor.saturating_sub(width - 1);
    let visible: String = app.upload_input.text.chars().skip(start).take(width).collect();
    frame.render_widget(Paragraph::new(visible).style(Style::default().fg(Color::Cyan)), input_area);

    let cursor_x = (app.upload_input.cursor - start) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

fn role_line(role: ChatRole) -> Line<'static> {
    match role {
        ChatRole::User => Line::from(Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        ChatRole::Assistant => Line::from(Span::styled(
            "Gemini:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
    }
}

/// Render one message as styled lines.
///
/// Fails on raw control characters, which would corrupt the terminal if
/// written through.
fn render_message(msg: &ChatMessage) -> Result<Vec<Line<'static>>> {
    if let Some(c) = msg.content.chars().find(|c| is_unsafe_control(*c)) {
        bail!("control character U+{:04X} in message content", c as u32);
    }

    let mut lines = vec![role_line(msg.role)];
    lines.extend(markdown_lines(&msg.content));
    Ok(lines)
}

fn is_unsafe_control(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}

/// Shown in place of a message that failed to render.
fn fallback_message(msg: &ChatMessage) -> Vec<Line<'static>> {
    let sanitized: String = msg
        .content
        .chars()
        .map(|c| if is_unsafe_control(c) { '\u{FFFD}' } else { c })
        .collect();

    let mut lines = vec![
        role_line(msg.role),
        Line::from(Span::styled(
            "⚠️ This message could not be displayed.",
            Style::default().fg(Color::Red),
        )),
    ];
    lines.extend(
        sanitized
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::DarkGray)))),
    );
    lines
}

/// Convert a markdown subset to styled lines: headings, bullets, fenced code,
/// and inline **bold**, *italic* and `code`.
fn markdown_lines(content: &str) -> Vec<Line<'static>> {
    let code_style = Style::default().fg(Color::Green);
    let mut lines = Vec::new();
    let mut in_code_block = false;

    for raw in content.lines() {
        let trimmed = raw.trim_start();

        if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block {
            lines.push(Line::from(Span::styled(format!("  {}", raw), code_style)));
            continue;
        }

        if let Some(heading) = heading_text(trimmed) {
            lines.push(Line::from(Span::styled(
                heading.to_string(),
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )));
        } else if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            let indent = " ".repeat(raw.len() - trimmed.len());
            let mut spans = vec![Span::raw(format!("{}• ", indent))];
            spans.extend(parse_inline(item));
            lines.push(Line::from(spans));
        } else {
            lines.push(parse_markdown_line(raw));
        }
    }

    lines
}

fn heading_text(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) {
        line[hashes..].strip_prefix(' ')
    } else {
        None
    }
}

fn parse_markdown_line(text: &str) -> Line<'static> {
    let spans = parse_inline(text);
    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Read up to the closing delimiter. Returns the inner text and whether the
/// delimiter was found.
fn take_delimited(chars: &mut Peekable<Chars>, delim: char, double: bool) -> (String, bool) {
    let mut inner = String::new();
    while let Some(c) = chars.next() {
        if c == delim {
            if !double {
                return (inner, true);
            }
            if chars.peek() == Some(&delim) {
                chars.next();
                return (inner, true);
            }
        }
        inner.push(c);
    }
    (inner, false)
}

fn parse_inline(text: &str) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        let (delim, double, style) = match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                ("**", true, Style::default().add_modifier(Modifier::BOLD))
            }
            '*' if chars.peek().is_some_and(|n| !n.is_whitespace()) => {
                ("*", false, Style::default().add_modifier(Modifier::ITALIC))
            }
            '`' => ("`", false, Style::default().fg(Color::Green)),
            _ => {
                current_text.push(c);
                continue;
            }
        };

        let (inner, closed) = take_delimited(&mut chars, c, double);
        if closed && !inner.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }
            spans.push(Span::styled(inner, style));
        } else {
            // No closing delimiter, treat as literal
            current_text.push_str(delim);
            current_text.push_str(&inner);
            if closed {
                current_text.push_str(delim);
            }
        }
    }

    // Push any remaining text
    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfchat_core::ai::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
    use nfchat_core::{GeminiClient, PdfExtractor};
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn message(role: ChatRole, content: &str) -> ChatMessage {
        ChatMessage {
            id: 1,
            role,
            content: content.to_string(),
        }
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn screen_text(app: &mut App) -> String {
        screen_text_sized(app, 80, 24)
    }

    fn screen_text_sized(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_parse_inline_styles() {
        let spans = parse_inline("plain **bold** and *it* with `code`");
        let texts: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(texts, vec!["plain ", "bold", " and ", "it", " with ", "code"]);
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert!(spans[3].style.add_modifier.contains(Modifier::ITALIC));
        assert_eq!(spans[5].style.fg, Some(Color::Green));
    }

    #[test]
    fn test_unclosed_delimiters_are_literal() {
        let spans = parse_inline("2 * 3 = 6 and **open");
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "2 * 3 = 6 and **open");
    }

    #[test]
    fn test_markdown_blocks() {
        let lines = markdown_lines("# Title\n- item **one**\n```\nlet x = 1;\n```\nafter");
        let texts: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["Title", "• item one", "  let x = 1;", "after"]);
    }

    #[test]
    fn test_control_characters_use_fallback() {
        let msg = message(ChatRole::Assistant, "bad \u{1b}[2J escape");
        assert!(render_message(&msg).is_err());

        let fallback: Vec<String> = fallback_message(&msg).iter().map(line_text).collect();
        assert_eq!(fallback[1], "⚠️ This message could not be displayed.");
        assert_eq!(fallback[2], "bad \u{FFFD}[2J escape");
    }

    #[test]
    fn test_screen_shows_messages_typing_and_upload() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(
            GeminiClient::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, None),
            PdfExtractor::default(),
            tx,
        );
        app.controller.begin_send("first question").unwrap();
        app.controller.finish_send(Ok("an answer".to_string()));
        let ticket = app.controller.begin_upload(std::path::Path::new("report.pdf")).unwrap();
        app.controller.finish_upload(ticket, Ok("text".to_string()));
        app.controller.begin_send("second \u{7} question").unwrap();

        let screen = screen_text(&mut app);
        assert!(screen.contains("first question"));
        assert!(screen.contains("an answer"));
        assert!(screen.contains("could not be displayed"));
        assert!(screen.contains("Typing"));
        assert!(screen.contains("report.pdf uploaded"));
        assert!(screen.contains("Waiting for reply"));
    }

    #[test]
    fn test_resize_keeps_latest_line_in_view() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(
            GeminiClient::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, None),
            PdfExtractor::default(),
            tx,
        );
        let mut reply: Vec<String> = (0..30)
            .map(|i| format!("row {:02} of a reply long enough to wrap in a narrow pane", i))
            .collect();
        reply.push("the end".to_string());
        app.controller.begin_send("hi").unwrap();
        app.controller.finish_send(Ok(reply.join("\n")));

        screen_text_sized(&mut app, 80, 24);
        app.scroll_to_bottom();
        let wide_scroll = app.chat_scroll;
        assert!(screen_text_sized(&mut app, 80, 24).contains("the end"));

        crate::handler::handle_event(&mut app, crate::tui::AppEvent::Resize(40, 24));
        let screen = screen_text_sized(&mut app, 40, 24);

        assert!(app.chat_scroll > wide_scroll);
        assert!(!app.rescroll_pending);
        assert!(screen.contains("the end"));
    }
}
