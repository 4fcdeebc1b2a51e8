use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

const SCROLL_STEP: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.on_resize(),
        AppEvent::Tick => app.tick(),
        AppEvent::Completion(result) => app.on_completion(result),
        AppEvent::PdfExtracted(ticket, result) => app.on_pdf_extracted(ticket, result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Chat => handle_chat_key(app, key),
        InputMode::Upload => handle_upload_key(app, key),
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('u') {
            app.open_upload_prompt();
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => app.submit_message(),
        KeyCode::PageUp => app.scroll_up(SCROLL_STEP * 3),
        KeyCode::PageDown => app.scroll_down(SCROLL_STEP * 3),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Backspace => app.input.backspace(),
        KeyCode::Delete => app.input.delete(),
        KeyCode::Left => app.input.left(),
        KeyCode::Right => app.input.right(),
        KeyCode::Home => app.input.home(),
        KeyCode::End => app.input.end(),
        KeyCode::Char(c) => app.input.insert(c),
        _ => {}
    }
}

fn handle_upload_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_upload_prompt(),
        KeyCode::Enter => app.submit_upload(),
        KeyCode::Backspace => app.upload_input.backspace(),
        KeyCode::Delete => app.upload_input.delete(),
        KeyCode::Left => app.upload_input.left(),
        KeyCode::Right => app.upload_input.right(),
        KeyCode::Home => app.upload_input.home(),
        KeyCode::End => app.upload_input.end(),
        KeyCode::Char(c) => app.upload_input.insert(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(SCROLL_STEP),
        MouseEventKind::ScrollUp => app.scroll_up(SCROLL_STEP),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfchat_core::ai::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
    use nfchat_core::{GeminiClient, PdfExtractor};
    use tokio::sync::mpsc;

    fn test_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(
            GeminiClient::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, None),
            PdfExtractor::default(),
            tx,
        )
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    #[test]
    fn test_typing_fills_input() {
        let mut app = test_app();
        for c in "hi".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        assert_eq!(app.input.text, "hi");
    }

    #[test]
    fn test_ctrl_u_opens_upload_and_esc_cancels() {
        let mut app = test_app();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL)),
        );
        assert_eq!(app.input_mode, InputMode::Upload);

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.upload_input.text, "x");
        assert!(app.input.text.is_empty());

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Chat);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_from_upload_prompt() {
        let mut app = test_app();
        app.open_upload_prompt();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(app.should_quit);
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 2, 4, 4);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 5, rect));
        assert!(!point_in_rect(6, 2, rect));
    }
}
