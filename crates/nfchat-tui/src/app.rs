use std::path::PathBuf;
use nfchat_core::{ChatController, ChatError, GeminiClient, PdfExtractor, UploadTicket};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Typing a chat message
    Chat,
    /// Typing the path of a PDF to attach
    Upload,
}

/// Ticks per accent color step (6 x 300ms = 1.8s)
const ACCENT_TICKS: u8 = 6;
pub const ACCENT_COLORS: usize = 4;

/// Decorative color cursor for the send hint.
#[derive(Debug, Default)]
pub struct AccentCycle {
    index: usize,
    ticks: u8,
}

impl AccentCycle {
    pub fn tick(&mut self) {
        self.ticks += 1;
        if self.ticks >= ACCENT_TICKS {
            self.ticks = 0;
            self.index = (self.index + 1) % ACCENT_COLORS;
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text buffer with a character-based cursor
#[derive(Debug, Default)]
pub struct TextInput {
    pub text: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation state (messages, typing flag, attachment)
    pub controller: ChatController,

    pub input: TextInput,
    pub upload_input: TextInput,

    // Chat area scroll and size (updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub chat_area: Option<Rect>,
    pub rescroll_pending: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub accent: AccentCycle,

    pub client: GeminiClient,
    pub extractor: PdfExtractor,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(client: GeminiClient, extractor: PdfExtractor, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Chat,
            controller: ChatController::new(),
            input: TextInput::default(),
            upload_input: TextInput::default(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            rescroll_pending: false,
            animation_frame: 0,
            accent: AccentCycle::default(),
            client,
            extractor,
            events,
        }
    }

    /// Send the input buffer. Blank input, or input while a reply is pending,
    /// leaves everything untouched.
    pub fn submit_message(&mut self) {
        let Some(request) = self.controller.begin_send(&self.input.text) else {
            return;
        };

        self.input.clear();
        self.animation_frame = 0;
        self.scroll_to_bottom();

        // Spawn background task to query Gemini
        let client = self.client.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = client.query(&request).await;
            let _ = tx.send(AppEvent::Completion(result));
        });
    }

    pub fn open_upload_prompt(&mut self) {
        self.upload_input.clear();
        self.input_mode = InputMode::Upload;
    }

    pub fn cancel_upload_prompt(&mut self) {
        self.upload_input.clear();
        self.input_mode = InputMode::Chat;
    }

    /// Start extracting the file named in the upload prompt.
    pub fn submit_upload(&mut self) {
        self.input_mode = InputMode::Chat;
        let raw = self.upload_input.take();
        let raw = raw.trim();
        if raw.is_empty() {
            return;
        }

        let path = expand_home(raw);
        let Some(ticket) = self.controller.begin_upload(&path) else {
            return;
        };

        let extractor = self.extractor.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = extractor.extract_file(&path).await;
            let _ = tx.send(AppEvent::PdfExtracted(ticket, result));
        });
    }

    pub fn on_completion(&mut self, result: Result<String, ChatError>) {
        self.controller.finish_send(result);
        self.scroll_to_bottom();
    }

    pub fn on_pdf_extracted(&mut self, ticket: UploadTicket, result: Result<String, ChatError>) {
        if !self.controller.finish_upload(ticket, result) {
            debug!("extraction result arrived after the attachment was reset");
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick(&mut self) {
        if self.controller.is_typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.accent.tick();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    /// Scroll chat to bottom so the latest message (or "Typing...") is visible
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };
        let total_lines = crate::ui::wrapped_height(crate::ui::chat_lines(self), wrap_width);

        let visible_height = if self.chat_height > 0 {
            self.chat_height as usize
        } else {
            20
        };

        // Paragraph scroll is a u16; very long sessions pin to the limit
        self.chat_scroll = total_lines
            .saturating_sub(visible_height)
            .min(u16::MAX as usize) as u16;
    }

    /// The chat area changes size on the next draw; re-anchor there.
    pub fn on_resize(&mut self) {
        self.rescroll_pending = true;
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfchat_core::ai::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
    use nfchat_core::ChatRole;
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        // No key against the real endpoint: queries fail fast without network.
        let client = GeminiClient::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, None);
        (App::new(client, PdfExtractor::default(), tx), rx)
    }

    fn type_text(input: &mut TextInput, text: &str) {
        for c in text.chars() {
            input.insert(c);
        }
    }

    #[test]
    fn test_text_input_editing_is_char_based() {
        let mut input = TextInput::default();
        type_text(&mut input, "héllo");
        input.left();
        input.left();
        input.backspace();
        assert_eq!(input.text, "hélo");
        input.home();
        input.delete();
        assert_eq!(input.text, "élo");
        input.end();
        input.insert('!');
        assert_eq!(input.text, "élo!");
    }

    #[test]
    fn test_accent_cycles_every_six_ticks() {
        let mut accent = AccentCycle::default();
        for _ in 0..5 {
            accent.tick();
        }
        assert_eq!(accent.index(), 0);
        accent.tick();
        assert_eq!(accent.index(), 1);
        for _ in 0..(ACCENT_TICKS as usize * 3) {
            accent.tick();
        }
        assert_eq!(accent.index(), 0);
    }

    #[tokio::test]
    async fn test_submit_clears_input_and_reports_back() {
        let (mut app, mut rx) = test_app();
        type_text(&mut app.input, "Hello there");

        app.submit_message();

        assert!(app.input.text.is_empty());
        assert_eq!(app.input.cursor, 0);
        assert_eq!(app.controller.messages().len(), 1);
        assert!(app.controller.is_typing());

        match rx.recv().await {
            Some(AppEvent::Completion(result)) => {
                app.on_completion(result);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let messages = app.controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert!(messages[1].content.starts_with("⚠️ API Error:"));
        assert!(!app.controller.is_typing());
    }

    #[tokio::test]
    async fn test_blank_submit_keeps_buffer() {
        let (mut app, _rx) = test_app();
        type_text(&mut app.input, "   ");
        app.submit_message();
        assert_eq!(app.input.text, "   ");
        assert!(app.controller.messages().is_empty());
    }

    #[tokio::test]
    async fn test_non_pdf_upload_is_silent() {
        let (mut app, _rx) = test_app();
        app.open_upload_prompt();
        type_text(&mut app.upload_input, "notes.txt");
        app.submit_upload();

        assert_eq!(app.input_mode, InputMode::Chat);
        assert!(app.controller.attachment().is_empty());
        assert!(app.controller.messages().is_empty());
    }

    #[tokio::test]
    async fn test_missing_pdf_leaves_text_empty() {
        let (mut app, mut rx) = test_app();
        app.open_upload_prompt();
        type_text(&mut app.upload_input, "/nonexistent/nfchat/report.pdf");
        app.submit_upload();

        assert_eq!(app.controller.uploaded_file_name(), Some("report.pdf"));
        assert!(app.controller.is_extracting());

        match rx.recv().await {
            Some(AppEvent::PdfExtracted(ticket, result)) => app.on_pdf_extracted(ticket, result),
            other => panic!("unexpected event: {:?}", other),
        }

        assert!(!app.controller.is_extracting());
        assert_eq!(app.controller.attachment().extracted_text, None);
        assert!(app.controller.messages().is_empty());
    }

    fn exchange(app: &mut App, input: &str, reply: String) {
        app.controller.begin_send(input).unwrap();
        app.controller.finish_send(Ok(reply));
    }

    #[test]
    fn test_scroll_to_bottom_pins_on_very_long_sessions() {
        let (mut app, _rx) = test_app();
        let reply: Vec<String> = (0..1000).map(|i| format!("line {}", i)).collect();
        let reply = reply.join("\n");
        for _ in 0..70 {
            exchange(&mut app, "more", reply.clone());
        }

        app.scroll_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX);
    }

    #[test]
    fn test_scroll_to_bottom_counts_wide_characters() {
        let (mut app, _rx) = test_app();
        app.chat_width = 10;
        app.chat_height = 4;
        // 20 double-width characters fill four rows of ten cells
        exchange(&mut app, "hi", "漢".repeat(20));

        app.scroll_to_bottom();
        // You:, hi, blank, Gemini:, four wrapped rows, blank
        assert_eq!(app.chat_scroll, 9 - 4);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/tmp/a.pdf"), PathBuf::from("/tmp/a.pdf"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/a.pdf"), home.join("a.pdf"));
        }
    }
}
