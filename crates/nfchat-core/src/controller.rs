//! Conversation-state controller.
//!
//! `ChatController` owns the conversation and the pending attachment and is
//! the only thing that mutates them. Sending and uploading are split into a
//! `begin_*` step (synchronous, mutates state, returns the work to do) and a
//! `finish_*` step (applies the outcome), so the UI can run the slow part on a
//! background task and report back through its event loop.

use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::ai::GeminiClient;
use crate::composer::{compose_request, is_blank, GenerateRequest};
use crate::error::Result;
use crate::pdf::{is_pdf, PdfExtractor};
use crate::state::{Attachment, ChatMessage, ChatRole, Conversation};

/// Identifies one upload; results for a stale ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket(u64);

#[derive(Debug, Default)]
pub struct ChatController {
    conversation: Conversation,
    attachment: Attachment,
    typing: bool,
    extracting: bool,
    upload_generation: u64,
}

impl ChatController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    pub fn uploaded_file_name(&self) -> Option<&str> {
        self.attachment.file_name.as_deref()
    }

    /// A completion request is outstanding.
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// A PDF is still being parsed.
    pub fn is_extracting(&self) -> bool {
        self.extracting
    }

    pub fn can_send(&self) -> bool {
        !self.typing
    }

    /// Record the user's message and build the request for it.
    ///
    /// Returns `None` (and changes nothing) for blank input or while another
    /// request is outstanding.
    pub fn begin_send(&mut self, input: &str) -> Option<GenerateRequest> {
        if is_blank(input) {
            return None;
        }
        if self.typing {
            debug!("send ignored: a request is already outstanding");
            return None;
        }

        let request = compose_request(
            self.conversation.messages(),
            input,
            self.attachment.extracted_text.as_deref(),
        );

        if self.extracting {
            warn!("sending before PDF extraction finished; attachment text not included");
        }

        self.conversation.append_message(ChatRole::User, input);
        self.typing = true;

        info!(
            turns = request.contents.len(),
            with_pdf = self.attachment.extracted_text.is_some(),
            "message sent"
        );
        Some(request)
    }

    /// Append the reply (or a synthesized error message) and reset the
    /// attachment. Any extraction still in flight is abandoned.
    pub fn finish_send(&mut self, result: Result<String>) -> &ChatMessage {
        let content = match result {
            Ok(text) => text,
            Err(e) => {
                error!("Gemini API error: {}", e);
                format!("⚠️ API Error: {}", e)
            }
        };

        self.typing = false;
        self.reset_attachment();

        self.conversation.append_message(ChatRole::Assistant, content);
        // append_message just pushed, so there is a last element
        &self.conversation.messages()[self.conversation.len() - 1]
    }

    /// Start an upload. Non-PDF files are ignored without any message.
    pub fn begin_upload(&mut self, path: &Path) -> Option<UploadTicket> {
        if !is_pdf(path) {
            debug!(path = %path.display(), "ignoring non-PDF upload");
            return None;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.upload_generation += 1;
        self.attachment.file_name = Some(file_name);
        self.attachment.extracted_text = None;
        self.extracting = true;

        info!(path = %path.display(), "PDF upload started");
        Some(UploadTicket(self.upload_generation))
    }

    /// Apply an extraction result. Returns false when the ticket is stale and
    /// the result was dropped.
    pub fn finish_upload(&mut self, ticket: UploadTicket, result: Result<String>) -> bool {
        if ticket.0 != self.upload_generation || !self.extracting {
            debug!("dropping stale PDF extraction result");
            return false;
        }

        self.extracting = false;
        match result {
            Ok(text) => {
                info!(chars = text.len(), "PDF text extracted");
                self.attachment.extracted_text = Some(text);
            }
            Err(e) => {
                error!("Error parsing PDF: {}", e);
                self.attachment.extracted_text = None;
            }
        }
        true
    }

    /// Run a whole send without a UI: begin, query, finish.
    pub async fn send(&mut self, client: &GeminiClient, input: &str) -> Option<&ChatMessage> {
        let request = self.begin_send(input)?;
        let result = client.query(&request).await;
        Some(self.finish_send(result))
    }

    /// Run a whole upload without a UI.
    pub async fn upload(&mut self, extractor: &PdfExtractor, path: &Path) -> bool {
        let Some(ticket) = self.begin_upload(path) else {
            return false;
        };
        let result = extractor.extract_file(path).await;
        self.finish_upload(ticket, result)
    }

    fn reset_attachment(&mut self) {
        self.attachment.clear();
        self.extracting = false;
        self.upload_generation += 1;
    }
}
