pub mod ai;
pub mod composer;
pub mod config;
pub mod controller;
pub mod error;
pub mod pdf;
pub mod state;

// Re-export main types for convenience
pub use ai::{GeminiClient, NO_VALID_RESPONSE};
pub use composer::{GenerateRequest, Turn};
pub use config::Config;
pub use controller::{ChatController, UploadTicket};
pub use error::{ChatError, Result};
pub use pdf::PdfExtractor;
pub use state::{Attachment, ChatMessage, ChatRole, Conversation};
