//! Error types for the nfchat core library.
//!
//! None of these errors is fatal to a chat session. The controller turns
//! request failures into assistant messages, and PDF failures are logged and
//! leave the attachment empty.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    // ── Completion errors ─────────────────────────────────────────────────
    /// The request never produced an HTTP response.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API request failed: {message}")]
    Api { status: u16, message: String },

    /// A success response whose body is not JSON.
    #[error("Malformed response body: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    /// Neither an API key nor a relay endpoint is configured.
    #[error("No API key configured. Set GEMINI_API_KEY or run: nfchat config --api-key <KEY>")]
    MissingApiKey,

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The pdfium shared library could not be loaded.
    #[error("PDF engine unavailable: {0}")]
    PdfLibrary(String),

    /// pdfium loaded but could not read the document.
    #[error("Failed to parse PDF: {0}")]
    PdfParse(String),

    // ── Local errors ──────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;
