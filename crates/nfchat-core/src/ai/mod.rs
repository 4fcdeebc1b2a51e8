pub mod gemini;

pub use gemini::{interpret_response, GeminiClient, DEFAULT_ENDPOINT, DEFAULT_MODEL, NO_VALID_RESPONSE};
