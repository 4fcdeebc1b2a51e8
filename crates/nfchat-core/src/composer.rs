//! Builds `generateContent` request payloads from the conversation.

use serde::{Deserialize, Serialize};

use crate::state::{ChatMessage, ChatRole};

/// Label placed between the typed input and the extracted PDF text.
pub const PDF_LABEL: &str = "[Uploaded PDF Content]:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// One role-tagged unit of conversation content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role: role.api_name().to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }

    /// Concatenated text of all parts
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub contents: Vec<Turn>,
}

/// Returns true when the input should not be sent at all.
pub fn is_blank(input: &str) -> bool {
    input.trim().is_empty()
}

/// The user turn as sent: typed input plus the labelled PDF text, if any.
pub fn augment_input(input: &str, pdf_text: Option<&str>) -> String {
    match pdf_text {
        Some(text) if !text.is_empty() => format!("{}\n\n{}\n{}", input, PDF_LABEL, text),
        _ => input.to_string(),
    }
}

/// Map the prior conversation plus the augmented user turn into a request.
///
/// `history` holds every message before the new user message; the new
/// message itself is represented only by its augmented form.
pub fn compose_request(history: &[ChatMessage], input: &str, pdf_text: Option<&str>) -> GenerateRequest {
    let mut contents: Vec<Turn> = history
        .iter()
        .map(|msg| Turn::new(msg.role, msg.content.clone()))
        .collect();

    contents.push(Turn::new(ChatRole::User, augment_input(input, pdf_text)));

    GenerateRequest { contents }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: u64, role: ChatRole, content: &str) -> ChatMessage {
        ChatMessage {
            id,
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_blank_inputs() {
        assert!(is_blank(""));
        assert!(is_blank("   "));
        assert!(is_blank("\n\t "));
        assert!(!is_blank(" hi "));
    }

    #[test]
    fn test_augment_without_pdf() {
        assert_eq!(augment_input("Summarize", None), "Summarize");
        assert_eq!(augment_input("Summarize", Some("")), "Summarize");
    }

    #[test]
    fn test_augment_with_pdf() {
        let combined = augment_input("Summarize", Some("\n\nPage 1:\nHello"));
        assert_eq!(
            combined,
            "Summarize\n\n[Uploaded PDF Content]:\n\n\nPage 1:\nHello"
        );
    }

    #[test]
    fn test_compose_maps_roles_and_appends_turn() {
        let history = vec![
            message(1, ChatRole::User, "What is Rust?"),
            message(2, ChatRole::Assistant, "A systems language."),
        ];
        let request = compose_request(&history, "Tell me more", None);

        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[0].role, "user");
        assert_eq!(request.contents[1].role, "model");
        assert_eq!(request.contents[1].text(), "A systems language.");
        assert_eq!(request.contents[2].role, "user");
        assert_eq!(request.contents[2].text(), "Tell me more");
    }

    #[test]
    fn test_request_wire_shape() {
        let request = compose_request(&[], "Hi", None);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Hi" }] }]
            })
        );
    }
}
