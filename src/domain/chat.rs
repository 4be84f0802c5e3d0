//! Chat request inputs as seen by the reply source.

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Metadata describing a file the client uploaded alongside (or instead of) a
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Location relative to the uploads directory.
    pub stored_path: String,
}

/// A single chat submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatPrompt {
    message: Option<String>,
    file: Option<UploadedFile>,
}

impl ChatPrompt {
    /// Build a prompt, treating a message that is blank after trimming as absent.
    /// A non-blank message is kept exactly as sent.
    pub fn new(message: Option<String>, file: Option<UploadedFile>) -> Self {
        let message = message.filter(|value| !value.trim().is_empty());
        Self { message, file }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn file(&self) -> Option<&UploadedFile> {
        self.file.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.file.is_none()
    }
}

/// Text submitted for rendering. Must be present and non-empty; whitespace
/// alone is valid input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderText(String);

impl RenderText {
    pub fn parse(value: Option<String>) -> Result<Self, DomainError> {
        match value {
            Some(text) if !text.is_empty() => Ok(Self(text)),
            _ => Err(DomainError::validation("`text` is required")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_message_counts_as_absent() {
        let prompt = ChatPrompt::new(Some("   \n".to_string()), None);
        assert!(prompt.message().is_none());
        assert!(prompt.is_empty());
    }

    #[test]
    fn message_is_kept_verbatim() {
        let prompt = ChatPrompt::new(Some("  hi there \n".to_string()), None);
        assert_eq!(prompt.message(), Some("  hi there \n"));
    }

    #[test]
    fn render_text_rejects_only_missing_and_empty() {
        assert!(RenderText::parse(None).is_err());
        assert!(RenderText::parse(Some(String::new())).is_err());
        assert_eq!(
            RenderText::parse(Some("  \n ".to_string()))
                .expect("whitespace is renderable")
                .as_str(),
            "  \n "
        );
        assert_eq!(
            RenderText::parse(Some(" x ".to_string()))
                .expect("valid text")
                .as_str(),
            " x "
        );
    }
}
