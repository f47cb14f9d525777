//! Error types for the chat subsystem.

use citypulse_core::error::CityPulseError;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("Message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
}

impl From<CityPulseError> for ChatError {
    fn from(err: CityPulseError) -> Self {
        match err {
            CityPulseError::ConversationNotFound(id) => ChatError::ConversationNotFound(id),
            other => ChatError::Storage(other.to_string()),
        }
    }
}

impl From<ChatError> for CityPulseError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::ConversationNotFound(id) => CityPulseError::ConversationNotFound(id),
            other => CityPulseError::Chat(other.to_string()),
        }
    }
}
