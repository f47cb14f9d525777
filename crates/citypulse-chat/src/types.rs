//! Request and outcome types for the chat flow.

use serde::{Deserialize, Serialize};

use citypulse_core::types::{HistoryMessage, PreferenceSet, Recommendation, UsageStats};

/// One incoming chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub message: String,
    /// Caller-supplied history for clients that keep it locally.
    #[serde(default)]
    pub conversation_history: Vec<HistoryMessage>,
    /// Whether this is the first turn of a new conversation.
    #[serde(default)]
    pub is_initial_response: bool,
}

impl ChatRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            conversation_id: None,
            message: message.into(),
            conversation_history: Vec::new(),
            is_initial_response: true,
        }
    }
}

/// The resolved result of one chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub message: String,
    pub recommendations: Vec<Recommendation>,
    pub cache_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_preferences: Option<PreferenceSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_stats: Option<UsageStats>,
    pub trial_exceeded: bool,
    pub conversation_id: String,
}

impl ChatOutcome {
    /// A reply that carries no recommendations (clarifications, trial gate).
    pub fn message_only(
        message: impl Into<String>,
        conversation_id: impl Into<String>,
        extracted_preferences: Option<PreferenceSet>,
        usage_stats: Option<UsageStats>,
    ) -> Self {
        Self {
            message: message.into(),
            recommendations: Vec::new(),
            cache_used: false,
            cache_age_hours: None,
            extracted_preferences,
            extraction_summary: None,
            usage_stats,
            trial_exceeded: false,
            conversation_id: conversation_id.into(),
        }
    }
}
