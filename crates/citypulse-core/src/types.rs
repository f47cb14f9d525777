//! Shared domain types.
//!
//! Optionality is `Option<String>` everywhere in memory; the legacy
//! `"none"` sentinel exists only at the serialization boundary, handled
//! by the [`sentinel`] serde helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serde helpers mapping the storage sentinel `"none"` (and empty
/// strings) to `None`, and `None` back to `"none"` on write.
///
/// Stored conversation history predates the typed preference model, so
/// reads must accept the sentinel; writes keep emitting it so records
/// stay compatible with existing readers.
pub mod sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(v),
            None => serializer.serialize_str("none"),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none")))
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// The per-turn preference set resolved from extraction, stored history,
/// and query-derived signals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceSet {
    #[serde(default, with = "sentinel")]
    pub location: Option<String>,
    #[serde(default, with = "sentinel")]
    pub date: Option<String>,
    #[serde(default, with = "sentinel")]
    pub time: Option<String>,
    #[serde(default, with = "sentinel")]
    pub event_type: Option<String>,
}

impl PreferenceSet {
    /// A set is complete when location and event type are both known.
    /// Date and time are optional refinements.
    pub fn is_complete(&self) -> bool {
        self.location.is_some() && self.event_type.is_some()
    }

    /// Fill unset fields from `other`, never overwriting a concrete value.
    pub fn fill_gaps_from(&mut self, other: &PreferenceSet) {
        if self.location.is_none() {
            self.location = other.location.clone();
        }
        if self.date.is_none() {
            self.date = other.date.clone();
        }
        if self.time.is_none() {
            self.time = other.time.clone();
        }
        if self.event_type.is_none() {
            self.event_type = other.event_type.clone();
        }
    }
}

// =============================================================================
// Events and recommendations
// =============================================================================

/// A single event record as returned by providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub event_id: String,
    pub title: String,
    pub description: String,
    pub start_datetime: String,
    pub end_datetime: String,
    pub timezone: String,
    pub venue_name: String,
    pub venue_city: String,
    pub venue_country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub organizer_name: String,
    pub ticket_min_price: String,
    pub ticket_max_price: String,
    pub is_free: bool,
    pub categories: Vec<String>,
    pub image_url: String,
    pub event_url: String,
    pub attendee_count: u64,
    pub source: String,
}

/// An event annotated with a ranker-assigned relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvent {
    #[serde(flatten)]
    pub event: Event,
    pub relevance_score: f64,
}

/// Where a recommendation's event data was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Cached,
    Realtime,
}

/// A formatted recommendation, derived per turn and persisted only as
/// part of the assistant turn that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub event: Event,
    pub relevance_score: f64,
    pub explanation: String,
    pub source: RecommendationSource,
}

// =============================================================================
// Conversations
// =============================================================================

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single (role, content) pair from caller-supplied history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

/// One immutable turn of a conversation. Ordering is append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_preferences: Option<PreferenceSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<Recommendation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_used: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_age_hours: Option<f64>,
}

impl ConversationTurn {
    /// A bare turn with no extraction or recommendation payload.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            extracted_preferences: None,
            recommendations: None,
            cache_used: None,
            cache_age_hours: None,
        }
    }
}

/// A full conversation owned by `(user_id, conversation_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub turns: Vec<ConversationTurn>,
}

/// Listing-level view of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub message_count: usize,
    pub preview: String,
}

// =============================================================================
// Usage tracking
// =============================================================================

/// Per-user interaction statistics backing the anonymous trial gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub user_id: String,
    pub interaction_count: u32,
    pub trial_remaining: u32,
    pub is_registered: bool,
    pub first_interaction: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction: Option<DateTime<Utc>>,
}
