//! Conversation persistence.
//!
//! A conversation is a header row plus an ordered list of turn rows.
//! Structured turn payloads (extracted preferences, recommendations)
//! are stored as JSON columns; a malformed payload degrades to `None`
//! on read rather than failing the whole load.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::{info, warn};
use uuid::Uuid;

use citypulse_core::error::CityPulseError;
use citypulse_core::types::{Conversation, ConversationSummary, ConversationTurn, Role};

use crate::db::Database;

/// Persistent conversation storage scoped by user.
pub trait ConversationStore: Send + Sync {
    /// Create an empty conversation for a user, returning its id.
    fn create(
        &self,
        user_id: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, CityPulseError>;

    /// Append a turn to a conversation and bump its last-message time.
    fn save_turn(
        &self,
        user_id: &str,
        conversation_id: &str,
        turn: &ConversationTurn,
    ) -> Result<(), CityPulseError>;

    /// Load a full conversation with its turns in append order.
    fn get(&self, user_id: &str, conversation_id: &str) -> Result<Conversation, CityPulseError>;

    /// List a user's conversations, most recently active first.
    fn list(&self, user_id: &str, limit: usize) -> Result<Vec<ConversationSummary>, CityPulseError>;

    /// Delete a conversation and its turns.
    fn delete(&self, user_id: &str, conversation_id: &str) -> Result<(), CityPulseError>;

    /// Reassign every conversation from one user id to another, returning
    /// the number moved. Used when an anonymous user registers.
    fn migrate_user(&self, old_user_id: &str, new_user_id: &str) -> Result<usize, CityPulseError>;
}

pub struct SqliteConversationStore {
    db: Arc<Database>,
}

impl SqliteConversationStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

fn parse_role(raw: &str) -> Role {
    match raw {
        "assistant" => Role::Assistant,
        _ => Role::User,
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|_| Utc::now())
}

/// Deserialize an optional JSON column, degrading to `None` on junk.
fn parse_json_column<T: serde::de::DeserializeOwned>(
    raw: Option<String>,
    column: &str,
) -> Option<T> {
    let text = raw?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Dropping malformed {} payload: {}", column, e);
            None
        }
    }
}

impl ConversationStore for SqliteConversationStore {
    fn create(
        &self,
        user_id: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, CityPulseError> {
        let conversation_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let metadata_json = serde_json::to_string(&metadata)?;

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations (conversation_id, user_id, created_at, last_message_at, metadata)
                 VALUES (?1, ?2, ?3, ?3, ?4)",
                params![conversation_id, user_id, now, metadata_json],
            )
            .map_err(|e| CityPulseError::Storage(format!("Failed to create conversation: {}", e)))?;
            Ok(())
        })?;

        info!("Created conversation {} for user {}", conversation_id, user_id);
        Ok(conversation_id)
    }

    fn save_turn(
        &self,
        user_id: &str,
        conversation_id: &str,
        turn: &ConversationTurn,
    ) -> Result<(), CityPulseError> {
        let preferences = turn
            .extracted_preferences
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let recommendations = turn
            .recommendations
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.db.with_conn(|conn| {
            let owner: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM conversations WHERE conversation_id = ?1",
                    [conversation_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| CityPulseError::Storage(e.to_string()))?;

            match owner {
                Some(owner) if owner == user_id => {}
                _ => {
                    return Err(CityPulseError::ConversationNotFound(
                        conversation_id.to_string(),
                    ))
                }
            }

            conn.execute(
                "INSERT INTO turns (conversation_id, role, content, timestamp,
                                    extracted_preferences, recommendations, cache_used, cache_age_hours)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    conversation_id,
                    turn.role.to_string(),
                    turn.content,
                    turn.timestamp.to_rfc3339(),
                    preferences,
                    recommendations,
                    turn.cache_used,
                    turn.cache_age_hours,
                ],
            )
            .map_err(|e| CityPulseError::Storage(format!("Failed to save turn: {}", e)))?;

            conn.execute(
                "UPDATE conversations SET last_message_at = ?1 WHERE conversation_id = ?2",
                params![Utc::now().to_rfc3339(), conversation_id],
            )
            .map_err(|e| CityPulseError::Storage(e.to_string()))?;
            Ok(())
        })
    }

    fn get(&self, user_id: &str, conversation_id: &str) -> Result<Conversation, CityPulseError> {
        self.db.with_conn(|conn| {
            let header: Option<(String, String, String)> = conn
                .query_row(
                    "SELECT created_at, last_message_at, metadata
                     FROM conversations
                     WHERE conversation_id = ?1 AND user_id = ?2",
                    params![conversation_id, user_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .map_err(|e| CityPulseError::Storage(e.to_string()))?;

            let (created_at, last_message_at, metadata_json) = header.ok_or_else(|| {
                CityPulseError::ConversationNotFound(conversation_id.to_string())
            })?;

            let mut stmt = conn
                .prepare(
                    "SELECT role, content, timestamp, extracted_preferences,
                            recommendations, cache_used, cache_age_hours
                     FROM turns
                     WHERE conversation_id = ?1
                     ORDER BY id ASC",
                )
                .map_err(|e| CityPulseError::Storage(e.to_string()))?;

            let turns = stmt
                .query_map([conversation_id], |row| {
                    let role: String = row.get(0)?;
                    let timestamp: String = row.get(2)?;
                    let preferences: Option<String> = row.get(3)?;
                    let recommendations: Option<String> = row.get(4)?;
                    Ok(ConversationTurn {
                        role: parse_role(&role),
                        content: row.get(1)?,
                        timestamp: parse_timestamp(&timestamp),
                        extracted_preferences: parse_json_column(preferences, "preferences"),
                        recommendations: parse_json_column(recommendations, "recommendations"),
                        cache_used: row.get(5)?,
                        cache_age_hours: row.get(6)?,
                    })
                })
                .map_err(|e| CityPulseError::Storage(e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| CityPulseError::Storage(e.to_string()))?;

            let metadata = serde_json::from_str(&metadata_json).unwrap_or_default();

            Ok(Conversation {
                conversation_id: conversation_id.to_string(),
                user_id: user_id.to_string(),
                created_at: parse_timestamp(&created_at),
                last_message_at: parse_timestamp(&last_message_at),
                metadata,
                turns,
            })
        })
    }

    fn list(&self, user_id: &str, limit: usize) -> Result<Vec<ConversationSummary>, CityPulseError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT c.conversation_id, c.created_at, c.last_message_at,
                            (SELECT COUNT(*) FROM turns t WHERE t.conversation_id = c.conversation_id),
                            COALESCE((SELECT content FROM turns t
                                      WHERE t.conversation_id = c.conversation_id
                                      ORDER BY t.id ASC LIMIT 1), '')
                     FROM conversations c
                     WHERE c.user_id = ?1
                     ORDER BY c.last_message_at DESC
                     LIMIT ?2",
                )
                .map_err(|e| CityPulseError::Storage(e.to_string()))?;

            let summaries = stmt
                .query_map(params![user_id, limit as i64], |row| {
                    let created_at: String = row.get(1)?;
                    let last_message_at: String = row.get(2)?;
                    let count: i64 = row.get(3)?;
                    let preview: String = row.get(4)?;
                    Ok(ConversationSummary {
                        conversation_id: row.get(0)?,
                        created_at: parse_timestamp(&created_at),
                        last_message_at: parse_timestamp(&last_message_at),
                        message_count: count as usize,
                        preview: preview.chars().take(100).collect(),
                    })
                })
                .map_err(|e| CityPulseError::Storage(e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| CityPulseError::Storage(e.to_string()))?;

            Ok(summaries)
        })
    }

    fn delete(&self, user_id: &str, conversation_id: &str) -> Result<(), CityPulseError> {
        self.db.with_conn(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM conversations WHERE conversation_id = ?1 AND user_id = ?2",
                    params![conversation_id, user_id],
                )
                .map_err(|e| CityPulseError::Storage(e.to_string()))?;

            if deleted == 0 {
                return Err(CityPulseError::ConversationNotFound(
                    conversation_id.to_string(),
                ));
            }
            Ok(())
        })?;

        info!("Deleted conversation {} for user {}", conversation_id, user_id);
        Ok(())
    }

    fn migrate_user(&self, old_user_id: &str, new_user_id: &str) -> Result<usize, CityPulseError> {
        let moved = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE conversations SET user_id = ?1 WHERE user_id = ?2",
                params![new_user_id, old_user_id],
            )
            .map_err(|e| CityPulseError::Storage(e.to_string()))
        })?;

        info!(
            "Migrated {} conversations from {} to {}",
            moved, old_user_id, new_user_id
        );
        Ok(moved)
    }
}
