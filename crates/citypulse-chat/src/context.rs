//! Conversation context: stored preferences and the history window.
//!
//! Past turns carry the preferences that were extracted when they were
//! saved; a follow-up like "what about tomorrow?" reuses them instead of
//! asking the user again.

use citypulse_core::types::{Conversation, HistoryMessage, PreferenceSet};

/// Most recent value per preference field across a conversation's turns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredPreferences {
    pub location: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub event_type: Option<String>,
}

impl StoredPreferences {
    fn is_complete(&self) -> bool {
        self.location.is_some()
            && self.date.is_some()
            && self.time.is_some()
            && self.event_type.is_some()
    }

    fn absorb(&mut self, prefs: &PreferenceSet) {
        if self.location.is_none() {
            self.location = prefs.location.clone();
        }
        if self.date.is_none() {
            self.date = prefs.date.clone();
        }
        if self.time.is_none() {
            self.time = prefs.time.clone();
        }
        if self.event_type.is_none() {
            self.event_type = prefs.event_type.clone();
        }
    }
}

/// Walk a conversation newest-first, collecting the most recent value of
/// each preference field and the full message history in order.
pub fn lookup_stored_preferences(
    conversation: &Conversation,
) -> (StoredPreferences, Vec<HistoryMessage>) {
    let mut stored = StoredPreferences::default();

    for turn in conversation.turns.iter().rev() {
        if let Some(prefs) = &turn.extracted_preferences {
            stored.absorb(prefs);
        }
        if stored.is_complete() {
            break;
        }
    }

    let history = conversation
        .turns
        .iter()
        .map(|turn| HistoryMessage {
            role: turn.role,
            content: turn.content.clone(),
        })
        .collect();

    (stored, history)
}

/// Merge stored history with caller-supplied history into one window.
///
/// Duplicate (role, content) pairs from the caller are dropped; the
/// result is capped to the most recent `window` messages.
pub fn merge_history(
    stored: Vec<HistoryMessage>,
    supplied: &[HistoryMessage],
    window: usize,
) -> Vec<HistoryMessage> {
    let mut combined = stored;
    let mut seen: std::collections::HashSet<(citypulse_core::types::Role, String)> = combined
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect();

    let tail_start = supplied.len().saturating_sub(window);
    for msg in &supplied[tail_start..] {
        let key = (msg.role, msg.content.clone());
        if !seen.contains(&key) {
            combined.push(msg.clone());
            seen.insert(key);
        }
    }

    if combined.len() > window {
        combined.drain(..combined.len() - window);
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use citypulse_core::types::{ConversationTurn, Role};

    fn conversation(turns: Vec<ConversationTurn>) -> Conversation {
        Conversation {
            conversation_id: "c1".to_string(),
            user_id: "u1".to_string(),
            created_at: Utc::now(),
            last_message_at: Utc::now(),
            metadata: serde_json::Map::new(),
            turns,
        }
    }

    fn turn_with_prefs(content: &str, location: Option<&str>, event_type: Option<&str>) -> ConversationTurn {
        let mut turn = ConversationTurn::new(Role::User, content);
        turn.extracted_preferences = Some(PreferenceSet {
            location: location.map(String::from),
            date: None,
            time: None,
            event_type: event_type.map(String::from),
        });
        turn
    }

    fn msg(role: Role, content: &str) -> HistoryMessage {
        HistoryMessage {
            role,
            content: content.to_string(),
        }
    }

    // ---- Stored preference lookup ----

    #[test]
    fn test_lookup_finds_most_recent_values() {
        let conv = conversation(vec![
            turn_with_prefs("music in boston", Some("boston"), Some("music")),
            turn_with_prefs("what about comedy", None, Some("comedy")),
        ]);

        let (stored, history) = lookup_stored_preferences(&conv);
        assert_eq!(stored.location.as_deref(), Some("boston"));
        assert_eq!(stored.event_type.as_deref(), Some("comedy"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_lookup_skips_turns_without_preferences() {
        let mut bare = ConversationTurn::new(Role::Assistant, "which city?");
        bare.extracted_preferences = None;
        let conv = conversation(vec![
            turn_with_prefs("events in denver", Some("denver"), None),
            bare,
        ]);

        let (stored, _) = lookup_stored_preferences(&conv);
        assert_eq!(stored.location.as_deref(), Some("denver"));
    }

    #[test]
    fn test_lookup_empty_conversation() {
        let (stored, history) = lookup_stored_preferences(&conversation(vec![]));
        assert_eq!(stored, StoredPreferences::default());
        assert!(history.is_empty());
    }

    // ---- History merging ----

    #[test]
    fn test_merge_dedupes_supplied_messages() {
        let stored = vec![msg(Role::User, "music in boston")];
        let supplied = vec![
            msg(Role::User, "music in boston"),
            msg(Role::Assistant, "sure, when?"),
        ];

        let merged = merge_history(stored, &supplied, 6);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].content, "sure, when?");
    }

    #[test]
    fn test_merge_caps_to_window() {
        let stored: Vec<_> = (0..5).map(|i| msg(Role::User, &format!("s{}", i))).collect();
        let supplied: Vec<_> = (0..5).map(|i| msg(Role::User, &format!("n{}", i))).collect();

        let merged = merge_history(stored, &supplied, 6);
        assert_eq!(merged.len(), 6);
        // Newest messages survive the cap.
        assert_eq!(merged.last().unwrap().content, "n4");
    }

    #[test]
    fn test_merge_with_no_supplied_history() {
        let stored = vec![msg(Role::User, "hello")];
        let merged = merge_history(stored.clone(), &[], 6);
        assert_eq!(merged, stored);
    }
}
