//! Anonymous trial usage tracking.
//!
//! Counts interactions per user id and gates unregistered users at a
//! configurable trial limit. Registered users are never gated.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::info;

use citypulse_core::error::CityPulseError;
use citypulse_core::types::UsageStats;

use crate::db::Database;

/// Per-user interaction counting behind the trial gate.
pub trait UsageTracker: Send + Sync {
    /// Current usage for a user. Unknown users get zeroed stats.
    fn get_usage(&self, user_id: &str) -> Result<UsageStats, CityPulseError>;

    /// Record one interaction and return the updated stats.
    fn increment_usage(&self, user_id: &str) -> Result<UsageStats, CityPulseError>;

    /// Whether the user has exhausted the trial and is not registered.
    fn check_trial_limit(&self, user_id: &str) -> Result<bool, CityPulseError>;

    /// Mark a user as registered, lifting the gate permanently.
    fn mark_registered(&self, user_id: &str) -> Result<(), CityPulseError>;

    /// Remaining-interaction count at which a warning should be shown.
    fn warning_threshold(&self) -> u32;
}

pub struct SqliteUsageTracker {
    db: Arc<Database>,
    trial_limit: u32,
}

impl SqliteUsageTracker {
    pub fn new(db: Arc<Database>, trial_limit: u32) -> Self {
        Self { db, trial_limit }
    }

    fn remaining(&self, interaction_count: u32) -> u32 {
        self.trial_limit.saturating_sub(interaction_count)
    }
}

impl UsageTracker for SqliteUsageTracker {
    fn get_usage(&self, user_id: &str) -> Result<UsageStats, CityPulseError> {
        let row: Option<(i64, bool, String, Option<String>)> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT interaction_count, is_registered, first_interaction, last_interaction
                 FROM user_usage WHERE user_id = ?1",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(|e| CityPulseError::Storage(e.to_string()))
        })?;

        Ok(match row {
            Some((count, is_registered, first, last)) => {
                let interaction_count = count.max(0) as u32;
                UsageStats {
                    user_id: user_id.to_string(),
                    interaction_count,
                    trial_remaining: self.remaining(interaction_count),
                    is_registered,
                    first_interaction: first.parse().unwrap_or_else(|_| Utc::now()),
                    last_interaction: last.and_then(|t| t.parse().ok()),
                }
            }
            None => UsageStats {
                user_id: user_id.to_string(),
                interaction_count: 0,
                trial_remaining: self.trial_limit,
                is_registered: false,
                first_interaction: Utc::now(),
                last_interaction: None,
            },
        })
    }

    fn increment_usage(&self, user_id: &str) -> Result<UsageStats, CityPulseError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_usage (user_id, interaction_count, first_interaction, last_interaction)
                 VALUES (?1, 1, ?2, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET
                     interaction_count = interaction_count + 1,
                     last_interaction = excluded.last_interaction",
                params![user_id, now],
            )
            .map_err(|e| CityPulseError::Storage(e.to_string()))?;
            Ok(())
        })?;

        let usage = self.get_usage(user_id)?;
        info!(
            "Updated usage for {}: {} interactions, {} remaining",
            user_id, usage.interaction_count, usage.trial_remaining
        );
        Ok(usage)
    }

    fn check_trial_limit(&self, user_id: &str) -> Result<bool, CityPulseError> {
        let usage = self.get_usage(user_id)?;
        Ok(usage.interaction_count >= self.trial_limit && !usage.is_registered)
    }

    fn mark_registered(&self, user_id: &str) -> Result<(), CityPulseError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_usage (user_id, interaction_count, is_registered, first_interaction, registered_at)
                 VALUES (?1, 0, 1, ?2, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET
                     is_registered = 1,
                     registered_at = excluded.registered_at",
                params![user_id, now],
            )
            .map_err(|e| CityPulseError::Storage(e.to_string()))?;
            Ok(())
        })?;

        info!("Marked {} as registered", user_id);
        Ok(())
    }

    fn warning_threshold(&self) -> u32 {
        (self.trial_limit / 3).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(limit: u32) -> SqliteUsageTracker {
        SqliteUsageTracker::new(Arc::new(Database::in_memory().unwrap()), limit)
    }

    #[test]
    fn test_unknown_user_has_full_trial() {
        let tracker = tracker(10);
        let usage = tracker.get_usage("new-user").unwrap();
        assert_eq!(usage.interaction_count, 0);
        assert_eq!(usage.trial_remaining, 10);
        assert!(!usage.is_registered);
        assert!(usage.last_interaction.is_none());
    }

    #[test]
    fn test_increment_counts_and_decrements_remaining() {
        let tracker = tracker(10);
        let usage = tracker.increment_usage("u1").unwrap();
        assert_eq!(usage.interaction_count, 1);
        assert_eq!(usage.trial_remaining, 9);
        assert!(usage.last_interaction.is_some());

        let usage = tracker.increment_usage("u1").unwrap();
        assert_eq!(usage.interaction_count, 2);
        assert_eq!(usage.trial_remaining, 8);
    }

    #[test]
    fn test_remaining_clamps_at_zero() {
        let tracker = tracker(2);
        for _ in 0..5 {
            tracker.increment_usage("u1").unwrap();
        }
        let usage = tracker.get_usage("u1").unwrap();
        assert_eq!(usage.interaction_count, 5);
        assert_eq!(usage.trial_remaining, 0);
    }

    #[test]
    fn test_trial_gate_trips_at_limit() {
        let tracker = tracker(3);
        assert!(!tracker.check_trial_limit("u1").unwrap());

        for _ in 0..3 {
            tracker.increment_usage("u1").unwrap();
        }
        assert!(tracker.check_trial_limit("u1").unwrap());
    }

    #[test]
    fn test_registered_user_is_never_gated() {
        let tracker = tracker(2);
        for _ in 0..4 {
            tracker.increment_usage("u1").unwrap();
        }
        assert!(tracker.check_trial_limit("u1").unwrap());

        tracker.mark_registered("u1").unwrap();
        assert!(!tracker.check_trial_limit("u1").unwrap());

        // Registration preserves the existing count.
        assert_eq!(tracker.get_usage("u1").unwrap().interaction_count, 4);
    }

    #[test]
    fn test_mark_registered_for_unknown_user() {
        let tracker = tracker(10);
        tracker.mark_registered("brand-new").unwrap();
        let usage = tracker.get_usage("brand-new").unwrap();
        assert!(usage.is_registered);
        assert_eq!(usage.interaction_count, 0);
    }

    #[test]
    fn test_warning_threshold_is_third_of_limit_min_one() {
        assert_eq!(tracker(10).warning_threshold(), 3);
        assert_eq!(tracker(9).warning_threshold(), 3);
        assert_eq!(tracker(2).warning_threshold(), 1);
        assert_eq!(tracker(1).warning_threshold(), 1);
    }

    #[test]
    fn test_users_are_tracked_independently() {
        let tracker = tracker(10);
        tracker.increment_usage("u1").unwrap();
        tracker.increment_usage("u1").unwrap();
        tracker.increment_usage("u2").unwrap();

        assert_eq!(tracker.get_usage("u1").unwrap().interaction_count, 2);
        assert_eq!(tracker.get_usage("u2").unwrap().interaction_count, 1);
    }
}
