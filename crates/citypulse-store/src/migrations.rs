//! Database schema migrations.
//!
//! Applies the initial schema: conversation headers, ordered turns, and
//! per-user usage counters, plus the schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use citypulse_core::error::CityPulseError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), CityPulseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| CityPulseError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| CityPulseError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), CityPulseError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS conversations (
            conversation_id  TEXT PRIMARY KEY NOT NULL,
            user_id          TEXT NOT NULL,
            created_at       TEXT NOT NULL,
            last_message_at  TEXT NOT NULL,
            metadata         TEXT NOT NULL DEFAULT '{}'
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_user
            ON conversations (user_id, last_message_at DESC);

        CREATE TABLE IF NOT EXISTS turns (
            id                     INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id        TEXT NOT NULL
                                   REFERENCES conversations (conversation_id)
                                   ON DELETE CASCADE,
            role                   TEXT NOT NULL
                                   CHECK (role IN ('user', 'assistant')),
            content                TEXT NOT NULL,
            timestamp              TEXT NOT NULL,
            extracted_preferences  TEXT,
            recommendations        TEXT,
            cache_used             INTEGER,
            cache_age_hours        REAL
        );

        CREATE INDEX IF NOT EXISTS idx_turns_conversation
            ON turns (conversation_id, id ASC);

        CREATE TABLE IF NOT EXISTS user_usage (
            user_id            TEXT PRIMARY KEY NOT NULL,
            interaction_count  INTEGER NOT NULL DEFAULT 0,
            is_registered      INTEGER NOT NULL DEFAULT 0,
            first_interaction  TEXT NOT NULL,
            last_interaction   TEXT,
            registered_at      TEXT
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| CityPulseError::Storage(format!("Failed to apply v1 schema: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row(
                "SELECT MAX(version) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, 1);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_role_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO conversations (conversation_id, user_id, created_at, last_message_at)
             VALUES ('c1', 'u1', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let bad = conn.execute(
            "INSERT INTO turns (conversation_id, role, content, timestamp)
             VALUES ('c1', 'system', 'hi', '2025-01-01T00:00:00Z')",
            [],
        );
        assert!(bad.is_err());
    }
}
