//! CityPulse store crate - SQLite persistence for conversations and usage.
//!
//! Conversations are stored as a header row plus ordered turn rows;
//! usage tracking backs the anonymous trial gate. All access goes
//! through the `Database` wrapper, which owns the connection and runs
//! migrations on open.

pub mod conversations;
pub mod db;
pub mod migrations;
pub mod usage;

pub use conversations::{ConversationStore, SqliteConversationStore};
pub use db::Database;
pub use usage::{SqliteUsageTracker, UsageTracker};
