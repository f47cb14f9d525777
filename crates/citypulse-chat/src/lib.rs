//! Conversational interface for CityPulse.
//!
//! Turns free-text chat messages into event recommendations: extracts
//! preferences from the message and conversation context, resolves the
//! target city, serves events through the cache, ranks them against the
//! query, and composes the conversational reply. Both the one-shot and
//! the streaming entry points go through the same resolver.

pub mod context;
pub mod error;
pub mod extract;
pub mod location;
pub mod response;
pub mod service;
pub mod stream;
pub mod types;

pub use context::StoredPreferences;
pub use error::ChatError;
pub use extract::{PatternExtractor, PreferenceExtractor};
pub use location::LocationMatcher;
pub use service::ChatService;
pub use stream::{ChatStream, StreamEvent};
pub use types::{ChatOutcome, ChatRequest};
