//! CityPulse cache crate - TTL-bounded, three-tier event cache.
//!
//! Serves per-city event lists across an in-process memory tier, a local
//! disk tier (one JSON file per city), and a pluggable remote document
//! tier. Reads fall through the tiers in latency order and eagerly
//! promote hits into shallower tiers; a degraded tier is treated as
//! absent, never as an error.

pub mod entry;
pub mod error;
pub mod remote;
pub mod store;

pub use entry::CacheEntry;
pub use error::CacheError;
pub use remote::{RemoteTier, SqliteRemoteTier};
pub use store::{CacheStats, CacheStore, TierStats};
