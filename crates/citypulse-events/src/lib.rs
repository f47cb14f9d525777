//! CityPulse events crate - providers, aggregation, and ranking.
//!
//! `EventProvider` implementations fetch raw per-city event lists;
//! `EventAggregator` fans a fetch out across registered providers with
//! per-provider failure isolation; `EventRanker` scores a fetched list
//! against a user query.

pub mod aggregator;
pub mod error;
pub mod provider;
pub mod ranker;

pub use aggregator::EventAggregator;
pub use error::EventsError;
pub use provider::{DemoEventProvider, EventProvider};
pub use ranker::{EventRanker, KeywordRanker};
