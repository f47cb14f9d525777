//! Query-driven event ranking.
//!
//! `KeywordRanker` is the shipped ranker: it expands query words through
//! a semantic synonym table, scores each event on weighted field matches,
//! and returns the top matches. Generic browse queries ("events",
//! "nearby events") bypass scoring and return a category-diverse slice
//! instead.

use std::collections::{BTreeSet, HashSet};

use tracing::info;

use citypulse_core::types::{Event, PreferenceSet, ScoredEvent};

/// Ranks a fetched event list against a free-text query.
///
/// `preferences` is optional context; a ranker may use it to widen the
/// query when the message itself is sparse.
pub trait EventRanker: Send + Sync {
    fn rank(
        &self,
        query: &str,
        events: &[Event],
        preferences: Option<&PreferenceSet>,
    ) -> Vec<ScoredEvent>;
}

/// Queries treated as generic browsing rather than a concrete interest.
const GENERIC_QUERIES: &[&str] = &[
    "events",
    "nearby events",
    "local events",
    "what events",
    "show me events",
];

/// Synonym table used to widen sparse queries before matching.
const SEMANTIC_EXPANSIONS: &[(&str, &[&str])] = &[
    (
        "events",
        &[
            "event", "show", "concert", "performance", "festival", "conference", "meeting",
            "gathering", "celebration", "party", "exhibition", "fair", "market", "workshop",
            "seminar", "talk", "presentation",
        ],
    ),
    (
        "nearby",
        &["local", "close", "near", "around", "in the area", "this area", "here"],
    ),
    (
        "entertainment",
        &[
            "fun", "exciting", "enjoyable", "amusing", "lively", "music", "art", "show",
            "concert", "performance", "comedy", "theater",
        ],
    ),
    (
        "fun",
        &["entertainment", "exciting", "enjoyable", "amusing", "lively", "party", "celebration", "festival"],
    ),
    (
        "music",
        &["concert", "band", "singer", "musical", "live music", "jazz", "rock", "pop", "classical", "acoustic"],
    ),
    (
        "art",
        &["artistic", "gallery", "exhibition", "creative", "visual", "painting", "sculpture", "museum"],
    ),
    (
        "food",
        &["restaurant", "dining", "cuisine", "meal", "culinary", "wine", "tasting", "cooking", "chef"],
    ),
    ("free", &["complimentary", "no cost", "gratis", "zero cost", "ticket", "admission"]),
    ("romantic", &["intimate", "couple", "date", "dinner", "wine", "valentine", "love"]),
    ("family", &["kids", "children", "family-friendly", "all ages", "parent", "child"]),
    ("night", &["evening", "nighttime", "late", "after dark", "sunset"]),
    ("weekend", &["saturday", "sunday", "weekend"]),
    (
        "business",
        &["professional", "networking", "corporate", "meeting", "conference", "tech"],
    ),
    (
        "sports",
        &["athletic", "fitness", "game", "match", "tournament", "running", "cycling"],
    ),
    (
        "culture",
        &["cultural", "heritage", "tradition", "community", "local", "history"],
    ),
];

pub struct KeywordRanker {
    max_results: usize,
}

impl Default for KeywordRanker {
    fn default() -> Self {
        Self { max_results: 5 }
    }
}

impl KeywordRanker {
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results: max_results.max(1),
        }
    }

    fn expand_query(query: &str) -> HashSet<String> {
        let mut expanded: HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.to_string())
            .collect();

        for word in expanded.clone() {
            if let Some((_, synonyms)) = SEMANTIC_EXPANSIONS.iter().find(|(k, _)| *k == word) {
                expanded.extend(synonyms.iter().map(|s| s.to_string()));
            }
        }
        expanded
    }

    fn score_event(event: &Event, keywords: &HashSet<String>) -> f64 {
        let title = event.title.to_lowercase();
        let venue = event.venue_name.to_lowercase();
        let categories = event.categories.join(" ").to_lowercase();
        let full_text = format!("{} {} {}", title, event.description.to_lowercase(), categories);

        let mut score = 0.0;
        for word in keywords {
            if full_text.contains(word.as_str()) {
                score += 1.0;
            }
            // Field matches weigh heavier than body text.
            if title.contains(word.as_str()) {
                score += 3.0;
            }
            if venue.contains(word.as_str()) {
                score += 2.0;
            }
            if categories.contains(word.as_str()) {
                score += 2.0;
            }
        }
        score
    }

    /// A category-diverse slice for generic browse queries: one event per
    /// distinct category signature where possible, filled from the head
    /// of the list.
    fn diverse_slice(&self, events: &[Event]) -> Vec<ScoredEvent> {
        let mut picked: Vec<ScoredEvent> = Vec::new();
        let mut seen_signatures: HashSet<BTreeSet<&str>> = HashSet::new();

        for event in events {
            if picked.len() >= self.max_results {
                break;
            }
            let signature: BTreeSet<&str> =
                event.categories.iter().take(3).map(|c| c.as_str()).collect();
            if !seen_signatures.contains(&signature) || picked.len() < 3 {
                seen_signatures.insert(signature);
                picked.push(ScoredEvent {
                    event: event.clone(),
                    relevance_score: 5.0,
                });
            }
        }

        // Backfill from the head when diversity left slots open.
        for event in events {
            if picked.len() >= self.max_results {
                break;
            }
            if !picked.iter().any(|p| p.event.event_id == event.event_id) {
                picked.push(ScoredEvent {
                    event: event.clone(),
                    relevance_score: 3.0,
                });
            }
        }

        picked
    }
}

impl EventRanker for KeywordRanker {
    fn rank(
        &self,
        query: &str,
        events: &[Event],
        preferences: Option<&PreferenceSet>,
    ) -> Vec<ScoredEvent> {
        if events.is_empty() {
            return Vec::new();
        }

        let normalized = query.trim().to_lowercase();
        if GENERIC_QUERIES.contains(&normalized.as_str()) {
            info!("Generic browse query, returning diverse results");
            return self.diverse_slice(events);
        }

        let mut keywords = Self::expand_query(&normalized);
        // A known event type widens sparse follow-ups ("this weekend?").
        if let Some(event_type) = preferences.and_then(|p| p.event_type.as_deref()) {
            keywords.extend(Self::expand_query(&event_type.to_lowercase()));
        }
        info!("Keyword search using {} expanded terms", keywords.len());

        let mut scored: Vec<ScoredEvent> = events
            .iter()
            .filter_map(|event| {
                let score = Self::score_event(event, &keywords);
                (score > 0.0).then(|| ScoredEvent {
                    event: event.clone(),
                    relevance_score: score,
                })
            })
            .collect();

        // Stable sort keeps provider order for ties.
        scored.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.max_results);
        scored
    }
}
