//! Preference extraction from natural language.
//!
//! `PatternExtractor` is the shipped implementation: regex matching over
//! the current message, falling back to recent user messages in the
//! conversation window for fields the message itself does not mention.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use citypulse_core::types::{HistoryMessage, PreferenceSet, Role};

use crate::location::LocationMatcher;

/// Extracts a user's event preferences from a message plus recent context.
#[async_trait]
pub trait PreferenceExtractor: Send + Sync {
    /// Extract preferences from the message, consulting the history
    /// window for fields the message leaves unspecified.
    async fn extract_preferences(
        &self,
        message: &str,
        history: &[HistoryMessage],
    ) -> PreferenceSet;

    /// Extract only a city mention from a single query.
    fn extract_location(&self, query: &str) -> Option<String>;
}

static DATE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let table: &[(&str, &str)] = &[
        (r"\btoday\b", "today"),
        (r"\btonight\b", "today"),
        (r"\btomorrow\b", "tomorrow"),
        (r"\bthis weekend\b", "this weekend"),
        (r"\bnext weekend\b", "next weekend"),
        (r"\bthis week\b", "this week"),
        (r"\bnext week\b", "next week"),
        (r"\bmonday\b", "monday"),
        (r"\btuesday\b", "tuesday"),
        (r"\bwednesday\b", "wednesday"),
        (r"\bthursday\b", "thursday"),
        (r"\bfriday\b", "friday"),
        (r"\bsaturday\b", "saturday"),
        (r"\bsunday\b", "sunday"),
    ];
    table
        .iter()
        .map(|(p, v)| (Regex::new(p).expect("Invalid date pattern"), *v))
        .collect()
});

static TIME_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let table: &[(&str, &str)] = &[
        (r"\bmorning\b", "morning"),
        (r"\bafternoon\b", "afternoon"),
        (r"\bevening\b", "evening"),
        (r"\bnight\b", "night"),
        (r"\blunch\b", "lunch time"),
        (r"\bdinner\b", "dinner time"),
    ];
    table
        .iter()
        .map(|(p, v)| (Regex::new(p).expect("Invalid time pattern"), *v))
        .collect()
});

/// Clock times like "7pm" or "2:30"; bare numbers without a colon or
/// meridiem are not treated as times.
static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}:\d{2}(?:\s*(?:am|pm))?|\d{1,2}\s*(?:am|pm))\b").expect("Invalid clock pattern"));

static EVENT_TYPE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let table: &[(&str, &str)] = &[
        (r"\bmusic\b|\bconcerts?\b|\bjazz\b", "music"),
        (r"\bfood\b|\brestaurants?\b|\bdining\b|\bcuisine\b", "food"),
        (r"\bart\b|\bgallery\b|\bexhibition\b|\bmuseum\b", "art"),
        (r"\bsports\b|\bfitness\b|\bgym\b|\bworkout\b", "sports"),
        (r"\bnetworking\b|\bbusiness\b|\bprofessional\b", "networking"),
        (r"\bcomedy\b|\bstandup\b|\bfunny\b", "comedy"),
        (r"\btheater\b|\bplay\b|\bshows?\b", "theater"),
        (r"\bfestivals?\b|\bfair\b|\bmarket\b", "festival"),
        (r"\bparty\b|\bcelebration\b|\bclub\b", "party"),
    ];
    table
        .iter()
        .map(|(p, v)| (Regex::new(p).expect("Invalid event type pattern"), *v))
        .collect()
});

fn match_first(patterns: &[(Regex, &'static str)], text: &str) -> Option<String> {
    patterns
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, value)| value.to_string())
}

/// Regex-based preference extractor.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternExtractor {
    locations: LocationMatcher,
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_date(text: &str) -> Option<String> {
        match_first(&DATE_PATTERNS, text)
    }

    fn extract_time(text: &str) -> Option<String> {
        match_first(&TIME_PATTERNS, text).or_else(|| {
            CLOCK_TIME
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
    }

    fn extract_event_type(text: &str) -> Option<String> {
        match_first(&EVENT_TYPE_PATTERNS, text)
    }

    fn extract_from_text(&self, text: &str) -> PreferenceSet {
        let lower = text.to_lowercase();
        PreferenceSet {
            location: self.locations.extract_city(&lower),
            date: Self::extract_date(&lower),
            time: Self::extract_time(&lower),
            event_type: Self::extract_event_type(&lower),
        }
    }
}

#[async_trait]
impl PreferenceExtractor for PatternExtractor {
    async fn extract_preferences(
        &self,
        message: &str,
        history: &[HistoryMessage],
    ) -> PreferenceSet {
        let mut prefs = self.extract_from_text(message);

        // Fields the message did not mention fall back to the most recent
        // user message in the window that mentions them.
        for msg in history.iter().rev() {
            if prefs.is_complete() && prefs.date.is_some() && prefs.time.is_some() {
                break;
            }
            if msg.role != Role::User {
                continue;
            }
            let earlier = self.extract_from_text(&msg.content);
            prefs.fill_gaps_from(&earlier);
        }

        prefs
    }

    fn extract_location(&self, query: &str) -> Option<String> {
        self.locations.extract_city(&query.to_lowercase())
    }
}
