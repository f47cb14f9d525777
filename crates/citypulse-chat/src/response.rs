//! Reply composition.
//!
//! Builds the conversational reply text, the per-event recommendations
//! with cache provenance, and the one-line extraction summary shown
//! above the results.

use citypulse_core::types::{PreferenceSet, Recommendation, RecommendationSource, ScoredEvent};

/// Title-case a city for display ("new york" -> "New York").
pub fn title_case(city: &str) -> String {
    city.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The conversational reply for a completed search.
///
/// When the city was a fallback rather than user-provided, the reply
/// discloses that.
pub fn compose_response(city: &str, result_count: usize, location_provided: bool) -> String {
    let display = title_case(city);
    let location_note = if location_provided {
        String::new()
    } else {
        format!(
            " (I couldn't determine your location, so I'm defaulting to {})",
            display
        )
    };

    if result_count > 0 {
        format!(
            "🎉 Found {} events in {} that match your search!{} Check out the recommendations below ↓",
            result_count, display, location_note
        )
    } else {
        format!(
            "😔 I couldn't find any events in {} matching your query.{} Try asking about 'fashion events', 'music concerts', 'halloween parties', or 'free events'.",
            display, location_note
        )
    }
}

/// One-line summary of what was understood from the user's messages.
pub fn build_extraction_summary(prefs: &PreferenceSet) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(location) = &prefs.location {
        parts.push(format!("📍 {}", location));
    }
    if let Some(date) = &prefs.date {
        parts.push(format!("📅 {}", date));
    }
    if let Some(time) = &prefs.time {
        parts.push(format!("🕐 {}", time));
    }
    if let Some(event_type) = &prefs.event_type {
        parts.push(format!("🎭 {}", event_type));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" • "))
    }
}

/// Wrap ranked events as recommendations, stamping cache provenance.
pub fn format_recommendations(
    city: &str,
    ranked: &[ScoredEvent],
    cache_used: bool,
) -> Vec<Recommendation> {
    let display = title_case(city);
    let source = if cache_used {
        RecommendationSource::Cached
    } else {
        RecommendationSource::Realtime
    };

    ranked
        .iter()
        .map(|scored| Recommendation {
            event: scored.event.clone(),
            relevance_score: scored.relevance_score,
            explanation: format!("Event in {}: {}", display, scored.event.title),
            source,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use citypulse_core::types::Event;

    fn scored(title: &str, score: f64) -> ScoredEvent {
        ScoredEvent {
            event: Event {
                event_id: title.to_lowercase().replace(' ', "-"),
                title: title.to_string(),
                ..Event::default()
            },
            relevance_score: score,
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("new york"), "New York");
        assert_eq!(title_case("boston"), "Boston");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_response_with_results() {
        let reply = compose_response("san francisco", 5, true);
        assert!(reply.contains("Found 5 events in San Francisco"));
        assert!(!reply.contains("defaulting"));
    }

    #[test]
    fn test_response_discloses_fallback_city() {
        let reply = compose_response("new york", 3, false);
        assert!(reply.contains("defaulting to New York"));
    }

    #[test]
    fn test_response_without_results() {
        let reply = compose_response("boston", 0, true);
        assert!(reply.contains("couldn't find any events in Boston"));
    }

    #[test]
    fn test_extraction_summary_joins_known_fields() {
        let prefs = PreferenceSet {
            location: Some("boston".to_string()),
            date: Some("this weekend".to_string()),
            time: None,
            event_type: Some("music".to_string()),
        };
        let summary = build_extraction_summary(&prefs).unwrap();
        assert_eq!(summary, "📍 boston • 📅 this weekend • 🎭 music");
    }

    #[test]
    fn test_extraction_summary_empty_preferences() {
        assert!(build_extraction_summary(&PreferenceSet::default()).is_none());
    }

    #[test]
    fn test_recommendations_carry_provenance_and_explanation() {
        let ranked = vec![scored("Jazz Night", 9.0), scored("Art Walk", 4.0)];

        let cached = format_recommendations("new york", &ranked, true);
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].source, RecommendationSource::Cached);
        assert_eq!(cached[0].explanation, "Event in New York: Jazz Night");
        assert_eq!(cached[0].relevance_score, 9.0);

        let fresh = format_recommendations("new york", &ranked, false);
        assert_eq!(fresh[1].source, RecommendationSource::Realtime);
    }
}
