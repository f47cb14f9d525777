//! City name recognition.
//!
//! Maps free-text mentions of cities, boroughs, and common abbreviations
//! to canonical lowercase city names. Neighborhood and borough mentions
//! resolve to their parent city ("brooklyn" -> "new york").

use std::sync::LazyLock;

use regex::Regex;

/// Ordered (pattern, canonical city) pairs. Longer phrases come before
/// their substrings so "new york city" wins over "new york".
static CITY_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let table: &[(&str, &str)] = &[
        (r"\bbrooklyn\b", "new york"),
        (r"\bmanhattan\b", "new york"),
        (r"\bqueens\b", "new york"),
        (r"\bbronx\b", "new york"),
        (r"\bnyc\b", "new york"),
        (r"\bnew york city\b", "new york"),
        (r"\bnew york\b", "new york"),
        (r"\blos angeles\b", "los angeles"),
        (r"\bla\b", "los angeles"),
        (r"\bsan francisco\b", "san francisco"),
        (r"\bsf\b", "san francisco"),
        (r"\bbay area\b", "san francisco"),
        (r"\bchicago\b", "chicago"),
        (r"\bboston\b", "boston"),
        (r"\bseattle\b", "seattle"),
        (r"\bmiami\b", "miami"),
        (r"\baustin\b", "austin"),
        (r"\bdenver\b", "denver"),
        (r"\bportland\b", "portland"),
        (r"\bphoenix\b", "phoenix"),
        (r"\blas vegas\b", "las vegas"),
        (r"\bvegas\b", "las vegas"),
        (r"\batlanta\b", "atlanta"),
        (r"\bphiladelphia\b", "philadelphia"),
        (r"\bphilly\b", "philadelphia"),
    ];
    table
        .iter()
        .map(|(pattern, city)| {
            (
                Regex::new(pattern).expect("Invalid city pattern"),
                *city,
            )
        })
        .collect()
});

/// Matches known city mentions in free text.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocationMatcher;

impl LocationMatcher {
    /// First known city mentioned in the query, canonical lowercase form.
    pub fn extract_city(&self, query: &str) -> Option<String> {
        let query_lower = query.to_lowercase();
        CITY_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.is_match(&query_lower))
            .map(|(_, city)| city.to_string())
    }
}
