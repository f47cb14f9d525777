//! Event providers.
//!
//! A provider fetches raw events for a city from one upstream source.
//! `DemoEventProvider` is the shipped implementation; it serves a fixed
//! spread of city-templated events so the rest of the pipeline can run
//! without upstream credentials.

use async_trait::async_trait;

use citypulse_core::types::Event;

use crate::error::EventsError;

/// One upstream source of events.
#[async_trait]
pub trait EventProvider: Send + Sync {
    /// Stable provider name, recorded as each event's `source`.
    fn name(&self) -> &str;

    /// Whether this provider can serve the given city at all.
    fn supports_city(&self, city: &str) -> bool;

    /// Fetch up to `max_pages` pages of events for a city.
    async fn fetch_events(&self, city: &str, max_pages: u32) -> Result<Vec<Event>, EventsError>;
}

/// Built-in provider serving a diverse fixed set of events per city.
#[derive(Debug, Default)]
pub struct DemoEventProvider;

/// Template for one generated demo event.
struct EventTemplate {
    title: &'static str,
    description: &'static str,
    venue: &'static str,
    organizer: &'static str,
    start: &'static str,
    end: &'static str,
    min_price: &'static str,
    max_price: &'static str,
    is_free: bool,
    categories: &'static [&'static str],
    slug: &'static str,
}

const TEMPLATES: &[EventTemplate] = &[
    EventTemplate {
        title: "Jazz Night at {city} Jazz Club",
        description: "Live jazz performance featuring local artists in {city}",
        venue: "{city} Jazz Club",
        organizer: "{city} Jazz Society",
        start: "2025-01-20T20:00:00",
        end: "2025-01-20T23:00:00",
        min_price: "25.00",
        max_price: "45.00",
        is_free: false,
        categories: &["Music", "Jazz", "Live Performance"],
        slug: "jazz-night",
    },
    EventTemplate {
        title: "Art Gallery Opening in {city}",
        description: "Contemporary art exhibition opening reception in {city}",
        venue: "{city} Modern Art Gallery",
        organizer: "{city} Art Foundation",
        start: "2025-01-21T18:00:00",
        end: "2025-01-21T21:00:00",
        min_price: "Free",
        max_price: "Free",
        is_free: true,
        categories: &["Art", "Exhibition", "Culture"],
        slug: "art-gallery-opening",
    },
    EventTemplate {
        title: "Tech Meetup: AI & Machine Learning in {city}",
        description: "Networking event for tech professionals in {city}",
        venue: "{city} Tech Hub",
        organizer: "{city} Tech Community",
        start: "2025-01-22T19:00:00",
        end: "2025-01-22T22:00:00",
        min_price: "15.00",
        max_price: "25.00",
        is_free: false,
        categories: &["Technology", "Networking", "Professional"],
        slug: "tech-meetup-ai-ml",
    },
    EventTemplate {
        title: "Romantic Dinner & Wine Tasting in {city}",
        description: "Intimate dinner with wine pairings in {city}",
        venue: "{city} Vineyard Restaurant",
        organizer: "{city} Wine Society",
        start: "2025-01-23T19:30:00",
        end: "2025-01-23T22:30:00",
        min_price: "85.00",
        max_price: "120.00",
        is_free: false,
        categories: &["Food", "Wine", "Romantic"],
        slug: "romantic-dinner-wine-tasting",
    },
    EventTemplate {
        title: "Family Fun Day in {city}",
        description: "Activities for kids and families in {city}",
        venue: "{city} Community Center",
        organizer: "{city} Parks & Recreation",
        start: "2025-01-24T10:00:00",
        end: "2025-01-24T16:00:00",
        min_price: "Free",
        max_price: "Free",
        is_free: true,
        categories: &["Family", "Kids", "Activities"],
        slug: "family-fun-day",
    },
    EventTemplate {
        title: "Comedy Night in {city}",
        description: "Stand-up comedy show with local comedians in {city}",
        venue: "{city} Laugh Track Comedy Club",
        organizer: "{city} Comedy Club",
        start: "2025-01-25T20:30:00",
        end: "2025-01-25T23:00:00",
        min_price: "20.00",
        max_price: "35.00",
        is_free: false,
        categories: &["Comedy", "Entertainment", "Nightlife"],
        slug: "comedy-night",
    },
    EventTemplate {
        title: "Yoga Workshop in {city}",
        description: "Beginner-friendly yoga session in {city}",
        venue: "{city} Zen Studio",
        organizer: "{city} Yoga Center",
        start: "2025-01-26T09:00:00",
        end: "2025-01-26T11:00:00",
        min_price: "30.00",
        max_price: "45.00",
        is_free: false,
        categories: &["Health", "Fitness", "Wellness"],
        slug: "yoga-workshop",
    },
    EventTemplate {
        title: "Book Reading in {city}",
        description: "Author reading and book signing in {city}",
        venue: "{city} Local Bookstore",
        organizer: "{city} Book Club",
        start: "2025-01-27T15:00:00",
        end: "2025-01-27T17:00:00",
        min_price: "Free",
        max_price: "Free",
        is_free: true,
        categories: &["Literature", "Books", "Education"],
        slug: "book-reading",
    },
];

/// Title-case a city name for display ("san francisco" -> "San Francisco").
fn display_city(city: &str) -> String {
    city.replace('_', " ")
        .split_whitespace()
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

impl DemoEventProvider {
    fn render(&self, template: &EventTemplate, city: &str, index: usize) -> Event {
        let display = display_city(city);
        let slug_city = city.trim().to_lowercase().replace(' ', "-");
        let fill = |text: &str| text.replace("{city}", &display);

        Event {
            event_id: format!("demo-{}-{}", template.slug, index),
            title: fill(template.title),
            description: fill(template.description),
            start_datetime: template.start.to_string(),
            end_datetime: template.end.to_string(),
            timezone: "America/Los_Angeles".to_string(),
            venue_name: fill(template.venue),
            venue_city: display.clone(),
            venue_country: "US".to_string(),
            latitude: 37.7749,
            longitude: -122.4194,
            organizer_name: fill(template.organizer),
            ticket_min_price: template.min_price.to_string(),
            ticket_max_price: template.max_price.to_string(),
            is_free: template.is_free,
            categories: template.categories.iter().map(|c| c.to_string()).collect(),
            image_url: format!("https://example.com/{}.jpg", template.slug),
            event_url: format!("https://demo.eventbrite.com/e/{}-{}-demo", template.slug, slug_city),
            attendee_count: 0,
            source: self.name().to_string(),
        }
    }
}

#[async_trait]
impl EventProvider for DemoEventProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn supports_city(&self, city: &str) -> bool {
        !city.trim().is_empty()
    }

    async fn fetch_events(&self, city: &str, _max_pages: u32) -> Result<Vec<Event>, EventsError> {
        if !self.supports_city(city) {
            return Err(EventsError::UnsupportedCity(city.to_string()));
        }
        Ok(TEMPLATES
            .iter()
            .enumerate()
            .map(|(i, t)| self.render(t, city, i))
            .collect())
    }
}
