//! Provider aggregation.
//!
//! The aggregator holds an explicit registry of providers and fans a
//! city fetch out across those that support the city. One provider
//! failing (or timing out) never sinks the fetch; its events are simply
//! missing from the combined list.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use citypulse_core::types::Event;

use crate::error::EventsError;
use crate::provider::EventProvider;

pub struct EventAggregator {
    providers: Vec<Arc<dyn EventProvider>>,
    max_pages: u32,
    max_results: usize,
    fetch_timeout: Duration,
}

impl EventAggregator {
    /// `max_results` caps the combined list; zero means unlimited.
    pub fn new(max_pages: u32, max_results: usize, fetch_timeout: Duration) -> Self {
        Self {
            providers: Vec::new(),
            max_pages,
            max_results,
            fetch_timeout,
        }
    }

    /// Register a provider. Providers are queried in registration order.
    pub fn register(&mut self, provider: Arc<dyn EventProvider>) {
        info!("Registered event provider '{}'", provider.name());
        self.providers.push(provider);
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Fetch events for a city from every supporting provider.
    ///
    /// Returns the combined list, deduplicated by `event_id` and capped
    /// at `max_results` when that is nonzero. Returns an error only when
    /// no provider supports the city at all; individual provider failures
    /// (including timeouts) are logged and skipped.
    pub async fn fetch_events(&self, city: &str) -> Result<Vec<Event>, EventsError> {
        let supporting: Vec<_> = self
            .providers
            .iter()
            .filter(|p| p.supports_city(city))
            .collect();

        if supporting.is_empty() {
            return Err(EventsError::UnsupportedCity(city.to_string()));
        }

        let mut combined: Vec<Event> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for provider in supporting {
            let fetched =
                tokio::time::timeout(self.fetch_timeout, provider.fetch_events(city, self.max_pages))
                    .await
                    .unwrap_or_else(|_| Err(EventsError::Timeout(self.fetch_timeout.as_secs())));
            match fetched {
                Ok(events) => {
                    info!(
                        "Provider '{}' returned {} events for {}",
                        provider.name(),
                        events.len(),
                        city
                    );
                    for event in events {
                        if seen.insert(event.event_id.clone()) {
                            combined.push(event);
                        }
                    }
                }
                Err(e) => {
                    warn!("Provider '{}' failed for {}: {}", provider.name(), city, e);
                }
            }
        }

        if self.max_results > 0 {
            combined.truncate(self.max_results);
        }
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DemoEventProvider;
    use async_trait::async_trait;

    struct FailingProvider;

    #[async_trait]
    impl EventProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        fn supports_city(&self, _city: &str) -> bool {
            true
        }
        async fn fetch_events(&self, _city: &str, _max_pages: u32) -> Result<Vec<Event>, EventsError> {
            Err(EventsError::Provider("upstream 503".to_string()))
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl EventProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }
        fn supports_city(&self, _city: &str) -> bool {
            true
        }
        async fn fetch_events(&self, _city: &str, _max_pages: u32) -> Result<Vec<Event>, EventsError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    struct SingleEventProvider {
        id: &'static str,
    }

    #[async_trait]
    impl EventProvider for SingleEventProvider {
        fn name(&self) -> &str {
            "single"
        }
        fn supports_city(&self, _city: &str) -> bool {
            true
        }
        async fn fetch_events(&self, _city: &str, _max_pages: u32) -> Result<Vec<Event>, EventsError> {
            Ok(vec![Event {
                event_id: self.id.to_string(),
                title: "One".to_string(),
                ..Event::default()
            }])
        }
    }

    fn aggregator() -> EventAggregator {
        EventAggregator::new(3, 0, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_no_supporting_provider_is_an_error() {
        let agg = aggregator();
        assert!(matches!(
            agg.fetch_events("boston").await,
            Err(EventsError::UnsupportedCity(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_provider_does_not_sink_fetch() {
        let mut agg = aggregator();
        agg.register(Arc::new(FailingProvider));
        agg.register(Arc::new(DemoEventProvider));

        let events = agg.fetch_events("boston").await.unwrap();
        assert_eq!(events.len(), 8);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_and_is_skipped() {
        let mut agg = aggregator();
        agg.register(Arc::new(SlowProvider));
        agg.register(Arc::new(DemoEventProvider));

        let events = agg.fetch_events("boston").await.unwrap();
        assert_eq!(events.len(), 8);
    }

    #[tokio::test]
    async fn test_all_providers_failing_yields_empty_list() {
        let mut agg = aggregator();
        agg.register(Arc::new(FailingProvider));

        let events = agg.fetch_events("boston").await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_max_results_caps_combined_list() {
        let mut agg = EventAggregator::new(3, 5, Duration::from_millis(200));
        agg.register(Arc::new(DemoEventProvider));

        // The demo provider returns 8 events per city.
        let events = agg.fetch_events("boston").await.unwrap();
        assert_eq!(events.len(), 5);
    }

    #[tokio::test]
    async fn test_zero_max_results_means_unlimited() {
        let mut agg = aggregator();
        agg.register(Arc::new(DemoEventProvider));

        let events = agg.fetch_events("boston").await.unwrap();
        assert_eq!(events.len(), 8);
    }

    #[tokio::test]
    async fn test_duplicate_event_ids_are_collapsed() {
        let mut agg = aggregator();
        agg.register(Arc::new(SingleEventProvider { id: "evt-1" }));
        agg.register(Arc::new(SingleEventProvider { id: "evt-1" }));
        agg.register(Arc::new(SingleEventProvider { id: "evt-2" }));

        let events = agg.fetch_events("boston").await.unwrap();
        assert_eq!(events.len(), 2);
    }
}
