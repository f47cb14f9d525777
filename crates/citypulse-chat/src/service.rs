//! Chat orchestrator: coordinates extraction, cache, providers, ranking,
//! usage tracking, and conversation persistence for one chat turn.
//!
//! Both the one-shot and the streaming entry points run the same
//! resolution pipeline; they differ only in how the search phase is
//! delivered.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use citypulse_cache::CacheStore;
use citypulse_core::config::ChatConfig;
use citypulse_core::types::{
    ConversationTurn, Event, PreferenceSet, Role, ScoredEvent, UsageStats,
};
use citypulse_events::{EventAggregator, EventRanker};
use citypulse_store::{ConversationStore, UsageTracker};

use crate::context::{lookup_stored_preferences, merge_history, StoredPreferences};
use crate::error::ChatError;
use crate::extract::PreferenceExtractor;
use crate::response;
use crate::types::{ChatOutcome, ChatRequest};

/// Maximum message length in characters.
const MAX_MESSAGE_LENGTH: usize = 2000;

/// Prefix marking anonymous (trial-gated) user ids.
const ANONYMOUS_PREFIX: &str = "user_";

/// Conversation id reported when the trial gate blocks a turn before a
/// conversation exists.
const TRIAL_GATE_CONVERSATION_ID: &str = "temp";

/// How a chat turn resolved before the search phase.
pub(crate) enum Resolution {
    /// The turn is already answered (trial gate or clarification).
    Reply(ChatOutcome),
    /// The turn proceeds to fetch-and-rank.
    Search(SearchPlan),
}

/// Everything the search phase needs, resolved from the request.
pub(crate) struct SearchPlan {
    pub user_id: String,
    pub conversation_id: String,
    pub city: String,
    pub location_provided: bool,
    pub preferences: PreferenceSet,
    pub usage_stats: Option<UsageStats>,
    pub query: String,
    pub is_initial: bool,
}

pub struct ChatService {
    cache: Arc<CacheStore>,
    aggregator: Arc<EventAggregator>,
    ranker: Arc<dyn EventRanker>,
    extractor: Arc<dyn PreferenceExtractor>,
    usage: Arc<dyn UsageTracker>,
    conversations: Arc<dyn ConversationStore>,
    config: ChatConfig,
}

impl ChatService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Arc<CacheStore>,
        aggregator: Arc<EventAggregator>,
        ranker: Arc<dyn EventRanker>,
        extractor: Arc<dyn PreferenceExtractor>,
        usage: Arc<dyn UsageTracker>,
        conversations: Arc<dyn ConversationStore>,
        config: ChatConfig,
    ) -> Self {
        Self {
            cache,
            aggregator,
            ranker,
            extractor,
            usage,
            conversations,
            config,
        }
    }

    pub(crate) fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Handle one chat turn end to end.
    pub async fn handle_chat(&self, request: &ChatRequest) -> Result<ChatOutcome, ChatError> {
        match self.resolve(request).await? {
            Resolution::Reply(outcome) => Ok(outcome),
            Resolution::Search(plan) => self.execute_search(plan).await,
        }
    }

    /// Run the pre-search pipeline: validation, trial gate, extraction,
    /// city resolution, and clarification gates.
    pub(crate) async fn resolve(&self, request: &ChatRequest) -> Result<Resolution, ChatError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.len() > MAX_MESSAGE_LENGTH {
            return Err(ChatError::MessageTooLong(MAX_MESSAGE_LENGTH));
        }

        // Anonymous users pass through the trial gate; registered ids
        // are not counted.
        let mut usage_stats = None;
        if request.user_id.starts_with(ANONYMOUS_PREFIX) {
            if self.usage.check_trial_limit(&request.user_id)? {
                let reply = format!(
                    "🔒 You've reached your free trial limit of {} interactions! \
                     Please register to continue using our service and keep your \
                     conversation history.",
                    self.config.trial_limit
                );
                let mut outcome = ChatOutcome::message_only(
                    reply,
                    TRIAL_GATE_CONVERSATION_ID,
                    None,
                    Some(self.usage.get_usage(&request.user_id)?),
                );
                outcome.trial_exceeded = true;
                return Ok(Resolution::Reply(outcome));
            }
            usage_stats = Some(self.usage.increment_usage(&request.user_id)?);
        }

        let conversation_id = match &request.conversation_id {
            Some(id) => id.clone(),
            None => self
                .conversations
                .create(&request.user_id, serde_json::Map::new())?,
        };

        let (stored, stored_history) = self.load_context(&request.user_id, &conversation_id);
        let window = merge_history(
            stored_history,
            &request.conversation_history,
            self.config.history_window,
        );

        let mut preferences = self.extractor.extract_preferences(message, &window).await;
        preferences.fill_gaps_from(&PreferenceSet {
            location: None,
            date: stored.date.clone(),
            time: stored.time.clone(),
            event_type: stored.event_type.clone(),
        });

        // The most recent user mention of a city wins over anything the
        // extractor or stored preferences produced.
        if let Some(city) = self.latest_city_mention(message, &window) {
            preferences.location = Some(city);
        } else if preferences.location.is_none() {
            preferences.location = stored.location.clone();
        }

        info!(
            "Resolved preferences for conversation {}: {:?}",
            conversation_id, preferences
        );

        let mut user_turn = ConversationTurn::new(Role::User, message);
        user_turn.extracted_preferences = Some(preferences.clone());
        self.conversations
            .save_turn(&request.user_id, &conversation_id, &user_turn)?;

        // Location gate.
        let (city, location_provided) = match &preferences.location {
            Some(location) => (location.to_lowercase(), true),
            None => {
                if request.is_initial_response || !self.config.allow_location_fallback {
                    let prompt = if request.is_initial_response {
                        "I'd be happy to help you find events! To give you the best \
                         recommendations, could you please tell me which city or area \
                         you're interested in? (e.g., 'New York', 'Los Angeles', \
                         'Chicago', or a zipcode)"
                    } else {
                        "I need to know which city you're interested in. Could you \
                         please tell me the city or area?"
                    };
                    return Ok(Resolution::Reply(ChatOutcome::message_only(
                        prompt,
                        conversation_id,
                        Some(preferences),
                        usage_stats,
                    )));
                }
                info!("No city found, defaulting to {}", self.config.fallback_city);
                (self.config.fallback_city.to_lowercase(), false)
            }
        };

        // Event-type gate.
        if preferences.event_type.is_none() {
            let prompt = if request.is_initial_response {
                "Great! What kind of events are you interested in?"
            } else {
                "What kind of events are you interested in?"
            };
            if request.is_initial_response {
                let mut assistant_turn = ConversationTurn::new(Role::Assistant, prompt);
                assistant_turn.extracted_preferences = Some(preferences.clone());
                assistant_turn.recommendations = Some(Vec::new());
                self.conversations
                    .save_turn(&request.user_id, &conversation_id, &assistant_turn)?;
            }
            return Ok(Resolution::Reply(ChatOutcome::message_only(
                prompt,
                conversation_id,
                Some(preferences),
                usage_stats,
            )));
        }

        Ok(Resolution::Search(SearchPlan {
            user_id: request.user_id.clone(),
            conversation_id,
            city,
            location_provided,
            preferences,
            usage_stats,
            query: message.to_string(),
            is_initial: request.is_initial_response,
        }))
    }

    /// Fetch, rank, compose, and persist the assistant reply.
    pub(crate) async fn execute_search(&self, plan: SearchPlan) -> Result<ChatOutcome, ChatError> {
        let (events, cache_used, cache_age_hours) = self.fetch_events(&plan.city).await;
        let ranked = self
            .rank_events(&plan.query, &plan.preferences, &events)
            .await;

        let recommendations = response::format_recommendations(&plan.city, &ranked, cache_used);
        let message = response::compose_response(&plan.city, ranked.len(), plan.location_provided);
        let extraction_summary = response::build_extraction_summary(&plan.preferences);

        self.persist_assistant_turn(&plan, &message, &recommendations, cache_used, cache_age_hours)?;

        Ok(ChatOutcome {
            message,
            recommendations,
            cache_used,
            cache_age_hours,
            extracted_preferences: Some(plan.preferences),
            extraction_summary,
            usage_stats: plan.usage_stats,
            trial_exceeded: false,
            conversation_id: plan.conversation_id,
        })
    }

    /// Serve events for a city through the cache: a valid cached entry
    /// wins; on miss the providers are queried and the result cached.
    pub(crate) async fn fetch_events(&self, city: &str) -> (Vec<Event>, bool, Option<f64>) {
        if let Some(entry) = self.cache.load(city).await {
            let age = entry.age_hours();
            info!("Using cached events for {} (age: {:.1}h)", city, age);
            return (entry.events, age > 0.0, Some(age));
        }

        match self.aggregator.fetch_events(city).await {
            Ok(events) => {
                info!("Fetched {} fresh events for {}", events.len(), city);
                if !events.is_empty() {
                    self.cache.save(city, events.clone(), None).await;
                }
                (events, false, None)
            }
            Err(e) => {
                warn!("Failed to get any events for {}: {}", city, e);
                (Vec::new(), false, None)
            }
        }
    }

    /// Rank events off the async runtime, bounded by the configured
    /// timeout. A timed-out or failed ranking yields no results rather
    /// than an error.
    pub(crate) async fn rank_events(
        &self,
        query: &str,
        preferences: &PreferenceSet,
        events: &[Event],
    ) -> Vec<ScoredEvent> {
        if events.is_empty() {
            return Vec::new();
        }

        let ranker = Arc::clone(&self.ranker);
        let query = query.to_string();
        let preferences = preferences.clone();
        let events = events.to_vec();
        let task =
            tokio::task::spawn_blocking(move || ranker.rank(&query, &events, Some(&preferences)));

        match tokio::time::timeout(Duration::from_secs(self.config.rank_timeout_secs), task).await {
            Ok(Ok(ranked)) => {
                info!("Ranking returned {} events", ranked.len());
                ranked
            }
            Ok(Err(e)) => {
                warn!("Ranking task failed: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Ranking timed out after {}s",
                    self.config.rank_timeout_secs
                );
                Vec::new()
            }
        }
    }

    pub(crate) fn persist_assistant_turn(
        &self,
        plan: &SearchPlan,
        message: &str,
        recommendations: &[citypulse_core::types::Recommendation],
        cache_used: bool,
        cache_age_hours: Option<f64>,
    ) -> Result<(), ChatError> {
        let mut turn = ConversationTurn::new(Role::Assistant, message);
        turn.extracted_preferences = Some(plan.preferences.clone());
        turn.recommendations = Some(recommendations.to_vec());
        turn.cache_used = Some(cache_used);
        turn.cache_age_hours = cache_age_hours;
        self.conversations
            .save_turn(&plan.user_id, &plan.conversation_id, &turn)?;
        Ok(())
    }

    /// Stored preferences and history for an existing conversation.
    /// A missing or unreadable conversation yields empty context.
    fn load_context(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> (StoredPreferences, Vec<citypulse_core::types::HistoryMessage>) {
        match self.conversations.get(user_id, conversation_id) {
            Ok(conversation) => lookup_stored_preferences(&conversation),
            Err(e) => {
                debug!(
                    "Unable to load stored preferences for {}: {}",
                    conversation_id, e
                );
                (StoredPreferences::default(), Vec::new())
            }
        }
    }

    /// The city named in the most recent user message, scanning the
    /// current message first and then the window newest-first.
    fn latest_city_mention(
        &self,
        message: &str,
        window: &[citypulse_core::types::HistoryMessage],
    ) -> Option<String> {
        if let Some(city) = self.extractor.extract_location(message) {
            return Some(city);
        }
        window
            .iter()
            .rev()
            .filter(|m| m.role == Role::User)
            .find_map(|m| self.extractor.extract_location(&m.content))
    }
}
