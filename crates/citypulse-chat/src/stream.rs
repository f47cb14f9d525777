//! Incremental delivery of a chat turn.
//!
//! `ChatStream` runs the same pipeline as `ChatService::handle_chat` but
//! emits progress as it goes: status notices while fetching and ranking,
//! then the reply message, then one event per recommendation, then a
//! terminal `Done`. Clients render the events as they arrive.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use citypulse_core::types::{Recommendation, UsageStats};

use crate::response;
use crate::service::{ChatService, Resolution, SearchPlan};
use crate::types::{ChatOutcome, ChatRequest};

/// Channel depth for in-flight stream events.
const CHANNEL_CAPACITY: usize = 32;

/// Pause between recommendation events, for a paced reveal.
const RECOMMENDATION_DELAY_MS: u64 = 50;

/// Rotating notices shown while ranking runs.
const ANALYZING_STATUSES: [&str; 2] = [
    "Analyzing events with AI to find the best matches...",
    "Using AI to rank and filter the most relevant events...",
];

/// One event in a chat stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Transient progress notice.
    Status { content: String },
    /// The conversational reply and its metadata.
    Message {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        extraction_summary: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage_stats: Option<UsageStats>,
        conversation_id: String,
        trial_exceeded: bool,
        cache_used: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_age_hours: Option<f64>,
    },
    /// One recommendation, emitted after the message.
    Recommendation { data: Recommendation },
    /// The turn failed before producing a reply.
    Error { content: String },
    /// Terminal marker; nothing follows.
    Done,
}

impl StreamEvent {
    fn message_from(outcome: &ChatOutcome) -> Self {
        StreamEvent::Message {
            content: outcome.message.clone(),
            extraction_summary: outcome.extraction_summary.clone(),
            usage_stats: outcome.usage_stats.clone(),
            conversation_id: outcome.conversation_id.clone(),
            trial_exceeded: outcome.trial_exceeded,
            cache_used: outcome.cache_used,
            cache_age_hours: outcome.cache_age_hours,
        }
    }
}

/// A running chat turn delivering `StreamEvent`s.
///
/// Dropping the stream aborts the producer task.
pub struct ChatStream {
    rx: mpsc::Receiver<StreamEvent>,
    handle: JoinHandle<()>,
}

impl ChatStream {
    /// Start a chat turn and stream its progress.
    pub fn start(service: Arc<ChatService>, request: ChatRequest) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(async move {
            produce(service, request, tx).await;
        });
        Self { rx, handle }
    }

    /// The next event, or `None` once the stream is exhausted.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Drain the stream into a vector. Mostly useful in tests.
    pub async fn collect(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn produce(service: Arc<ChatService>, request: ChatRequest, tx: mpsc::Sender<StreamEvent>) {
    match service.resolve(&request).await {
        Err(e) => {
            let _ = tx
                .send(StreamEvent::Error {
                    content: e.to_string(),
                })
                .await;
        }
        Ok(Resolution::Reply(outcome)) => {
            let _ = tx.send(StreamEvent::message_from(&outcome)).await;
        }
        Ok(Resolution::Search(plan)) => {
            if produce_search(&service, &plan, &tx).await.is_err() {
                // Receiver went away; nothing left to deliver.
                return;
            }
        }
    }
    let _ = tx.send(StreamEvent::Done).await;
}

async fn produce_search(
    service: &ChatService,
    plan: &SearchPlan,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<(), mpsc::error::SendError<StreamEvent>> {
    let display = response::title_case(&plan.city);
    status(tx, format!("Searching for events in {}...", display)).await?;

    let (events, cache_used, cache_age_hours) = service.fetch_events(&plan.city).await;
    let notice = match cache_age_hours {
        Some(age) if cache_used => {
            format!("Found cached events for {} (from {:.1}h ago)", display, age)
        }
        _ => format!("Found {} fresh events for {}", events.len(), display),
    };
    status(tx, notice).await?;

    let interval = Duration::from_millis(service.config().status_interval_ms.max(1));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut rank = std::pin::pin!(service.rank_events(&plan.query, &plan.preferences, &events));
    let mut rotation = 0usize;

    let ranked = loop {
        tokio::select! {
            ranked = &mut rank => break ranked,
            _ = ticker.tick() => {
                status(tx, ANALYZING_STATUSES[rotation % ANALYZING_STATUSES.len()]).await?;
                rotation += 1;
            }
        }
    };

    status(tx, format!("Preparing {} recommendations...", ranked.len())).await?;

    let recommendations = response::format_recommendations(&plan.city, &ranked, cache_used);
    let message = response::compose_response(&plan.city, ranked.len(), plan.location_provided);
    let extraction_summary = response::build_extraction_summary(&plan.preferences);

    let persisted =
        service.persist_assistant_turn(plan, &message, &recommendations, cache_used, cache_age_hours);

    tx.send(StreamEvent::Message {
        content: message,
        extraction_summary,
        usage_stats: plan.usage_stats.clone(),
        conversation_id: plan.conversation_id.clone(),
        trial_exceeded: false,
        cache_used,
        cache_age_hours,
    })
    .await?;

    // The reply was already delivered; the client still needs to know
    // this turn will be missing from the conversation record.
    if let Err(e) = persisted {
        warn!("Failed to persist assistant turn: {}", e);
        tx.send(StreamEvent::Error {
            content: format!("Failed to save this turn to the conversation: {}", e),
        })
        .await?;
    }

    for recommendation in recommendations {
        tx.send(StreamEvent::Recommendation {
            data: recommendation,
        })
        .await?;
        tokio::time::sleep(Duration::from_millis(RECOMMENDATION_DELAY_MS)).await;
    }

    Ok(())
}

async fn status(
    tx: &mpsc::Sender<StreamEvent>,
    content: impl Into<String>,
) -> Result<(), mpsc::error::SendError<StreamEvent>> {
    tx.send(StreamEvent::Status {
        content: content.into(),
    })
    .await
}
