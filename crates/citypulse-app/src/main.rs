//! CityPulse application binary - composition root.
//!
//! Ties together all CityPulse crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Open storage (SQLite conversations + usage, hybrid event cache)
//! 3. Build the event pipeline (providers -> aggregator -> ranker)
//! 4. Run the requested command (chat, cache, conversations, usage)

mod cli;

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use citypulse_cache::{CacheStore, RemoteTier, SqliteRemoteTier};
use citypulse_chat::{
    ChatOutcome, ChatRequest, ChatService, ChatStream, PatternExtractor, StreamEvent,
};
use citypulse_core::config::AppConfig;
use citypulse_events::{DemoEventProvider, EventAggregator, KeywordRanker};
use citypulse_store::{
    ConversationStore, Database, SqliteConversationStore, SqliteUsageTracker, UsageTracker,
};

use cli::{CacheCommand, CliArgs, Command, ConversationCommand, UsageCommand};

/// Everything the commands operate on.
struct App {
    chat: Arc<ChatService>,
    cache: Arc<CacheStore>,
    conversations: Arc<SqliteConversationStore>,
    usage: Arc<SqliteUsageTracker>,
}

fn build_app(config: &AppConfig, data_dir: &Path) -> Result<App, Box<dyn Error>> {
    std::fs::create_dir_all(data_dir)?;

    let db_path = data_dir.join("citypulse.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let conversations = Arc::new(SqliteConversationStore::new(Arc::clone(&db)));
    let usage = Arc::new(SqliteUsageTracker::new(db, config.chat.trial_limit));

    let remote: Option<Arc<dyn RemoteTier>> = if config.cache.remote_enabled {
        let tier = SqliteRemoteTier::open(&data_dir.join("remote_cache.db"))?;
        Some(Arc::new(tier))
    } else {
        None
    };

    let cache_dir = {
        let configured = Path::new(&config.cache.cache_dir);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            data_dir.join(configured)
        }
    };
    let cache = Arc::new(CacheStore::new(
        chrono::Duration::hours(config.cache.ttl_hours as i64),
        cache_dir,
        remote,
    )?);

    let mut aggregator = EventAggregator::new(
        config.events.max_pages,
        config.events.max_results,
        std::time::Duration::from_secs(config.events.fetch_timeout_secs),
    );
    aggregator.register(Arc::new(DemoEventProvider));

    let chat = Arc::new(ChatService::new(
        Arc::clone(&cache),
        Arc::new(aggregator),
        Arc::new(KeywordRanker::new(config.chat.max_results)),
        Arc::new(PatternExtractor::new()),
        Arc::clone(&usage) as Arc<dyn UsageTracker>,
        Arc::clone(&conversations) as Arc<dyn ConversationStore>,
        config.chat.clone(),
    ));

    Ok(App {
        chat,
        cache,
        conversations,
        usage,
    })
}

fn print_outcome(outcome: &ChatOutcome) {
    println!("{}", outcome.message);
    if let Some(summary) = &outcome.extraction_summary {
        println!("  {}", summary);
    }
    for (i, rec) in outcome.recommendations.iter().enumerate() {
        println!(
            "  {}. {} @ {} (score {:.1}, {:?})",
            i + 1,
            rec.event.title,
            rec.event.venue_name,
            rec.relevance_score,
            rec.source
        );
    }
    println!("conversation: {}", outcome.conversation_id);
}

async fn run_chat(
    app: &App,
    message: String,
    user: String,
    conversation: Option<String>,
    stream: bool,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let request = ChatRequest {
        user_id: user,
        conversation_id: conversation.clone(),
        message,
        conversation_history: Vec::new(),
        is_initial_response: conversation.is_none(),
    };

    if stream {
        let mut events = ChatStream::start(Arc::clone(&app.chat), request);
        while let Some(event) = events.next().await {
            if json {
                println!("{}", serde_json::to_string(&event)?);
                continue;
            }
            match event {
                StreamEvent::Status { content } => println!("… {}", content),
                StreamEvent::Message { content, conversation_id, .. } => {
                    println!("{}", content);
                    println!("conversation: {}", conversation_id);
                }
                StreamEvent::Recommendation { data } => {
                    println!(
                        "  • {} @ {} (score {:.1})",
                        data.event.title, data.event.venue_name, data.relevance_score
                    );
                }
                StreamEvent::Error { content } => eprintln!("error: {}", content),
                StreamEvent::Done => {}
            }
        }
        return Ok(());
    }

    let outcome = app.chat.handle_chat(&request).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

async fn run_cache(app: &App, command: CacheCommand) {
    match command {
        CacheCommand::Stats => {
            let stats = app.cache.stats().await;
            println!("storage: {}", stats.storage_type);
            println!("ttl:     {:.1}h", stats.ttl_hours);
            println!("memory:  {} entries ({} valid)", stats.memory.total, stats.memory.valid);
            println!("disk:    {} entries ({} valid)", stats.disk.total, stats.disk.valid);
            println!("remote:  {} entries ({} valid)", stats.remote.total, stats.remote.valid);
        }
        CacheCommand::Cleanup => {
            app.cache.cleanup().await;
            println!("expired entries removed");
        }
        CacheCommand::Invalidate { city } => {
            app.cache.invalidate(&city).await;
            println!("cache invalidated for {}", city);
        }
    }
}

fn run_conversations(app: &App, command: ConversationCommand) -> Result<(), Box<dyn Error>> {
    match command {
        ConversationCommand::List { user, limit } => {
            let summaries = app.conversations.list(&user, limit)?;
            if summaries.is_empty() {
                println!("no conversations for {}", user);
            }
            for s in summaries {
                println!(
                    "{}  {}  {} messages  {}",
                    s.conversation_id,
                    s.last_message_at.format("%Y-%m-%d %H:%M"),
                    s.message_count,
                    s.preview
                );
            }
        }
        ConversationCommand::Show { id, user } => {
            let conversation = app.conversations.get(&user, &id)?;
            for turn in &conversation.turns {
                println!("[{}] {}", turn.role, turn.content);
            }
        }
        ConversationCommand::Delete { id, user } => {
            app.conversations.delete(&user, &id)?;
            println!("deleted {}", id);
        }
    }
    Ok(())
}

fn run_usage(app: &App, command: UsageCommand) -> Result<(), Box<dyn Error>> {
    match command {
        UsageCommand::Show { user } => {
            let stats = app.usage.get_usage(&user)?;
            println!("user:         {}", stats.user_id);
            println!("interactions: {}", stats.interaction_count);
            println!("remaining:    {}", stats.trial_remaining);
            println!("registered:   {}", stats.is_registered);
        }
        UsageCommand::Register { user, from } => {
            app.usage.mark_registered(&user)?;
            if let Some(old_id) = from {
                let moved = app.conversations.migrate_user(&old_id, &user)?;
                println!("moved {} conversations from {}", moved, old_id);
            }
            println!("{} registered", user);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let config = AppConfig::load_or_default(&config_file);

    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting CityPulse v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let data_dir = args.resolve_data_dir(&config.general.data_dir);
    let app = build_app(&config, &data_dir)?;

    match args.command {
        Command::Chat {
            message,
            user,
            conversation,
            stream,
            json,
        } => run_chat(&app, message, user, conversation, stream, json).await?,
        Command::Cache { command } => run_cache(&app, command).await,
        Command::Conversations { command } => run_conversations(&app, command)?,
        Command::Usage { command } => run_usage(&app, command)?,
    }

    Ok(())
}
