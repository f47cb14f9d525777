//! CLI argument definitions for the CityPulse application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CityPulse — a conversational event discovery assistant.
#[derive(Parser, Debug)]
#[command(name = "citypulse", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Data directory for SQLite databases and the disk cache.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one chat message and print the reply.
    Chat {
        /// The message to send.
        message: String,

        /// User id; ids starting with "user_" are trial-gated.
        #[arg(short = 'u', long, default_value = "cli")]
        user: String,

        /// Continue an existing conversation instead of starting one.
        #[arg(long)]
        conversation: Option<String>,

        /// Stream progress notices while the search runs.
        #[arg(long)]
        stream: bool,

        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Event cache maintenance.
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Conversation history.
    Conversations {
        #[command(subcommand)]
        command: ConversationCommand,
    },

    /// Trial usage tracking.
    Usage {
        #[command(subcommand)]
        command: UsageCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show per-tier entry counts.
    Stats,
    /// Remove expired entries from every tier.
    Cleanup,
    /// Drop a city's cached events from every tier.
    Invalidate { city: String },
}

#[derive(Subcommand, Debug)]
pub enum ConversationCommand {
    /// List recent conversations for a user.
    List {
        #[arg(short = 'u', long, default_value = "cli")]
        user: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print a conversation transcript.
    Show {
        id: String,
        #[arg(short = 'u', long, default_value = "cli")]
        user: String,
    },
    /// Delete a conversation and its turns.
    Delete {
        id: String,
        #[arg(short = 'u', long, default_value = "cli")]
        user: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum UsageCommand {
    /// Show interaction counts for a user.
    Show {
        #[arg(short = 'u', long)]
        user: String,
    },
    /// Mark a user as registered, lifting the trial gate.
    Register {
        #[arg(short = 'u', long)]
        user: String,

        /// Anonymous id whose conversations should move to this user.
        #[arg(long)]
        from: Option<String>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CITYPULSE_CONFIG env var > ~/.citypulse/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CITYPULSE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Resolve the data directory, expanding a leading `~`.
    ///
    /// Priority: --data-dir flag > config file value.
    pub fn resolve_data_dir(&self, config_dir: &str) -> PathBuf {
        match &self.data_dir {
            Some(p) => p.clone(),
            None => expand_home(config_dir),
        }
    }
}

/// Expand ~ to the home directory in a path string.
fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&path[2..])
    } else {
        PathBuf::from(path)
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".citypulse").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".citypulse").join("config.toml");
    }
    PathBuf::from("config.toml")
}
