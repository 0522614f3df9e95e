//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::parse_clock_time;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Stats command configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Trailing window for all queries, in days
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Per-requester cooldown in minutes
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,

    /// Whether the in-game stats command is served at all
    #[serde(default = "default_true")]
    pub ingame_enabled: bool,

    /// Whether the external-chat stats command is served at all
    #[serde(default = "default_true")]
    pub chat_enabled: bool,

    /// External-chat command name (without the `!` prefix)
    #[serde(default = "default_stats_command")]
    pub chat_command: String,

    /// Whether the in-game command requires the reserve permission
    #[serde(default = "default_true")]
    pub require_reserve: bool,

    /// Embed color for personal stats replies
    #[serde(default = "default_embed_color")]
    pub embed_color: u32,
}

fn default_window_days() -> u32 {
    30
}

fn default_cooldown_minutes() -> u64 {
    15
}

fn default_stats_command() -> String {
    "mystats".to_string()
}

fn default_true() -> bool {
    true
}

fn default_embed_color() -> u32 {
    16759808
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            cooldown_minutes: default_cooldown_minutes(),
            ingame_enabled: default_true(),
            chat_enabled: default_true(),
            chat_command: default_stats_command(),
            require_reserve: default_true(),
            embed_color: default_embed_color(),
        }
    }
}

/// Daily digest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// UTC posting time, "HH:MM"
    #[serde(default = "default_post_time")]
    pub post_time: String,

    /// Manual trigger command name
    #[serde(default = "default_digest_command")]
    pub command: String,

    /// Role allowed to trigger manually (None disables the gate)
    #[serde(default)]
    pub manual_role: Option<String>,

    /// Embed color for the digest
    #[serde(default = "default_embed_color")]
    pub embed_color: u32,
}

fn default_post_time() -> String {
    "10:00".to_string()
}

fn default_digest_command() -> String {
    "stats".to_string()
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            post_time: default_post_time(),
            command: default_digest_command(),
            manual_role: None,
            embed_color: default_embed_color(),
        }
    }
}

/// Whitelister (identity resolver) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_resolver_url")]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Request timeout in seconds
    #[serde(default = "default_resolver_timeout")]
    pub timeout_seconds: u64,
}

fn default_resolver_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_resolver_timeout() -> u64 {
    30
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: default_resolver_url(),
            username: String::new(),
            password: String::new(),
            timeout_seconds: default_resolver_timeout(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Event store export directory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub digest: DigestConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            stats: StatsConfig::default(),
            digest: DigestConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stats.window_days == 0 {
            return Err(ConfigError::ValidationError(
                "Stats window must be at least 1 day".to_string(),
            ));
        }

        if self.stats.chat_command.is_empty() || self.digest.command.is_empty() {
            return Err(ConfigError::ValidationError(
                "Command names must not be empty".to_string(),
            ));
        }

        if parse_clock_time(&self.digest.post_time).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "Digest post time {:?} is not a valid HH:MM time",
                self.digest.post_time
            )));
        }

        if url::Url::parse(&self.resolver.base_url).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "Resolver base URL {:?} is not a valid URL",
                self.resolver.base_url
            )));
        }

        if self.resolver.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Resolver timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
