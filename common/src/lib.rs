/*!
common/src/lib.rs

Shared configuration types and credential helpers for newsdraft.

This file provides:
- Config data structures (deserialized from TOML, every key optional)
- An async loader that merges a default file with an override file
- Environment-sourced credentials for the news, LLM and Telegram APIs
*/

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Characters reserved at the end of a truncated chat message for the marker.
pub const TRUNCATION_HEADROOM: usize = 100;

/// News search (NewsAPI `everything` endpoint) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub endpoint: String,
    /// Env var holding the NewsAPI key
    pub api_key_env: String,
    /// Keyword expression passed as `q`
    pub keywords: String,
    pub language: String,
    pub sort_by: String,
    pub page_size: u32,
    /// Maximum number of articles kept for processing per run
    pub max_articles: usize,
    pub timeout_seconds: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://newsapi.org/v2/everything".to_string(),
            api_key_env: "NEWS_API_KEY".to_string(),
            keywords: r#""artificial intelligence" OR "machine learning" OR "LLM" OR "AI ethics" OR "AI regulation""#
                .to_string(),
            language: "en".to_string(),
            sort_by: "relevancy".to_string(),
            page_size: 10,
            max_articles: 1,
            timeout_seconds: 15,
        }
    }
}

/// Chat-completions (OpenAI-compatible) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key_env: String,
    pub summarization_model: String,
    pub generation_model: String,
    /// Article text longer than this (in characters) is cut before summarization
    pub max_article_chars: usize,
    pub summary_temperature: f32,
    pub generation_temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            summarization_model: "llama3-8b-8192".to_string(),
            generation_model: "llama3-8b-8192".to_string(),
            max_article_chars: 7000,
            summary_temperature: 0.3,
            generation_temperature: 0.6,
            timeout_seconds: 120,
        }
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token_env: String,
    pub chat_id_env: String,
    /// Upper bound on the unescaped message length
    pub max_message_chars: usize,
    pub timeout_seconds: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            chat_id_env: "TELEGRAM_CHAT_ID".to_string(),
            max_message_chars: 4000,
            timeout_seconds: 30,
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Daily wall-clock time in "HH:MM" 24h format
    pub time: String,
    /// Run the workflow once immediately when the process starts
    pub run_on_start: bool,
    pub poll_interval_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            time: "08:00".to_string(),
            run_on_start: true,
            poll_interval_seconds: 60,
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub news: NewsConfig,
    pub llm: LlmConfig,
    pub telegram: TelegramConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence). Keys absent
    /// from both fall back to the built-in defaults.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.news.page_size == 0 {
            anyhow::bail!("news.page_size must be at least 1");
        }
        if self.news.max_articles == 0 {
            anyhow::bail!("news.max_articles must be at least 1");
        }
        if self.llm.max_article_chars == 0 {
            anyhow::bail!("llm.max_article_chars must be at least 1");
        }
        if self.telegram.max_message_chars <= TRUNCATION_HEADROOM {
            anyhow::bail!(
                "telegram.max_message_chars must be greater than {}",
                TRUNCATION_HEADROOM
            );
        }
        if self.scheduler.poll_interval_seconds == 0 {
            anyhow::bail!("scheduler.poll_interval_seconds must be at least 1");
        }
        parse_daily_time(&self.scheduler.time)
            .with_context(|| format!("invalid scheduler.time '{}'", self.scheduler.time))?;
        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Parse a strict 24h "HH:MM" wall-clock time (two digits on each side).
pub fn parse_daily_time(value: &str) -> Result<NaiveTime> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && bytes[..2].iter().chain(&bytes[3..]).all(u8::is_ascii_digit);
    if !well_formed {
        anyhow::bail!("expected HH:MM, got '{}'", value);
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("'{}' is not a valid time of day", value))
}

/// Secrets resolved from the process environment.
///
/// Every field is optional: a missing credential degrades the matching
/// feature instead of failing the whole process.
#[derive(Clone, Default)]
pub struct Credentials {
    pub news_api_key: Option<String>,
    pub llm_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Credentials {
    /// Read the credentials named by `config` from the environment,
    /// loading a `.env` file from the working directory first if present.
    pub fn from_env(config: &Config) -> Self {
        match dotenv::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(e) => debug!("no .env file loaded: {}", e),
        }
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary lookup (the environment in production).
    pub fn from_lookup<F>(config: &Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |name: &str| {
            let value = lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            if value.is_none() {
                warn!("{} not found", name);
            }
            value
        };

        Self {
            news_api_key: fetch(&config.news.api_key_env),
            llm_api_key: fetch(&config.llm.api_key_env),
            telegram_bot_token: fetch(&config.telegram.bot_token_env),
            telegram_chat_id: fetch(&config.telegram.chat_id_env),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<missing>" };
        f.debug_struct("Credentials")
            .field("news_api_key", &mask(&self.news_api_key))
            .field("llm_api_key", &mask(&self.llm_api_key))
            .field("telegram_bot_token", &mask(&self.telegram_bot_token))
            .field("telegram_chat_id", &mask(&self.telegram_chat_id))
            .finish()
    }
}
