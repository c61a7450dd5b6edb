use anyhow::{Context, Result};
use common::{TelegramConfig, TRUNCATION_HEADROOM};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Appended to a message cut down to fit the chat limit
pub const TRUNCATION_MARKER: &str = "\n\n... [Message Truncated]";

/// Characters Telegram's MarkdownV2 dialect reserves
const MARKDOWN_V2_RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Delivery failures, kept apart so each category is reported on its own
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Telegram BadRequest error: {0}")]
    BadRequest(String),
    #[error("Telegram network error: {0}")]
    Network(String),
    #[error("Telegram API error: {0}")]
    Api(String),
    #[error("unexpected error sending to Telegram: {0}")]
    Unexpected(String),
}

/// A destination for the assembled report.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message`; `false` on any failure, never an error.
    async fn notify(&self, message: &str) -> bool;
}

/// Prefix every MarkdownV2 reserved character with a backslash.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if MARKDOWN_V2_RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Bound `text` to `max_chars` characters, leaving room for the truncation marker.
pub fn truncate_message(text: &str, max_chars: usize) -> Cow<'_, str> {
    if text.chars().count() <= max_chars {
        return Cow::Borrowed(text);
    }
    let keep = max_chars.saturating_sub(TRUNCATION_HEADROOM);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    Cow::Owned(truncated)
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Sends reports through the Telegram Bot API `sendMessage` method
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
    max_message_chars: usize,
}

impl TelegramNotifier {
    pub fn new(
        config: &TelegramConfig,
        bot_token: Option<String>,
        chat_id: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
            max_message_chars: config.max_message_chars,
        })
    }

    async fn send_message(&self, token: &str, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let body = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "MarkdownV2",
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| NotifyError::Network(e.without_url().to_string()))?;
        let parsed = serde_json::from_str::<TelegramResponse>(&raw);
        let description = parsed
            .as_ref()
            .ok()
            .and_then(|r| r.description.clone())
            .unwrap_or_else(|| raw.chars().take(200).collect());

        if status == StatusCode::BAD_REQUEST {
            return Err(NotifyError::BadRequest(description));
        }
        if !status.is_success() {
            return Err(NotifyError::Api(format!("{}: {}", status, description)));
        }

        match parsed {
            Ok(r) if r.ok => Ok(()),
            Ok(_) => Err(NotifyError::Api(description)),
            Err(e) => Err(NotifyError::Unexpected(format!(
                "unreadable sendMessage response: {}",
                e
            ))),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> bool {
        let (Some(token), Some(chat_id)) = (self.bot_token.as_deref(), self.chat_id.as_deref())
        else {
            warn!("Telegram token or chat ID missing, cannot send message");
            return false;
        };

        let text = truncate_message(message, self.max_message_chars);
        if matches!(text, Cow::Owned(_)) {
            warn!(
                "Combined Telegram message too long ({} chars), truncating to {}",
                message.chars().count(),
                self.max_message_chars
            );
        }
        let escaped = escape_markdown_v2(&text);

        info!("Attempting to send message to Telegram chat ID {}...", chat_id);
        match self.send_message(token, chat_id, &escaped).await {
            Ok(()) => {
                info!("Message sent successfully to Telegram");
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }
}
