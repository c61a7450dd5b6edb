// Summarizer module
use common::LlmConfig;
use tracing::{error, info, warn};

use super::{complete, ChatMessage, LlmProvider, LlmRequest};

/// Token cap for generated summaries
pub const SUMMARY_MAX_TOKENS: usize = 150;

const SUMMARY_SYSTEM_PROMPT: &str = "You are an expert news summarization AI. \
Distill complex articles into a clear, factual summary tailored for social media audiences.";

/// Summarize article text into 2-3 factual sentences.
///
/// Returns `None` for empty input (without calling the provider) and whenever
/// the completion fails.
pub async fn summarize_article<P: LlmProvider + ?Sized>(
    provider: &P,
    config: &LlmConfig,
    article_text: &str,
) -> Option<String> {
    if article_text.is_empty() {
        warn!("No text provided for summarization");
        return None;
    }

    let text = fit_to_budget(article_text, config.max_article_chars);

    let request = LlmRequest {
        model: Some(config.summarization_model.clone()),
        messages: vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Summarize the following article in 2–3 concise sentences, preserving key insights \
                 and factual accuracy without filler:\n\n---\n{}\n---",
                text
            )),
        ],
        max_tokens: Some(SUMMARY_MAX_TOKENS),
        temperature: Some(config.summary_temperature),
        timeout_seconds: None,
    };

    info!(
        "Requesting summarization from model {}...",
        config.summarization_model
    );
    match complete(provider, request).await {
        Some(summary) if !summary.is_empty() => {
            info!("Summarization successful");
            Some(summary)
        }
        _ => {
            error!(
                "Failed to get summary from model {}",
                config.summarization_model
            );
            None
        }
    }
}

/// Cut `text` to at most `budget` characters, warning when it had to.
fn fit_to_budget(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((byte_end, _)) => {
            warn!(
                "Article text too long ({} chars), truncating to {}",
                text.chars().count(),
                budget
            );
            &text[..byte_end]
        }
        None => text,
    }
}
