use common::LlmConfig;
use tracing::{error, info};

use crate::llm::{complete, ChatMessage, LlmProvider, LlmRequest};

/// Shown in place of a draft that could not be generated
pub const GENERATION_FAILED: &str = "[Generation Failed]";

pub const TWEET_MAX_TOKENS: usize = 100;
pub const LINKEDIN_MAX_TOKENS: usize = 200;

const COPYWRITER_SYSTEM_PROMPT: &str = "You are an industry-leading AI social media strategist and copywriter. \
Craft engaging, on-brand posts optimized for platform best practices with clear calls to action.";

/// Generate a short-form (tweet) draft for an article.
pub async fn generate_tweet_draft<P: LlmProvider + ?Sized>(
    provider: &P,
    config: &LlmConfig,
    title: &str,
    summary: &str,
    url: &str,
) -> Option<String> {
    let prompt = format!(
        "Based on the article below, craft a concise, engaging tweet under 280 characters. \
         Use 2–3 strategic hashtags, include a clear call to action, and append the article link.\n\n\
         Title: \"{}\"\n\
         Summary: \"{}\"\n\
         Link: {}\n\n\
         Tweet:",
        title, summary, url
    );
    generate_social_post(provider, config, prompt, TWEET_MAX_TOKENS).await
}

/// Generate a long-form (LinkedIn) draft for an article.
pub async fn generate_linkedin_draft<P: LlmProvider + ?Sized>(
    provider: &P,
    config: &LlmConfig,
    title: &str,
    summary: &str,
    url: &str,
) -> Option<String> {
    let prompt = format!(
        "Using the details below, draft a professional LinkedIn post of 3–4 sentences. \
         Highlight key insights, encourage discussion, include 3–4 industry hashtags, and add the link.\n\n\
         Title: \"{}\"\n\
         Summary: \"{}\"\n\
         Link: {}\n\n\
         LinkedIn Post:",
        title, summary, url
    );
    generate_social_post(provider, config, prompt, LINKEDIN_MAX_TOKENS).await
}

/// Shared generation routine behind both draft flavours.
pub async fn generate_social_post<P: LlmProvider + ?Sized>(
    provider: &P,
    config: &LlmConfig,
    prompt: String,
    max_tokens: usize,
) -> Option<String> {
    let request = LlmRequest {
        model: Some(config.generation_model.clone()),
        messages: vec![
            ChatMessage::system(COPYWRITER_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ],
        max_tokens: Some(max_tokens),
        temperature: Some(config.generation_temperature),
        timeout_seconds: None,
    };

    info!(
        "Requesting social post generation from model {}...",
        config.generation_model
    );
    match complete(provider, request).await {
        Some(draft) if !draft.is_empty() => {
            info!("Social post generation successful");
            Some(strip_wrapping_quotes(&draft).to_string())
        }
        _ => {
            error!(
                "Failed to generate social post from model {}",
                config.generation_model
            );
            None
        }
    }
}

/// Drop one pair of double quotes wrapping the whole text; anything else is left alone.
pub fn strip_wrapping_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}
