use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Core trait for chat-completion providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for the given chat request
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// One role-tagged turn of a chat prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request structure for LLM generation
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Overrides the provider's default model when set
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Message content of the first choice, whitespace-trimmed
    pub content: String,
    pub usage: Option<UsageMetadata>,
    pub model: String,
}

/// Token usage counters, informational only
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: Option<usize>,
    pub completion_tokens: Option<usize>,
    pub total_tokens: Option<usize>,
}

pub mod remote;
pub mod summarizer;

/// Run a request and collapse any failure into `None`.
///
/// Callers never see an error from the provider: it is logged here and the
/// step that needed the completion reports an absent result instead.
pub async fn complete<P: LlmProvider + ?Sized>(provider: &P, request: LlmRequest) -> Option<String> {
    let model = request.model.clone().unwrap_or_else(|| "default".to_string());
    match provider.generate(request).await {
        Ok(response) => Some(response.content),
        Err(e) => {
            error!(model = %model, "LLM completion failed: {:#}", e);
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider returning scripted replies and recording every request it receives.
    #[derive(Default)]
    pub struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedProvider {
        pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn request(&self, index: usize) -> LlmRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
            let model = request.model.clone().unwrap_or_default();
            self.requests.lock().unwrap().push(request);
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(content)) => Ok(LlmResponse {
                    content,
                    usage: None,
                    model,
                }),
                Some(Err(message)) => Err(anyhow::anyhow!(message)),
                None => Err(anyhow::anyhow!("no scripted reply left")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedProvider;
    use super::*;

    fn request() -> LlmRequest {
        LlmRequest {
            model: Some("test-model".to_string()),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            max_tokens: Some(10),
            temperature: Some(0.1),
            timeout_seconds: None,
        }
    }

    #[tokio::test]
    async fn complete_returns_content_on_success() {
        let provider = ScriptedProvider::new(vec![Ok("hello")]);
        assert_eq!(complete(&provider, request()).await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn complete_swallows_provider_errors() {
        let provider = ScriptedProvider::new(vec![Err("LLM response has no choices")]);
        assert!(complete(&provider, request()).await.is_none());
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn chat_message_constructors_tag_roles() {
        assert_eq!(ChatMessage::system("a").role, "system");
        assert_eq!(ChatMessage::user("b").role, "user");
    }
}
