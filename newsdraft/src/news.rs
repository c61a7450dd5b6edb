use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Local};
use common::NewsConfig;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

/// Publisher reference attached to an article
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleSource {
    pub name: Option<String>,
}

/// Article record as returned by the news search API.
///
/// Fields are optional on the wire; the accessors apply the display fallbacks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub url: Option<String>,
    pub source: Option<ArticleSource>,
    pub content: Option<String>,
    pub description: Option<String>,
}

impl Article {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("No Title")
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or("#")
    }

    pub fn source_name(&self) -> &str {
        self.source
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or("Unknown Source")
    }
}

/// Anything that can hand the workflow a batch of candidate articles.
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch candidates in provider order; failures yield an empty batch.
    async fn fetch_articles(&self) -> Vec<Article>;
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

/// Client for the NewsAPI `everything` search endpoint
pub struct NewsApiClient {
    client: Client,
    config: NewsConfig,
    api_key: Option<String>,
}

impl NewsApiClient {
    pub fn new(config: &NewsConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("newsdraft/0.1.0")
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    async fn try_fetch(&self, api_key: &str) -> Result<Vec<Article>> {
        let from = (Local::now() - ChronoDuration::days(1))
            .format("%Y-%m-%d")
            .to_string();
        let page_size = self.config.page_size.to_string();

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("q", self.config.keywords.as_str()),
                ("apiKey", api_key),
                ("language", self.config.language.as_str()),
                ("sortBy", self.config.sort_by.as_str()),
                ("pageSize", page_size.as_str()),
                ("from", from.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("request to news API timed out")
                } else {
                    anyhow::Error::new(e).context("network error fetching news")
                }
            })?;

        let status = response.status();
        let body = response.text().await.context("failed to read news API response body")?;

        // NewsAPI reports errors as JSON with status "error", often alongside a 4xx
        let parsed: NewsApiResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(anyhow::Error::new(e).context("failed to parse news API response"));
            }
            Err(_) => anyhow::bail!("news API request failed with status: {}", status),
        };

        if parsed.status != "ok" {
            anyhow::bail!(
                "news API returned status '{}': {}",
                parsed.status,
                parsed.message.as_deref().unwrap_or("no message")
            );
        }

        Ok(parsed.articles)
    }
}

#[async_trait::async_trait]
impl NewsSource for NewsApiClient {
    async fn fetch_articles(&self) -> Vec<Article> {
        let Some(api_key) = self.api_key.as_deref() else {
            error!("News API key is missing");
            return Vec::new();
        };

        info!("Fetching news with keywords: {}", self.config.keywords);
        match self.try_fetch(api_key).await {
            Ok(articles) => {
                info!("Successfully fetched {} articles from news API", articles.len());
                articles
            }
            Err(e) => {
                error!("Error fetching news: {:#}", e);
                Vec::new()
            }
        }
    }
}
