use anyhow::{Context, Result};
use common::Config;
use std::io::Write;
use std::sync::Arc;
use tracing::{error, info};

use crate::drafts::{generate_linkedin_draft, generate_tweet_draft};
use crate::extract::article_text;
use crate::llm::{summarizer, LlmProvider};
use crate::news::{Article, NewsSource};
use crate::notify::Notifier;
use crate::report::{compose_message, ReportBlock};

/// How much of a summary goes into the progress log
const SUMMARY_LOG_CHARS: usize = 150;

/// An article kept for processing, with the text extracted while selecting it
#[derive(Debug, Clone)]
pub struct SelectedArticle {
    pub article: Article,
    pub text: String,
}

/// How a single workflow run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No completion credential: nothing was fetched
    Aborted,
    /// No candidate had usable text
    NoArticles,
    Completed { processed: usize, notified: bool },
}

/// Keep the first `max` candidates, in order, whose extracted text is non-empty.
pub fn select_articles(candidates: Vec<Article>, max: usize) -> Vec<SelectedArticle> {
    candidates
        .into_iter()
        .filter_map(|article| {
            let text = article_text(&article);
            (!text.is_empty()).then_some(SelectedArticle { article, text })
        })
        .take(max)
        .collect()
}

/// One fetch → summarize → draft → notify pipeline, wired to its collaborators
pub struct Workflow {
    config: Config,
    news: Arc<dyn NewsSource>,
    llm: Option<Arc<dyn LlmProvider>>,
    notifier: Arc<dyn Notifier>,
}

impl Workflow {
    pub fn new(
        config: Config,
        news: Arc<dyn NewsSource>,
        llm: Option<Arc<dyn LlmProvider>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            news,
            llm,
            notifier,
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        self.run_with_console(&mut std::io::stdout()).await
    }

    /// Same as [`Workflow::run`], printing each block to `console` instead of stdout.
    /// A console write failure is logged and does not stop the run.
    pub async fn run_with_console<W: Write + Send>(&self, console: &mut W) -> Result<RunOutcome> {
        info!("=== Running newsdraft workflow ===");

        let Some(llm) = self.llm.as_deref() else {
            error!("CRITICAL: LLM API key is not set. Aborting workflow.");
            return Ok(RunOutcome::Aborted);
        };

        let candidates = self.news.fetch_articles().await;
        let selected = select_articles(candidates, self.config.news.max_articles);
        if selected.is_empty() {
            info!("No articles with sufficient text found. Workflow ending.");
            return Ok(RunOutcome::NoArticles);
        }
        info!("Processing {} selected article(s)...", selected.len());

        let mut blocks = Vec::with_capacity(selected.len());
        for SelectedArticle { article, text } in selected {
            let title = article.title();
            let url = article.url();
            info!(title = %title, source = %article.source_name(), url = %url, "processing article");

            let Some(summary) = summarizer::summarize_article(llm, &self.config.llm, &text).await
            else {
                error!("Failed to summarize article: {}. Skipping draft generation.", title);
                continue;
            };
            info!(
                "Summary: {}...",
                summary.chars().take(SUMMARY_LOG_CHARS).collect::<String>()
            );

            let tweet = generate_tweet_draft(llm, &self.config.llm, title, &summary, url).await;
            let linkedin =
                generate_linkedin_draft(llm, &self.config.llm, title, &summary, url).await;

            let block = ReportBlock {
                title: title.to_string(),
                url: url.to_string(),
                summary,
                tweet,
                linkedin,
            };
            if let Err(e) = print_block(console, &block) {
                error!("{:#}", e);
            }
            blocks.push(block);
        }

        let notified = if blocks.is_empty() {
            info!("No final drafts generated to send.");
            false
        } else {
            info!("Sending combined drafts to Telegram...");
            let message = compose_message(&blocks);
            let sent = self.notifier.notify(&message).await;
            if !sent {
                error!("Telegram message dispatch reported failure.");
            }
            sent
        };

        info!("=== newsdraft workflow finished ===");
        Ok(RunOutcome::Completed {
            processed: blocks.len(),
            notified,
        })
    }
}

fn print_block<W: Write>(out: &mut W, block: &ReportBlock) -> Result<()> {
    out.write_all(block.console_text().as_bytes())
        .and_then(|_| out.flush())
        .context("failed to write drafts to console")
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::llm::testing::ScriptedProvider;

    fn workflow(
        source: Arc<FakeSource>,
        llm: Option<Arc<ScriptedProvider>>,
        notifier: Arc<RecordingNotifier>,
    ) -> Workflow {
        Workflow::new(
            Config::default(),
            source,
            llm.map(|p| p as Arc<dyn LlmProvider>),
            notifier,
        )
    }

    #[test]
    fn selection_skips_articles_without_text() {
        let candidates = vec![
            article("One", None),
            article("Two", Some("   ")),
            article("Three", Some("Real content")),
            article("Four", Some("More content")),
        ];

        let kept = select_articles(candidates, 1);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].article.title(), "Three");
        assert_eq!(kept[0].text, "Real content");
    }

    #[test]
    fn selection_stops_at_max_and_keeps_order() {
        let candidates = vec![
            article("A", Some("a")),
            article("B", None),
            article("C", Some("c")),
            article("D", Some("d")),
        ];

        let kept: Vec<_> = select_articles(candidates, 2)
            .into_iter()
            .map(|s| s.article.title().to_string())
            .collect();
        assert_eq!(kept, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn run_without_usable_articles_touches_nothing_downstream() {
        let source = Arc::new(FakeSource::new(vec![article("Empty", None)]));
        let llm = Arc::new(ScriptedProvider::new(vec![]));
        let notifier = Arc::new(RecordingNotifier::new(true));

        let outcome = workflow(source.clone(), Some(llm.clone()), notifier.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::NoArticles);
        assert_eq!(source.calls(), 1);
        assert_eq!(llm.calls(), 0);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn run_without_llm_aborts_before_fetching() {
        let source = Arc::new(FakeSource::new(vec![article("A", Some("text"))]));
        let notifier = Arc::new(RecordingNotifier::new(true));

        let outcome = workflow(source.clone(), None, notifier.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Aborted);
        assert_eq!(source.calls(), 0);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_draft_is_replaced_by_placeholder() {
        let source = Arc::new(FakeSource::new(vec![article("Story", Some("Body text"))]));
        let llm = Arc::new(ScriptedProvider::new(vec![
            Ok("The summary."),
            Err("LLM API error 503"),
            Ok("\"LinkedIn draft.\""),
        ]));
        let notifier = Arc::new(RecordingNotifier::new(true));

        let outcome = workflow(source, Some(llm.clone()), notifier.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                processed: 1,
                notified: true
            }
        );
        assert_eq!(llm.calls(), 3);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("*AI Summary:* The summary."));
        assert!(sent[0].contains("*Draft Tweet:*\n[Generation Failed]"));
        assert!(sent[0].contains("*Draft LinkedIn Post:*\nLinkedIn draft.\n"));
    }

    #[tokio::test]
    async fn failed_summary_skips_article_and_notification() {
        let source = Arc::new(FakeSource::new(vec![article("Story", Some("Body text"))]));
        let llm = Arc::new(ScriptedProvider::new(vec![Err("LLM response has no choices")]));
        let notifier = Arc::new(RecordingNotifier::new(true));

        let outcome = workflow(source, Some(llm.clone()), notifier.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                processed: 0,
                notified: false
            }
        );
        assert_eq!(llm.calls(), 1);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_not_raised() {
        let source = Arc::new(FakeSource::new(vec![article("Story", Some("Body text"))]));
        let llm = Arc::new(ScriptedProvider::new(vec![Ok("S"), Ok("T"), Ok("L")]));
        let notifier = Arc::new(RecordingNotifier::new(false));

        let outcome = workflow(source, Some(llm), notifier.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                processed: 1,
                notified: false
            }
        );
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn console_failure_does_not_block_delivery() {
        let source = Arc::new(FakeSource::new(vec![article("Story", Some("Body text"))]));
        let llm = Arc::new(ScriptedProvider::new(vec![Ok("S"), Ok("T"), Ok("L")]));
        let notifier = Arc::new(RecordingNotifier::new(true));

        let outcome = workflow(source, Some(llm), notifier.clone())
            .run_with_console(&mut BrokenConsole)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                processed: 1,
                notified: true
            }
        );
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("*AI Summary:* S"));
    }

    #[test]
    fn block_is_printed_to_console() {
        let block = ReportBlock {
            title: "Story".to_string(),
            url: "https://news.example/story".to_string(),
            summary: "S".to_string(),
            tweet: Some("T".to_string()),
            linkedin: None,
        };
        let mut out = Vec::new();
        print_block(&mut out, &block).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), block.console_text());
    }
}
