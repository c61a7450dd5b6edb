use crate::drafts::GENERATION_FAILED;

/// Heading placed above the joined report blocks in the chat message
pub const MESSAGE_HEADER: &str = "🚀 *Daily AI Social Media Drafts* 🚀\n\n";

/// Everything produced for one processed article
#[derive(Debug, Clone)]
pub struct ReportBlock {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub tweet: Option<String>,
    pub linkedin: Option<String>,
}

impl ReportBlock {
    fn tweet_text(&self) -> &str {
        self.tweet.as_deref().unwrap_or(GENERATION_FAILED)
    }

    fn linkedin_text(&self) -> &str {
        self.linkedin.as_deref().unwrap_or(GENERATION_FAILED)
    }

    /// Chat-message rendition of the block.
    pub fn render(&self) -> String {
        format!(
            "*Article:* [{}]({})\n\n\
             *AI Summary:* {}\n\n\
             *Draft Tweet:*\n{}\n\n\
             *Draft LinkedIn Post:*\n{}\n\n\
             --------------------\n",
            self.title,
            self.url,
            self.summary,
            self.tweet_text(),
            self.linkedin_text()
        )
    }

    /// Human-readable rendition printed to stdout.
    pub fn console_text(&self) -> String {
        let rule = "=".repeat(20);
        format!(
            "\n{rule} Drafts for: {title} {rule}\n\
             URL: {url}\n\
             \n--- DRAFT TWEET ---\n\
             {tweet}\n\
             \n--- DRAFT LINKEDIN POST ---\n\
             {linkedin}\n\
             {closing}\n",
            rule = rule,
            title = self.title,
            url = self.url,
            tweet = self.tweet_text(),
            linkedin = self.linkedin_text(),
            closing = "=".repeat(42 + self.title.chars().count()),
        )
    }
}

/// Join blocks, in processing order, under the message header.
pub fn compose_message(blocks: &[ReportBlock]) -> String {
    let body: Vec<String> = blocks.iter().map(ReportBlock::render).collect();
    format!("{}{}", MESSAGE_HEADER, body.join("\n"))
}
