/*
newsdraft - main.rs
This binary runs the daily news-to-social-drafts workflow, either once on demand
or on a daily schedule until interrupted.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::{Config, Credentials};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newsdraft::llm::remote::RemoteLlmProvider;
use newsdraft::llm::LlmProvider;
use newsdraft::news::NewsApiClient;
use newsdraft::notify::TelegramNotifier;
use newsdraft::scheduler::{self, Scheduler};
use newsdraft::workflow::Workflow;

#[derive(Parser, Debug)]
#[command(name = "newsdraft", about = "Fetch news, draft social posts with an LLM, send them to Telegram")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run the workflow a single time and exit
    #[arg(long)]
    once: bool,

    /// Do not run the workflow when the scheduler starts
    #[arg(long)]
    no_startup_run: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(
        default_path.exists().then_some(default_path.as_path()),
        override_path.as_deref(),
    )
    .await
    .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    let credentials = Credentials::from_env(&config);
    if credentials.news_api_key.is_none() {
        error!("CRITICAL: missing {} in environment/.env. Exiting.", config.news.api_key_env);
        anyhow::bail!("{} is not set", config.news.api_key_env);
    }

    let workflow = Arc::new(build_workflow(&config, &credentials)?);

    if args.once {
        info!("Running workflow once (--once)");
        scheduler::run_once(workflow).await;
        return Ok(());
    }

    let mut scheduler_config = config.scheduler.clone();
    if args.no_startup_run {
        scheduler_config.run_on_start = false;
    }
    let scheduler = Scheduler::from_config(&scheduler_config)?;

    let shutdown_notify = Arc::new(Notify::new());
    {
        let shutdown_notify = shutdown_notify.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Scheduler stopped manually."),
                Err(e) => error!(%e, "failed to listen for ctrl-c"),
            }
            shutdown_notify.notify_one();
        });
    }

    scheduler.run(workflow, shutdown_notify).await;

    info!("Shutdown complete");
    Ok(())
}

/// Wire the collaborator clients from configuration and credentials
fn build_workflow(config: &Config, credentials: &Credentials) -> Result<Workflow> {
    let news = NewsApiClient::new(&config.news, credentials.news_api_key.clone())?;

    let llm = credentials.llm_api_key.as_ref().map(|key| {
        info!("LLM provider initialized: {}", config.llm.api_url);
        Arc::new(RemoteLlmProvider::from_config(&config.llm, key.clone())) as Arc<dyn LlmProvider>
    });

    let notifier = TelegramNotifier::new(
        &config.telegram,
        credentials.telegram_bot_token.clone(),
        credentials.telegram_chat_id.clone(),
    )?;

    Ok(Workflow::new(
        config.clone(),
        Arc::new(news),
        llm,
        Arc::new(notifier),
    ))
}
