use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use episode_pulse::{
    publish::WordPressClient, tracing::init_tracing_subscriber, trigger::TriggerConfig, AppConfig,
    PublishCoordinator, PublishResult, Publisher, Secrets, SlackClient, SystemClock,
};
use episode_store::{FileWatchStateStore, FsArtifactStore};

#[derive(Parser)]
#[command(
    name = "publish-poller",
    about = "Waits for the publish trigger on a completed episode and creates the blog draft"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "EPISODE_PULSE_CONFIG", default_value = "episode-pulse.toml")]
    config: PathBuf,

    /// Watch state file, overrides `watch.state_file`
    #[arg(long, env = "PUBLISH_POLLER_STATE")]
    state: Option<PathBuf>,

    /// Seconds between polls, overrides `watch.poll_interval_secs`
    #[arg(long)]
    interval: Option<u64>,

    /// Hours until the watch expires, overrides `watch.timeout_hours`
    #[arg(long)]
    timeout: Option<i64>,

    #[command(flatten)]
    secrets: Secrets,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let mut config = AppConfig::load_or_default(&cli.config)?;
    if let Some(state) = cli.state {
        config.watch.state_file = state;
    }
    if let Some(interval) = cli.interval {
        config.watch.poll_interval_secs = interval;
    }
    if let Some(timeout) = cli.timeout {
        config.watch.timeout_hours = timeout;
    }
    config.validate()?;

    let token = cli
        .secrets
        .slack_bot_token()
        .context("SLACK_BOT_TOKEN not set")?;
    let slack = SlackClient::new(token);
    let identity = slack
        .test_connection()
        .await
        .context("Slack authentication failed")?;
    let slack = slack.with_bot_user_id(identity.user_id);

    let store = FsArtifactStore::init(&config.directories.outputs).await?;
    let blog = WordPressClient::from_secrets(&cli.secrets, &config.blog)?;
    let publisher = Publisher::new(blog, store, &config.blog.title_prefix);

    tracing::info!(
        state = %config.watch.state_file.display(),
        interval_secs = config.watch.poll_interval_secs,
        timeout_hours = config.watch.timeout_hours,
        "Starting publish poller..."
    );

    let coordinator = PublishCoordinator::resume(
        slack,
        FileWatchStateStore::new(&config.watch.state_file),
        SystemClock,
        publisher,
        TriggerConfig::from(&config.watch),
        config.watch.horizon(),
    )
    .await
    .inspect_err(|e| tracing::error!(error = %e, "Nothing to poll"))?;

    match coordinator.run().await {
        PublishResult::Published(post) => {
            tracing::info!(edit_url = %post.edit_url, "Blog draft created")
        }
        PublishResult::TimedOut => tracing::info!("Publish window closed"),
        PublishResult::Cancelled => tracing::info!("Publish watch cancelled"),
        PublishResult::Failed(message) => anyhow::bail!("Publishing failed: {message}"),
    }

    Ok(())
}
