use std::{path::PathBuf, str::FromStr};

use anyhow::Context;
use apalis::{
    layers::{retry::RetryPolicy, sentry::SentryLayer},
    prelude::*,
};
use apalis_cron::{CronStream, Tick};
use chrono::Utc;
use clap::{Parser, Subcommand};
use console::style;
use cron::Schedule;
use episode_pulse::{
    negotiation::{ConfiguredStrategy, RemoteStrategy, TerminalStrategy},
    publish::{BlogBackend, WordPressClient},
    tracing::init_tracing_subscriber,
    trigger::TriggerConfig,
    AppConfig, EpisodeProcessor, EpisodeProcessorBuilder, Error, LlmClient, Notifier,
    ProcessOutcome, PublishAction, PublishCoordinator, PublishResult, Publisher, Secrets,
    SlackClient, SystemClock,
};
use episode_store::{ArtifactStore, FileWatchStateStore, FsArtifactStore, PublishPayload};

#[derive(Parser)]
#[command(
    name = "episode-pulse",
    about = "Turns podcast transcripts into titles, descriptions and blog drafts"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "EPISODE_PULSE_CONFIG", default_value = "episode-pulse.toml")]
    config: PathBuf,

    #[command(flatten)]
    secrets: Secrets,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a single transcript
    Process {
        transcript: PathBuf,

        /// Keep running and wait for the publish trigger afterwards
        #[arg(long)]
        await_publish: bool,
    },
    /// Process new transcripts on a schedule
    Watch {
        /// Cron schedule expression, overrides `watch.transcript_schedule`
        #[arg(long, env = "TRANSCRIPT_SCHEDULE")]
        schedule: Option<String>,
    },
    /// Resume the persisted publish watch
    Poll,
    /// Publish an output directory as a draft blog post
    Publish {
        /// Output directory, defaults to the most recent one
        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long)]
        video_url: Option<String>,

        #[arg(long)]
        thumbnail_url: Option<String>,
    },
    /// Verify the Slack credentials and post a test message
    TestSlack,
    /// Verify the blog credentials
    TestBlog,
}

#[derive(Clone)]
struct App {
    config: AppConfig,
    secrets: Secrets,
}

type Processor = EpisodeProcessor<
    FsArtifactStore,
    LlmClient,
    ConfiguredStrategy<SlackClient, SystemClock>,
    FileWatchStateStore,
    SlackClient,
    SystemClock,
>;

/// Authenticated Slack client, if a bot token is configured
async fn connect_slack(secrets: &Secrets) -> anyhow::Result<Option<SlackClient>> {
    let Some(token) = secrets.slack_bot_token() else {
        return Ok(None);
    };

    let client = SlackClient::new(token);
    let identity = client
        .test_connection()
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Slack authentication failed"))
        .context("Slack authentication failed")?;

    Ok(Some(client.with_bot_user_id(identity.user_id)))
}

async fn build_processor(app: &App) -> anyhow::Result<Processor> {
    let config = &app.config;
    let store = FsArtifactStore::init(&config.directories.outputs).await?;
    let generator = LlmClient::from_secrets(config.generation.provider, &app.secrets)?;

    let notifier = match (
        connect_slack(&app.secrets).await?,
        app.secrets.slack_channel(config),
    ) {
        (Some(client), Some(channel)) => Some(Notifier::new(client, channel)),
        _ => None,
    };

    let strategy = match (&notifier, config.slack.enabled) {
        (Some(notifier), true) => ConfiguredStrategy::Remote(RemoteStrategy::new(
            Notifier::new(notifier.messaging().clone(), notifier.target()),
            SystemClock,
            config.watch.selection_poll_interval(),
        )),
        (None, true) => {
            return Err(Error::Config(
                "slack.enabled requires SLACK_BOT_TOKEN and SLACK_CHANNEL".into(),
            )
            .into())
        }
        (_, false) => ConfiguredStrategy::Terminal(TerminalStrategy),
    };

    Ok(EpisodeProcessorBuilder::new(config.clone())
        .store(store)
        .generator(generator)
        .strategy(strategy)
        .watch_store(FileWatchStateStore::new(&config.watch.state_file))
        .notifier(notifier)
        .build())
}

async fn publisher(app: &App) -> anyhow::Result<Publisher<WordPressClient, FsArtifactStore>> {
    let store = FsArtifactStore::init(&app.config.directories.outputs).await?;
    let blog = WordPressClient::from_secrets(&app.secrets, &app.config.blog)?;

    Ok(Publisher::new(blog, store, &app.config.blog.title_prefix))
}

async fn run_poll(app: App) -> anyhow::Result<PublishResult> {
    let slack = connect_slack(&app.secrets)
        .await?
        .ok_or_else(|| Error::Config("Polling requires SLACK_BOT_TOKEN".into()))?;
    let watch = &app.config.watch;

    let coordinator = PublishCoordinator::resume(
        slack,
        FileWatchStateStore::new(&watch.state_file),
        SystemClock,
        publisher(&app).await?,
        TriggerConfig::from(watch),
        watch.horizon(),
    )
    .await?;

    Ok(coordinator.run().await)
}

fn report_process(outcome: &ProcessOutcome) {
    match outcome {
        ProcessOutcome::Completed {
            output_dir,
            title,
            watch,
        } => {
            println!("{} {title}", style("✅ Done:").green().bold());
            println!("   Outputs: {}", output_dir.display());
            if watch.is_some() {
                println!("   Waiting for the publish trigger in Slack");
            }
        }
        ProcessOutcome::Cancelled => println!("{}", style("Cancelled, nothing written").yellow()),
    }
}

fn report_publish(result: &PublishResult) -> anyhow::Result<()> {
    match result {
        PublishResult::Published(post) => {
            println!("{} {}", style("✅ Draft created:").green().bold(), post.title);
            println!("   Edit: {}", post.edit_url);
        }
        PublishResult::TimedOut => println!("{}", style("Publish window closed").yellow()),
        PublishResult::Cancelled => println!("{}", style("Publish watch cancelled").yellow()),
        PublishResult::Failed(message) => anyhow::bail!("Publishing failed: {message}"),
    }
    Ok(())
}

async fn handle_tick(_tick: Tick, app: Data<App>) -> anyhow::Result<()> {
    tracing::info!(
        transcripts = %app.config.directories.transcripts.display(),
        "Checking for new transcripts..."
    );
    let processor = build_processor(&app).await?;

    for outcome in processor.run_once().await? {
        if let ProcessOutcome::Completed { watch: Some(_), .. } = outcome {
            let app = App::clone(&app);
            tokio::spawn(async move {
                match run_poll(app).await {
                    Ok(result) => tracing::info!(?result, "Publish watch finished"),
                    Err(e) => tracing::error!(error = ?e, "Publish watch failed"),
                }
            });
        }
    }

    Ok(())
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

    let config = AppConfig::load_or_default(&cli.config)?;
    config.validate()?;
    tracing::debug!(secrets = ?cli.secrets, "Loaded secrets");

    let app = App {
        config,
        secrets: cli.secrets,
    };

    match cli.command {
        Command::Process {
            transcript,
            await_publish,
        } => {
            let processor = build_processor(&app).await?;
            let outcome = processor.process_transcript(&transcript).await?;
            report_process(&outcome);

            if await_publish {
                match outcome {
                    ProcessOutcome::Completed { watch: Some(_), .. } => {
                        report_publish(&run_poll(app).await?)?
                    }
                    _ => tracing::warn!("No publish watch was created, not waiting"),
                }
            }
        }
        Command::Watch { schedule } => {
            let schedule = schedule.unwrap_or_else(|| app.config.watch.transcript_schedule.clone());
            tracing::info!(%schedule, "Starting transcript watcher...");
            let schedule = Schedule::from_str(&schedule)?;

            let worker = WorkerBuilder::new("episode-pulse-watch")
                .backend(CronStream::new(schedule))
                .retry(RetryPolicy::retries(3))
                .layer(SentryLayer::new())
                .data(app)
                .build(handle_tick);

            worker.run().await?;
        }
        Command::Poll => report_publish(&run_poll(app).await?)?,
        Command::Publish {
            output,
            video_url,
            thumbnail_url,
        } => {
            let output_path = match output {
                Some(output) => output,
                None => FsArtifactStore::init(&app.config.directories.outputs)
                    .await?
                    .latest_output_dir()
                    .await?
                    .context("No output directories found")?,
            };
            tracing::info!(output = %output_path.display(), "Publishing output directory");

            let payload = PublishPayload {
                output_path,
                video_url,
                thumbnail_url,
                ..Default::default()
            };
            let post = publisher(&app).await?.publish(&payload).await?;
            report_publish(&PublishResult::Published(post))?;
        }
        Command::TestSlack => {
            let client = connect_slack(&app.secrets)
                .await?
                .ok_or_else(|| Error::Config("SLACK_BOT_TOKEN not set".into()))?;
            let channel = app
                .secrets
                .slack_channel(&app.config)
                .ok_or_else(|| Error::Config("SLACK_CHANNEL not set".into()))?
                .to_string();

            Notifier::new(client, channel)
                .connection_test(Utc::now())
                .await?;
            println!("{}", style("✅ Slack connection works").green());
        }
        Command::TestBlog => {
            let blog = WordPressClient::from_secrets(&app.secrets, &app.config.blog)?;
            let identity = blog.test_connection().await?;
            println!("{} {identity}", style("✅").green());
        }
    }

    Ok(())
}
