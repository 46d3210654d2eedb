//! # Configuration
//!
//! [`AppConfig`] is built once at process start from built-in defaults,
//! overlaid by an optional TOML file, and passed explicitly to every
//! component. Credentials never live in the file; they arrive through the
//! environment as [`Secrets`].

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::TimeDelta;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    #[value(name = "openai")]
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub directories: DirectoryConfig,
    pub templates: TemplateConfig,
    pub generation: GenerationConfig,
    pub slack: SlackConfig,
    pub blog: BlogConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub transcripts: PathBuf,
    pub outputs: PathBuf,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            transcripts: PathBuf::from("./transcripts"),
            outputs: PathBuf::from("./outputs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub youtube_description: PathBuf,
    pub newsletter_examples: PathBuf,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            youtube_description: PathBuf::from("./youtube_description_template.txt"),
            newsletter_examples: PathBuf::from("./newsletter_examples.md"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: Provider,
    /// Overrides the provider's default model
    pub model: Option<String>,
    pub title_max_tokens: u32,
    pub content_max_tokens: u32,
    /// Longest acceptable title candidate, in characters
    pub title_max_chars: usize,
    pub timezone: Tz,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            title_max_tokens: 2000,
            content_max_tokens: 16000,
            title_max_chars: 60,
            timezone: Tz::UTC,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Negotiate titles over Slack instead of the terminal
    pub enabled: bool,
    /// User or channel id; `SLACK_CHANNEL` takes precedence
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlogConfig {
    pub category: String,
    pub title_prefix: String,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            category: "First Cup".into(),
            title_prefix: "First Cup".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_interval_secs: u64,
    pub timeout_hours: i64,
    pub state_file: PathBuf,
    pub reaction: String,
    pub reply_command: String,
    pub selection_poll_secs: u64,
    pub transcript_schedule: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            timeout_hours: 24,
            state_file: PathBuf::from(".publish_poller_state.json"),
            reaction: "outbox_tray".into(),
            reply_command: "publish".into(),
            selection_poll_secs: 5,
            transcript_schedule: "*/10 * * * * *".into(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn horizon(&self) -> TimeDelta {
        TimeDelta::hours(self.timeout_hours)
    }

    pub fn selection_poll_interval(&self) -> Duration {
        Duration::from_secs(self.selection_poll_secs)
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, Error> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reads the TOML file at `path`; a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                tracing::info!(path = %path.display(), "Loaded configuration file");
                Self::from_toml_str(&raw)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Configuration file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.watch.poll_interval_secs == 0 || self.watch.selection_poll_secs == 0 {
            return Err(Error::Config("poll intervals must be greater than zero".into()));
        }
        if self.watch.timeout_hours <= 0 {
            return Err(Error::Config("watch.timeout_hours must be positive".into()));
        }
        if self.watch.reply_command.trim().is_empty() || self.watch.reaction.trim().is_empty() {
            return Err(Error::Config("publish trigger reaction and reply must be set".into()));
        }
        if self.generation.title_max_chars == 0 {
            return Err(Error::Config("generation.title_max_chars must be positive".into()));
        }
        Ok(())
    }
}

/// Credentials read from the environment, never from the config file
#[derive(Clone, Default, clap::Args)]
pub struct Secrets {
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub slack_bot_token: Option<String>,
    /// Slack user or channel id that receives notifications
    #[arg(long, env = "SLACK_CHANNEL")]
    pub slack_channel: Option<String>,
    #[arg(long, env = "WP_SITE_URL")]
    pub wp_site_url: Option<String>,
    #[arg(long, env = "WP_USERNAME")]
    pub wp_username: Option<String>,
    #[arg(long, env = "WP_APP_PASSWORD", hide_env_values = true)]
    pub wp_app_password: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn state(value: &Option<String>) -> &'static str {
            if value.as_deref().is_some_and(|v| !v.is_empty()) {
                "set"
            } else {
                "unset"
            }
        }

        f.debug_struct("Secrets")
            .field("anthropic_api_key", &state(&self.anthropic_api_key))
            .field("openai_api_key", &state(&self.openai_api_key))
            .field("slack_bot_token", &state(&self.slack_bot_token))
            .field("slack_channel", &self.slack_channel)
            .field("wp_site_url", &self.wp_site_url)
            .field("wp_username", &self.wp_username)
            .field("wp_app_password", &state(&self.wp_app_password))
            .finish()
    }
}

impl Secrets {
    /// Slack channel from the environment, else the configured one
    pub fn slack_channel<'a>(&'a self, config: &'a AppConfig) -> Option<&'a str> {
        self.slack_channel
            .as_deref()
            .or(config.slack.channel.as_deref())
            .filter(|c| !c.is_empty())
    }

    pub fn slack_bot_token(&self) -> Option<&str> {
        self.slack_bot_token.as_deref().filter(|t| !t.is_empty())
    }
}
