//! # Publish trigger watcher
//!
//! Polls a messaging channel until a human asks for the episode to be
//! published, either by reacting to the completion message or by replying
//! with the publish command in its thread.
//!
//! The persisted watch record doubles as the cancellation signal: once it
//! disappears the watcher stops at the next iteration boundary.

use std::{collections::HashSet, time::Duration};

use chrono::{DateTime, Utc};
use episode_store::{WatchState, WatchStateStore};

use crate::{
    clock::Clock,
    config::WatchConfig,
    messaging::{MessageRef, MessagingChannel},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Reaction,
    Reply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Fired(TriggerSource),
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    pub poll_interval: Duration,
    /// Reaction name without colons, e.g. `outbox_tray`
    pub reaction: String,
    /// Exact reply text, compared trimmed and case-insensitively
    pub reply_command: String,
    /// Log a progress line every this many polls
    pub progress_every: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::from(&WatchConfig::default())
    }
}

impl From<&WatchConfig> for TriggerConfig {
    fn from(config: &WatchConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            reaction: config.reaction.clone(),
            reply_command: config.reply_command.clone(),
            progress_every: 10,
        }
    }
}

/// Messages a watch observes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    /// Checked for the reaction
    pub message: MessageRef,
    /// Checked for the reply; without it only the reaction can fire
    pub thread: Option<MessageRef>,
}

impl WatchTarget {
    pub fn from_state(state: &WatchState) -> Self {
        Self {
            message: MessageRef::new(state.channel.clone(), state.message_ref.clone()),
            thread: state
                .thread_ref
                .as_ref()
                .map(|ts| MessageRef::new(state.channel.clone(), ts.clone())),
        }
    }
}

pub struct TriggerWatcher<M, W, C> {
    channel: M,
    store: W,
    clock: C,
    config: TriggerConfig,
}

impl<M, W, C> TriggerWatcher<M, W, C>
where
    M: MessagingChannel + Send + Sync,
    W: WatchStateStore + Send + Sync,
    C: Clock + Send + Sync,
{
    pub fn new(channel: M, store: W, clock: C, config: TriggerConfig) -> Self {
        Self {
            channel,
            store,
            clock,
            config,
        }
    }

    /// Polls until a trigger fires, `deadline` passes, or the watch record
    /// is deleted. A failed poll is logged and retried next interval.
    #[tracing::instrument(skip_all, fields(message = %target.message.ts, %deadline))]
    pub async fn watch(&self, target: &WatchTarget, deadline: DateTime<Utc>) -> TriggerOutcome {
        let mut seen = HashSet::new();
        let mut polls: u64 = 0;

        tracing::info!(
            reaction = %self.config.reaction,
            reply = %self.config.reply_command,
            interval_secs = self.config.poll_interval.as_secs(),
            "Waiting for publish trigger"
        );

        loop {
            match self.store.exists().await {
                Ok(false) => {
                    tracing::info!("Watch state removed, stopping");
                    return TriggerOutcome::Cancelled;
                }
                Ok(true) => {}
                Err(e) => tracing::warn!(error = ?e, "Failed to check watch state"),
            }

            let now = self.clock.now();
            if now >= deadline {
                tracing::info!(polls, "Publish window elapsed");
                return TriggerOutcome::TimedOut;
            }

            polls += 1;
            if self.config.progress_every > 0 && polls % self.config.progress_every == 0 {
                let remaining = deadline - now;
                tracing::info!(
                    polls,
                    hours = remaining.num_hours(),
                    minutes = remaining.num_minutes() % 60,
                    "Still waiting for publish trigger"
                );
            }

            if self.reaction_present(&target.message).await {
                tracing::info!(polls, "Publish reaction detected");
                return TriggerOutcome::Fired(TriggerSource::Reaction);
            }

            if let Some(thread) = &target.thread {
                if self.reply_present(thread, &mut seen).await {
                    tracing::info!(polls, "Publish reply detected");
                    return TriggerOutcome::Fired(TriggerSource::Reply);
                }
            }

            let remaining = (deadline - now).to_std().unwrap_or_default();
            self.clock
                .sleep(self.config.poll_interval.min(remaining))
                .await;
        }
    }

    async fn reaction_present(&self, message: &MessageRef) -> bool {
        match self.channel.get_reactions(message).await {
            Ok(reactions) => reactions.contains(&self.config.reaction),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to check reactions");
                false
            }
        }
    }

    async fn reply_present(&self, thread: &MessageRef, seen: &mut HashSet<String>) -> bool {
        let replies = match self.channel.get_replies(thread).await {
            Ok(replies) => replies,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to check replies");
                return false;
            }
        };

        let command = self.config.reply_command.trim();
        replies
            .into_iter()
            .filter(|reply| !reply.is_automated)
            .filter(|reply| seen.insert(reply.message_ref.ts.clone()))
            .any(|reply| reply.text.trim().eq_ignore_ascii_case(command))
    }
}
