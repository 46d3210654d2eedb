use chrono::{DateTime, TimeDelta, Utc};
use episode_store::{WatchState, WatchStateStore};

use super::{PostInfo, PublishAction};
use crate::{
    clock::Clock,
    error::Error,
    messaging::{notifier::Notifier, MessagingChannel},
    trigger::{TriggerConfig, TriggerOutcome, TriggerWatcher, WatchTarget},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishResult {
    Published(PostInfo),
    /// Publish attempted and failed; not retried
    Failed(String),
    TimedOut,
    Cancelled,
}

/// Adopts the persisted watch, waits for its trigger and publishes once.
///
/// Every outcome except cancellation deletes the watch record, provided it is
/// still the record this coordinator resumed; cancellation means someone else
/// already did.
pub struct PublishCoordinator<M, W, C, P> {
    channel: M,
    store: W,
    clock: C,
    publisher: P,
    config: TriggerConfig,
    horizon: TimeDelta,
    state: WatchState,
}

impl<M, W, C, P> PublishCoordinator<M, W, C, P>
where
    M: MessagingChannel + Send + Sync,
    W: WatchStateStore + Send + Sync,
    C: Clock + Send + Sync,
    P: PublishAction + Send + Sync,
{
    /// Loads the watch record; none is [`Error::NoWatchState`]
    pub async fn resume(
        channel: M,
        store: W,
        clock: C,
        publisher: P,
        config: TriggerConfig,
        horizon: TimeDelta,
    ) -> Result<Self, Error> {
        let state = store
            .load()
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to load watch state"))?
            .ok_or(Error::NoWatchState)?;

        tracing::info!(
            output = %state.payload.output_path.display(),
            title = ?state.payload.selected_title,
            created_at = %state.created_at,
            "Resumed publish watch"
        );

        Ok(Self {
            channel,
            store,
            clock,
            publisher,
            config,
            horizon,
            state,
        })
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Fixed at watch creation, so restarts keep the original deadline
    pub fn deadline(&self) -> DateTime<Utc> {
        self.state.created_at + self.horizon
    }

    #[tracing::instrument(skip_all, fields(message = %self.state.message_ref))]
    pub async fn run(self) -> PublishResult {
        let target = WatchTarget::from_state(&self.state);
        let notices = Some(target.thread.as_ref().unwrap_or(&target.message));
        let notifier = Notifier::new(&self.channel, self.state.channel.clone());
        let watcher = TriggerWatcher::new(
            &self.channel,
            &self.store,
            &self.clock,
            self.config.clone(),
        );

        let result = match watcher.watch(&target, self.deadline()).await {
            TriggerOutcome::Cancelled => return PublishResult::Cancelled,
            TriggerOutcome::TimedOut => {
                let _ = notifier.timed_out(self.horizon.num_hours(), notices).await;
                PublishResult::TimedOut
            }
            TriggerOutcome::Fired(source) => {
                tracing::info!(?source, "Publishing");
                let _ = notifier.publishing(notices).await;

                match self.publisher.publish(&self.state.payload).await {
                    Ok(post) => {
                        tracing::info!(edit_url = %post.edit_url, "Published draft");
                        let _ = notifier.publish_succeeded(&post, notices).await;
                        PublishResult::Published(post)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Publishing failed");
                        let _ = notifier.publish_failed(&e.to_string(), notices).await;
                        PublishResult::Failed(e.to_string())
                    }
                }
            }
        };

        self.clear().await;
        result
    }

    /// Deletes the record only while it is still the one this watch loaded
    async fn clear(&self) {
        match self.store.load().await {
            Ok(Some(current)) if current == self.state => {}
            Ok(Some(current)) => {
                tracing::warn!(
                    other = %current.message_ref,
                    "Watch state now belongs to another watch, leaving it"
                );
                return;
            }
            Ok(None) => {
                tracing::warn!("Watch state already removed");
                return;
            }
            Err(e) => tracing::warn!(error = ?e, "Failed to re-read watch state"),
        }

        match self.store.delete().await {
            Ok(true) => tracing::info!("Cleared watch state"),
            Ok(false) => tracing::warn!("Watch state already removed"),
            Err(e) => tracing::error!(error = ?e, "Failed to clear watch state"),
        }
    }
}
