use std::{collections::HashSet, sync::Mutex, time::Duration};

use super::{Confirmation, NegotiationEvent, Reply, SelectionStrategy, TitleCandidateSet};
use crate::{
    clock::Clock,
    error::Error,
    messaging::{notifier::Notifier, MessageRef, MessagingChannel},
};

/// Posts candidates to a messaging channel and polls the thread for answers.
///
/// Each candidate set opens a new thread; confirmation and notices follow in
/// that thread. Only human replies posted after the latest prompt count.
pub struct RemoteStrategy<M, C> {
    notifier: Notifier<M>,
    clock: C,
    poll_interval: Duration,
    thread: Mutex<Option<MessageRef>>,
}

impl<M, C> RemoteStrategy<M, C>
where
    M: MessagingChannel + Send + Sync,
    C: Clock + Send + Sync,
{
    pub fn new(notifier: Notifier<M>, clock: C, poll_interval: Duration) -> Self {
        Self {
            notifier,
            clock,
            poll_interval,
            thread: Mutex::new(None),
        }
    }

    fn current_thread(&self) -> Option<MessageRef> {
        self.thread
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_thread(&self, thread: MessageRef) {
        *self
            .thread
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(thread);
    }

    /// Waits for the next unseen human reply in `root` posted after `prompt`
    async fn next_reply(
        &self,
        root: &MessageRef,
        prompt: &MessageRef,
        seen: &mut HashSet<String>,
    ) -> String {
        loop {
            match self.notifier.messaging().get_replies(root).await {
                Ok(replies) => {
                    let start = replies
                        .iter()
                        .position(|m| m.message_ref == *prompt)
                        .map_or(0, |i| i + 1);

                    let reply = replies
                        .into_iter()
                        .skip(start)
                        .filter(|m| !m.is_automated)
                        .find(|m| seen.insert(m.message_ref.ts.clone()));

                    if let Some(reply) = reply {
                        tracing::info!(author = ?reply.author, text = %reply.text, "Received reply");
                        return reply.text;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to poll for replies, retrying"),
            }

            self.clock.sleep(self.poll_interval).await;
        }
    }
}

impl<M, C> SelectionStrategy for RemoteStrategy<M, C>
where
    M: MessagingChannel + Send + Sync,
    C: Clock + Send + Sync,
{
    async fn await_selection(&self, candidates: &TitleCandidateSet) -> Result<Reply, Error> {
        let prompt = self.notifier.title_options(candidates, None).await?;
        self.set_thread(prompt.clone());

        let mut seen = HashSet::new();
        loop {
            let text = self.next_reply(&prompt, &prompt, &mut seen).await;
            match Reply::parse(&text) {
                Reply::Invalid(_) => {
                    let _ = self.notifier.invalid_reply(Some(&prompt)).await;
                }
                reply => return Ok(reply),
            }
        }
    }

    async fn confirm(&self, title: &str) -> Result<bool, Error> {
        let thread = self.current_thread();
        let prompt = self.notifier.confirm_title(title, thread.as_ref()).await?;
        let root = thread.unwrap_or_else(|| prompt.clone());

        let mut seen = HashSet::new();
        loop {
            let text = self.next_reply(&root, &prompt, &mut seen).await;
            match Confirmation::parse(&text) {
                Confirmation::Yes => return Ok(true),
                Confirmation::No => return Ok(false),
                Confirmation::Invalid => {
                    let _ = self.notifier.invalid_confirmation(Some(&root)).await;
                }
            }
        }
    }

    async fn notify(&self, event: NegotiationEvent<'_>) {
        let thread = self.current_thread();
        let _ = match event {
            NegotiationEvent::Regenerating => self.notifier.regenerating(thread.as_ref()).await,
            NegotiationEvent::Selected(title) => {
                self.notifier.title_selected(title, thread.as_ref()).await
            }
        };
    }
}
