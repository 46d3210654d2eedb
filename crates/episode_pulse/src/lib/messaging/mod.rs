use std::{collections::HashSet, future::Future};

use serde::{Deserialize, Serialize};

pub mod notifier;
pub mod slack;

/// Address of one posted message: the conversation it lives in plus its id
/// within that conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel: String,
    pub ts: String,
}

impl MessageRef {
    pub fn new(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub author: Option<String>,
    pub text: String,
    pub message_ref: MessageRef,
    /// Posted by a bot, including this process
    pub is_automated: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Slack error: {0}")]
    Slack(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Chat surface used for notifications, remote title selection and publish
/// triggers.
pub trait MessagingChannel {
    /// Posts `text` to `channel`, inside `thread` when given
    fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread: Option<&MessageRef>,
    ) -> impl Future<Output = Result<MessageRef, ChannelError>> + Send;

    /// Replies in the thread rooted at `thread`, oldest first, excluding the
    /// root message itself
    fn get_replies(
        &self,
        thread: &MessageRef,
    ) -> impl Future<Output = Result<Vec<InboundMessage>, ChannelError>> + Send;

    /// Names of the reactions attached to `message`; none is an empty set
    fn get_reactions(
        &self,
        message: &MessageRef,
    ) -> impl Future<Output = Result<HashSet<String>, ChannelError>> + Send;
}

impl<T: MessagingChannel + Send + Sync> MessagingChannel for &T {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        (**self).post_message(channel, text, thread).await
    }

    async fn get_replies(&self, thread: &MessageRef) -> Result<Vec<InboundMessage>, ChannelError> {
        (**self).get_replies(thread).await
    }

    async fn get_reactions(&self, message: &MessageRef) -> Result<HashSet<String>, ChannelError> {
        (**self).get_reactions(message).await
    }
}
