use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use episode_pulse::{
    messaging::{ChannelError, InboundMessage},
    MessageRef, MessagingChannel,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub channel: String,
    pub text: String,
    pub thread: Option<MessageRef>,
    pub message_ref: MessageRef,
}

/// In-memory chat channel.
///
/// Reactions appear from poll `reaction_from` on; the first `failing_polls`
/// reaction and reply checks fail.
#[derive(Clone)]
pub struct MockChannel {
    pub posted: Arc<Mutex<Vec<PostedMessage>>>,
    pub replies: Arc<Mutex<Vec<InboundMessage>>>,
    pub reaction: Option<(usize, String)>,
    pub reaction_polls: Arc<Mutex<usize>>,
    pub reply_polls: Arc<Mutex<usize>>,
    pub failing_polls: usize,
}

impl Default for MockChannel {
    fn default() -> Self {
        Self {
            posted: Arc::new(Mutex::new(Vec::new())),
            replies: Arc::new(Mutex::new(Vec::new())),
            reaction: None,
            reaction_polls: Arc::new(Mutex::new(0)),
            reply_polls: Arc::new(Mutex::new(0)),
            failing_polls: 0,
        }
    }
}

impl MockChannel {
    pub fn reacting_from(poll: usize, name: &str) -> Self {
        Self {
            reaction: Some((poll, name.to_string())),
            ..Default::default()
        }
    }

    pub fn with_reply(self, ts: &str, text: &str, is_automated: bool) -> Self {
        self.replies.lock().unwrap().push(InboundMessage {
            author: Some(if is_automated { "B1" } else { "U1" }.to_string()),
            text: text.to_string(),
            message_ref: MessageRef::new("C1", ts),
            is_automated,
        });
        self
    }

    pub fn posted_texts(&self) -> Vec<String> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }
}

impl MessagingChannel for MockChannel {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let mut posted = self.posted.lock().unwrap();
        let channel = thread.map_or(channel, |t| t.channel.as_str()).to_string();
        let message_ref = MessageRef::new(channel.clone(), format!("{}.000100", posted.len() + 1));

        posted.push(PostedMessage {
            channel,
            text: text.to_string(),
            thread: thread.cloned(),
            message_ref: message_ref.clone(),
        });
        Ok(message_ref)
    }

    async fn get_replies(&self, _thread: &MessageRef) -> Result<Vec<InboundMessage>, ChannelError> {
        let poll = {
            let mut polls = self.reply_polls.lock().unwrap();
            *polls += 1;
            *polls
        };
        if poll <= self.failing_polls {
            return Err(ChannelError::Slack("ratelimited".into()));
        }
        Ok(self.replies.lock().unwrap().clone())
    }

    async fn get_reactions(&self, _message: &MessageRef) -> Result<HashSet<String>, ChannelError> {
        let poll = {
            let mut polls = self.reaction_polls.lock().unwrap();
            *polls += 1;
            *polls
        };
        if poll <= self.failing_polls {
            return Err(ChannelError::Slack("ratelimited".into()));
        }

        Ok(match &self.reaction {
            Some((from, name)) if poll >= *from => HashSet::from([name.clone()]),
            _ => HashSet::new(),
        })
    }
}
