use std::collections::HashSet;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};

use super::{ChannelError, InboundMessage, MessageRef, MessagingChannel};

/// Slack Web API client authenticated with a bot token
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    token: String,
    base_url: String,
    bot_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
    channel: Option<String>,
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepliesResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    messages: Vec<SlackMessage>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackMessage {
    ts: String,
    user: Option<String>,
    #[serde(default)]
    text: String,
    bot_id: Option<String>,
    subtype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReactionsResponse {
    ok: bool,
    error: Option<String>,
    message: Option<ReactedMessage>,
}

#[derive(Debug, Deserialize)]
struct ReactedMessage {
    #[serde(default)]
    reactions: Vec<Reaction>,
}

#[derive(Debug, Deserialize)]
struct Reaction {
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthIdentity {
    pub ok: bool,
    pub error: Option<String>,
    pub team: Option<String>,
    pub user: Option<String>,
    pub user_id: Option<String>,
}

impl SlackClient {
    const REPLIES_PAGE_SIZE: u32 = 200;
    const MAX_REPLY_PAGES: usize = 50;

    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            base_url: "https://slack.com/api".into(),
            bot_user_id: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Messages authored by this user id count as automated
    pub fn with_bot_user_id(mut self, user_id: Option<String>) -> Self {
        self.bot_user_id = user_id;
        self
    }

    async fn send<R: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<R, ChannelError> {
        let resp = request.bearer_auth(&self.token).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Api { status, message });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| ChannelError::Malformed(e.to_string()))
    }

    fn check(ok: bool, error: Option<String>) -> Result<(), ChannelError> {
        if ok {
            Ok(())
        } else {
            Err(ChannelError::Slack(
                error.unwrap_or_else(|| "unknown_error".into()),
            ))
        }
    }

    /// Verifies the bot token with `auth.test`
    pub async fn test_connection(&self) -> Result<AuthIdentity, ChannelError> {
        let identity: AuthIdentity = self
            .send(self.client.post(format!("{}/auth.test", self.base_url)))
            .await?;
        Self::check(identity.ok, identity.error.clone())?;

        Ok(identity)
    }
}

impl SlackMessage {
    /// Bot posts, system messages without an author, and our own messages
    fn is_automated(&self, bot_user_id: Option<&str>) -> bool {
        self.user.is_none()
            || self.bot_id.is_some()
            || self.subtype.as_deref() == Some("bot_message")
            || (bot_user_id.is_some() && self.user.as_deref() == bot_user_id)
    }
}

impl MessagingChannel for SlackClient {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let mut payload = serde_json::json!({
            "channel": channel,
            "text": text,
        });
        if let Some(thread) = thread {
            payload["channel"] = thread.channel.clone().into();
            payload["thread_ts"] = thread.ts.clone().into();
        }

        let resp: PostMessageResponse = self
            .send(
                self.client
                    .post(format!("{}/chat.postMessage", self.base_url))
                    .json(&payload),
            )
            .await?;
        Self::check(resp.ok, resp.error)?;

        match (resp.channel, resp.ts) {
            (Some(channel), Some(ts)) => Ok(MessageRef { channel, ts }),
            _ => Err(ChannelError::Malformed(
                "chat.postMessage response without channel or ts".into(),
            )),
        }
    }

    /// Every reply in the thread, following `next_cursor` across pages
    async fn get_replies(&self, thread: &MessageRef) -> Result<Vec<InboundMessage>, ChannelError> {
        let limit = Self::REPLIES_PAGE_SIZE.to_string();
        let mut cursor: Option<String> = None;
        let mut replies = Vec::new();

        for _ in 0..Self::MAX_REPLY_PAGES {
            let mut request = self
                .client
                .get(format!("{}/conversations.replies", self.base_url))
                .query(&[
                    ("channel", thread.channel.as_str()),
                    ("ts", thread.ts.as_str()),
                    ("limit", limit.as_str()),
                ]);
            if let Some(cursor) = &cursor {
                request = request.query(&[("cursor", cursor.as_str())]);
            }

            let resp: RepliesResponse = self.send(request).await?;
            Self::check(resp.ok, resp.error)?;

            replies.extend(
                resp.messages
                    .into_iter()
                    .filter(|msg| msg.ts != thread.ts)
                    .map(|msg| InboundMessage {
                        is_automated: msg.is_automated(self.bot_user_id.as_deref()),
                        author: msg.user,
                        text: msg.text,
                        message_ref: MessageRef::new(thread.channel.clone(), msg.ts),
                    }),
            );

            cursor = resp
                .response_metadata
                .and_then(|meta| meta.next_cursor)
                .filter(|next| !next.is_empty());
            if cursor.is_none() {
                return Ok(replies);
            }
        }

        tracing::warn!(thread = %thread.ts, pages = Self::MAX_REPLY_PAGES, "Thread reply pages truncated");
        Ok(replies)
    }

    async fn get_reactions(&self, message: &MessageRef) -> Result<HashSet<String>, ChannelError> {
        let resp: ReactionsResponse = self
            .send(
                self.client
                    .get(format!("{}/reactions.get", self.base_url))
                    .query(&[
                        ("channel", message.channel.as_str()),
                        ("timestamp", message.ts.as_str()),
                    ]),
            )
            .await?;

        if !resp.ok && resp.error.as_deref() == Some("no_reaction") {
            return Ok(HashSet::new());
        }
        Self::check(resp.ok, resp.error)?;

        Ok(resp
            .message
            .map(|m| m.reactions.into_iter().map(|r| r.name).collect())
            .unwrap_or_default())
    }
}
