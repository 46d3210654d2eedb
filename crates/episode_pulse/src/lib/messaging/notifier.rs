use std::path::Path;

use chrono::{DateTime, Utc};

use super::{ChannelError, MessageRef, MessagingChannel};
use crate::publish::PostInfo;

/// Human-facing status messages for one conversation
pub struct Notifier<M> {
    channel: M,
    target: String,
}

impl<M: MessagingChannel> Notifier<M> {
    pub fn new(channel: M, target: impl Into<String>) -> Self {
        Self {
            channel,
            target: target.into(),
        }
    }

    pub fn messaging(&self) -> &M {
        &self.channel
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub async fn post(
        &self,
        text: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        self.channel
            .post_message(&self.target, text, thread)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to post notification"))
    }

    /// Opens the thread the rest of a transcript's messages go into
    pub async fn processing_started(&self, filename: &str) -> Result<MessageRef, ChannelError> {
        let text = format!(
            "🎬 *Episode Pulse*\n\nProcessing: `{filename}`\nStatus: Generating title options..."
        );
        self.post(&text, None).await
    }

    pub async fn title_options(
        &self,
        titles: &[String],
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let options = titles
            .iter()
            .enumerate()
            .map(|(i, title)| format!("{}. {title}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        let text = format!(
            "📝 *Title Options Ready!*\n\n{options}\n\n*Reply with:*\n• A number (1-{}) to select that title\n• 'f' followed by feedback for new titles\n• 'TITLE: Your Custom Title Here'\n• 'cancel' to skip this transcript\n\n_Waiting for your response..._",
            titles.len()
        );
        self.post(&text, thread).await
    }

    pub async fn invalid_reply(&self, thread: Option<&MessageRef>) -> Result<MessageRef, ChannelError> {
        let text = "⚠️ Invalid response. Please reply with:\n• A number (1-5)\n• 'f' for feedback\n• 'TITLE: Your Title'\n• 'cancel'";
        self.post(text, thread).await
    }

    pub async fn confirm_title(
        &self,
        title: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let text = format!("❓ Use this title?\n`{title}`\n\nReply 'yes' to confirm or 'no' to pick again.");
        self.post(&text, thread).await
    }

    pub async fn invalid_confirmation(
        &self,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        self.post("⚠️ Please reply 'yes' or 'no'.", thread).await
    }

    pub async fn title_selected(
        &self,
        title: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let text = format!("✅ *Selected Title*\n`{title}`\n\n📝 Generating description and newsletter...");
        self.post(&text, thread).await
    }

    pub async fn regenerating(&self, thread: Option<&MessageRef>) -> Result<MessageRef, ChannelError> {
        self.post("🔄 Generating new titles based on your feedback...", thread)
            .await
    }

    pub async fn cancelled(
        &self,
        filename: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let text = format!(
            "⚠️ *Processing Cancelled*\n\nFile: `{filename}`\n\nThe transcript was not processed."
        );
        self.post(&text, thread).await
    }

    pub async fn error(
        &self,
        filename: &str,
        message: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let text = format!(
            "❌ *Error Processing Transcript*\n\nFile: `{filename}`\nError: `{message}`\n\nPlease check your configuration and try again."
        );
        self.post(&text, thread).await
    }

    /// Completion notice; this is the message the publish reaction goes on
    pub async fn completion(
        &self,
        output_path: &Path,
        reaction: &str,
        reply_command: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let text = format!(
            "✅ *Processing Complete!*\n\n📁 Outputs saved to:\n`{}`\n\n*Files created:*\n• SELECTED_TITLE.txt\n• youtube_description.txt\n• linkedin_blog_post.txt\n• newsletter_teaser.txt\n• keywords.txt\n• description_components.txt\n\n*To publish the blog post:* react with :{reaction}: to this message or reply '{reply_command}' in this thread.",
            output_path.display()
        );
        self.post(&text, thread).await
    }

    /// Completion notice when no publish watch can be started for the episode
    pub async fn completion_manual_publish(
        &self,
        output_path: &Path,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let text = format!(
            "✅ *Processing Complete!*\n\n📁 Outputs saved to:\n`{path}`\n\nAnother episode is still waiting for its publish trigger. Publish this one manually with:\n`episode-pulse publish --output {path}`",
            path = output_path.display()
        );
        self.post(&text, thread).await
    }

    pub async fn publishing(&self, thread: Option<&MessageRef>) -> Result<MessageRef, ChannelError> {
        self.post(
            "📤 *Publishing blog post...*\n\nThis may take a moment...",
            thread,
        )
        .await
    }

    pub async fn publish_succeeded(
        &self,
        post: &PostInfo,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let text = format!(
            "✅ *Blog Post Created!*\n\n📝 *Title:* {}\n🔗 *Edit URL:* {}\n📺 *Video:* {}\n📊 *Status:* Draft (ready for review)\n\nThe post has been created as a draft. Review and publish it when ready!",
            post.title,
            post.edit_url,
            post.video_url.as_deref().unwrap_or("N/A"),
        );
        self.post(&text, thread).await
    }

    pub async fn publish_failed(
        &self,
        message: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let text = format!(
            "❌ *Blog Publishing Failed*\n\nError: `{message}`\n\nYou can retry manually with:\n`episode-pulse publish`"
        );
        self.post(&text, thread).await
    }

    pub async fn timed_out(
        &self,
        horizon_hours: i64,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let text = format!(
            "⏰ *Publish window closed*\n\nNo publish trigger within {horizon_hours} hours. You can still publish manually with:\n`episode-pulse publish`"
        );
        self.post(&text, thread).await
    }

    pub async fn connection_test(&self, now: DateTime<Utc>) -> Result<MessageRef, ChannelError> {
        let text = format!(
            "🧪 *Slack Integration Test*\n\nTime: {}\nStatus: ✅ Connected\n\nYour Episode Pulse Slack integration is working!",
            now.format("%Y-%m-%d %H:%M:%S UTC")
        );
        self.post(&text, None).await
    }
}
