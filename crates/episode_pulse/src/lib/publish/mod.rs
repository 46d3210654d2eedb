use std::future::Future;

use episode_store::{Artifact, ArtifactStore, PublishPayload};
use pulldown_cmark::{html, Options, Parser};

pub mod coordinator;
pub mod wordpress;

pub use coordinator::{PublishCoordinator, PublishResult};
pub use wordpress::{WordPressClient, WordPressError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftPost {
    pub post_id: u64,
    pub edit_url: String,
    pub public_url: String,
}

/// A published episode as reported back to humans
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInfo {
    pub post_id: u64,
    pub title: String,
    pub edit_url: String,
    pub public_url: String,
    pub video_url: Option<String>,
}

/// Blog platform that accepts draft posts
pub trait BlogBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_draft_post(
        &self,
        title: &str,
        html_content: &str,
        image: Option<Vec<u8>>,
    ) -> impl Future<Output = Result<DraftPost, Self::Error>> + Send;

    /// Returns a short description of the authenticated account
    fn test_connection(&self) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

impl<T: BlogBackend + Send + Sync> BlogBackend for &T {
    type Error = T::Error;

    async fn create_draft_post(
        &self,
        title: &str,
        html_content: &str,
        image: Option<Vec<u8>>,
    ) -> Result<DraftPost, Self::Error> {
        (**self).create_draft_post(title, html_content, image).await
    }

    async fn test_connection(&self) -> Result<String, Self::Error> {
        (**self).test_connection().await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("No title found in payload or SELECTED_TITLE.txt")]
    NoTitle,
    #[error("Blog post not found in {0}")]
    MissingBlogPost(String),
    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),
    #[error("Blog backend error: {0}")]
    Backend(String),
}

/// The side effect a completed watch triggers
pub trait PublishAction {
    fn publish(
        &self,
        payload: &PublishPayload,
    ) -> impl Future<Output = Result<PostInfo, PublishError>> + Send;
}

impl<T: PublishAction + Send + Sync> PublishAction for &T {
    async fn publish(&self, payload: &PublishPayload) -> Result<PostInfo, PublishError> {
        (**self).publish(payload).await
    }
}

/// Markdown to HTML for the blog body
pub fn render_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Replaces the video placeholders the model leaves in links
pub fn substitute_video_url(markdown: &str, video_url: &str) -> String {
    markdown
        .replace("{{YOUTUBE_URL}}", video_url)
        .replace("{YOUTUBE_URL}", video_url)
}

/// First line of `SELECTED_TITLE.txt` that is neither blank nor a banner
pub fn title_from_artifact(contents: &str) -> Option<String> {
    contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('='))
        .map(str::to_string)
}

/// Publishes an output directory's blog post as a draft
pub struct Publisher<B, S> {
    backend: B,
    store: S,
    http: reqwest::Client,
    title_prefix: String,
}

impl<B, S> Publisher<B, S>
where
    B: BlogBackend + Send + Sync,
    S: ArtifactStore + Send + Sync,
{
    pub fn new(backend: B, store: S, title_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            store,
            http: reqwest::Client::new(),
            title_prefix: title_prefix.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn resolve_title(&self, payload: &PublishPayload) -> Result<String, PublishError> {
        if let Some(title) = payload.selected_title.as_deref().map(str::trim) {
            if !title.is_empty() {
                return Ok(title.to_string());
            }
        }

        self.store
            .load_artifact(&payload.output_path, Artifact::SelectedTitle)
            .await?
            .as_deref()
            .and_then(title_from_artifact)
            .ok_or(PublishError::NoTitle)
    }

    async fn fetch_thumbnail(&self, url: &str) -> Option<Vec<u8>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .inspect_err(|e| tracing::warn!(error = %e, %url, "Could not download thumbnail"))
            .ok()?;

        resp.bytes()
            .await
            .inspect_err(|e| tracing::warn!(error = %e, %url, "Could not read thumbnail"))
            .ok()
            .map(|b| b.to_vec())
    }
}

impl<B, S> PublishAction for Publisher<B, S>
where
    B: BlogBackend + Send + Sync,
    S: ArtifactStore + Send + Sync,
{
    #[tracing::instrument(skip_all, fields(output = %payload.output_path.display()))]
    async fn publish(&self, payload: &PublishPayload) -> Result<PostInfo, PublishError> {
        let title = self.resolve_title(payload).await?;

        let markdown = self
            .store
            .load_artifact(&payload.output_path, Artifact::BlogPost)
            .await?
            .filter(|body| !body.trim().is_empty())
            .ok_or_else(|| {
                PublishError::MissingBlogPost(payload.output_path.display().to_string())
            })?;

        let markdown = match payload.video_url.as_deref() {
            Some(url) => substitute_video_url(&markdown, url),
            None => {
                tracing::warn!("No video URL in payload, leaving placeholders in place");
                markdown
            }
        };
        let html_content = render_html(&markdown);

        let image = match payload.thumbnail_url.as_deref() {
            Some(url) => self.fetch_thumbnail(url).await,
            None => None,
        };

        let post_title = format!("{}: {title}", self.title_prefix);
        tracing::info!(title = %post_title, "Creating draft post");

        let draft = self
            .backend
            .create_draft_post(&post_title, &html_content, image)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to create draft post"))
            .map_err(|e| PublishError::Backend(e.to_string()))?;

        Ok(PostInfo {
            post_id: draft.post_id,
            title: post_title,
            edit_url: draft.edit_url,
            public_url: draft.public_url,
            video_url: payload.video_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_html() {
        let html = render_html("☕️ First Cup: Title\n\nSome **bold** and *italic* with [a link](https://x.test).\n\n## Takeaway");

        assert!(html.contains("<p>☕️ First Cup: Title</p>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
        assert!(html.contains(r#"<a href="https://x.test">a link</a>"#));
        assert!(html.contains("<h2>Takeaway</h2>"));
    }

    #[test]
    fn test_substitute_video_url_both_forms() {
        let out = substitute_video_url(
            "[Watch]({{YOUTUBE_URL}}) or [here]({YOUTUBE_URL})",
            "https://youtu.be/abc",
        );
        assert_eq!(
            out,
            "[Watch](https://youtu.be/abc) or [here](https://youtu.be/abc)"
        );
    }

    #[test]
    fn test_title_from_artifact() {
        assert_eq!(
            title_from_artifact("=== SELECTED TITLE ===\n\nWhy Teams Stall\n"),
            Some("Why Teams Stall".into())
        );
        assert_eq!(title_from_artifact("===\n\n"), None);
    }
}
