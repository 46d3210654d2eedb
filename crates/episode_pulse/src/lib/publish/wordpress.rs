use std::sync::LazyLock;

use regex::Regex;
use reqwest::{
    header::{CONTENT_DISPOSITION, CONTENT_TYPE, USER_AGENT},
    Client, RequestBuilder, Response,
};
use serde::Deserialize;
use tokio::sync::OnceCell;

use super::{BlogBackend, DraftPost};
use crate::{
    config::{BlogConfig, Secrets},
    error::Error,
};

static SLUG_STRIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SLUG_JOIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// WordPress REST API client authenticated with an application password
pub struct WordPressClient {
    client: Client,
    site_url: String,
    username: String,
    app_password: String,
    category_name: String,
    category_id: OnceCell<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum WordPressError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct WpUser {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WpCategory {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WpMedia {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct WpPost {
    id: u64,
    #[serde(default)]
    link: String,
}

/// Lowercase, hyphenated, at most 50 characters
pub fn slugify(text: &str) -> String {
    let stripped = SLUG_STRIP_RE.replace_all(text, "");
    let joined = SLUG_JOIN_RE.replace_all(stripped.trim(), "-");
    joined.to_lowercase().chars().take(50).collect()
}

impl WordPressClient {
    const USER_AGENT: &'static str = concat!("episode-pulse/", env!("CARGO_PKG_VERSION"));

    pub fn new(
        site_url: impl Into<String>,
        username: impl Into<String>,
        app_password: impl Into<String>,
    ) -> Self {
        let site_url: String = site_url.into();
        Self {
            client: Client::new(),
            site_url: site_url.trim_end_matches('/').to_string(),
            username: username.into(),
            app_password: app_password.into(),
            category_name: "First Cup".into(),
            category_id: OnceCell::new(),
        }
    }

    /// Client from `WP_SITE_URL`, `WP_USERNAME` and `WP_APP_PASSWORD`
    pub fn from_secrets(secrets: &Secrets, blog: &BlogConfig) -> Result<Self, Error> {
        match (&secrets.wp_site_url, &secrets.wp_username, &secrets.wp_app_password) {
            (Some(site), Some(user), Some(password)) => {
                Ok(Self::new(site, user, password).with_category(&blog.category))
            }
            _ => Err(Error::Config(
                "WP_SITE_URL, WP_USERNAME and WP_APP_PASSWORD must all be set".into(),
            )),
        }
    }

    pub fn with_category(mut self, name: impl Into<String>) -> Self {
        self.category_name = name.into();
        self
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/wp-json/wp/v2/{endpoint}", self.site_url)
    }

    pub fn edit_url(&self, post_id: u64) -> String {
        format!("{}/wp-admin/post.php?post={post_id}&action=edit", self.site_url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.username, Some(&self.app_password))
            .header(USER_AGENT, Self::USER_AGENT)
    }

    async fn checked(resp: Response) -> Result<Response, WordPressError> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(WordPressError::Api { status, message });
        }
        Ok(resp)
    }

    async fn lookup_or_create_category(&self) -> Result<u64, WordPressError> {
        let resp = self
            .authed(self.client.get(self.api_url("categories")))
            .query(&[("search", self.category_name.as_str())])
            .send()
            .await?;
        let categories = Self::checked(resp).await?.json::<Vec<WpCategory>>().await?;

        if let Some(existing) = categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&self.category_name))
        {
            return Ok(existing.id);
        }

        tracing::info!(category = %self.category_name, "Creating blog category");
        let body = serde_json::json!({
            "name": self.category_name,
            "slug": slugify(&self.category_name),
        });
        let resp = self
            .authed(self.client.post(self.api_url("categories")))
            .json(&body)
            .send()
            .await?;

        Ok(Self::checked(resp).await?.json::<WpCategory>().await?.id)
    }

    /// Category id, looked up or created once per client
    pub async fn category_id(&self) -> Result<u64, WordPressError> {
        self.category_id
            .get_or_try_init(|| self.lookup_or_create_category())
            .await
            .copied()
    }

    pub async fn upload_image(&self, title: &str, bytes: Vec<u8>) -> Result<u64, WordPressError> {
        let file_name = format!("first-cup-{}.jpg", slugify(title));
        let resp = self
            .authed(self.client.post(self.api_url("media")))
            .header(CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\""))
            .header(CONTENT_TYPE, "image/jpeg")
            .body(bytes)
            .send()
            .await?;

        Ok(Self::checked(resp).await?.json::<WpMedia>().await?.id)
    }
}

impl BlogBackend for WordPressClient {
    type Error = WordPressError;

    async fn create_draft_post(
        &self,
        title: &str,
        html_content: &str,
        image: Option<Vec<u8>>,
    ) -> Result<DraftPost, Self::Error> {
        let category = self
            .category_id()
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Could not resolve category, posting without it"))
            .ok();

        let featured_media = match image {
            Some(bytes) => self
                .upload_image(title, bytes)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "Could not upload featured image"))
                .ok(),
            None => None,
        };

        let mut body = serde_json::json!({
            "title": title,
            "content": html_content,
            "status": "draft",
            "format": "standard",
        });
        if let Some(category) = category {
            body["categories"] = serde_json::json!([category]);
        }
        if let Some(media) = featured_media {
            body["featured_media"] = media.into();
        }

        let resp = self
            .authed(self.client.post(self.api_url("posts")))
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;
        let post = Self::checked(resp).await?.json::<WpPost>().await?;

        tracing::info!(post_id = post.id, "Created draft post");

        Ok(DraftPost {
            post_id: post.id,
            edit_url: self.edit_url(post.id),
            public_url: post.link,
        })
    }

    async fn test_connection(&self) -> Result<String, Self::Error> {
        let resp = self
            .authed(self.client.get(self.api_url("users/me")))
            .send()
            .await?;
        let user = Self::checked(resp).await?.json::<WpUser>().await?;

        Ok(format!("Connected as {}", user.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Are We in an AI Bubble?"), "are-we-in-an-ai-bubble");
        assert_eq!(slugify("  First   Cup  "), "first-cup");
        assert_eq!(slugify(&"long ".repeat(20)).len(), 50);
    }

    #[test]
    fn test_urls() {
        let client = WordPressClient::new("https://blog.test/", "me", "pw");
        assert_eq!(
            client.api_url("posts"),
            "https://blog.test/wp-json/wp/v2/posts"
        );
        assert_eq!(
            client.edit_url(42),
            "https://blog.test/wp-admin/post.php?post=42&action=edit"
        );
    }
}
