use std::sync::{Arc, Mutex};

use episode_pulse::publish::{
    BlogBackend, DraftPost, PostInfo, PublishAction, PublishError,
};
use episode_store::PublishPayload;

#[derive(Clone, Default)]
pub struct MockPublisher {
    pub calls: Arc<Mutex<Vec<PublishPayload>>>,
    pub fail_with: Option<String>,
}

impl MockPublisher {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl PublishAction for MockPublisher {
    async fn publish(&self, payload: &PublishPayload) -> Result<PostInfo, PublishError> {
        self.calls.lock().unwrap().push(payload.clone());
        if let Some(ref msg) = self.fail_with {
            return Err(PublishError::Backend(msg.clone()));
        }

        Ok(PostInfo {
            post_id: 7,
            title: format!(
                "First Cup: {}",
                payload.selected_title.as_deref().unwrap_or_default()
            ),
            edit_url: "https://blog.test/wp-admin/post.php?post=7&action=edit".into(),
            public_url: "https://blog.test/?p=7".into(),
            video_url: payload.video_url.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftCall {
    pub title: String,
    pub html: String,
    pub image: Option<Vec<u8>>,
}

#[derive(Clone, Default)]
pub struct MockBlog {
    pub drafts: Arc<Mutex<Vec<DraftCall>>>,
}

impl BlogBackend for MockBlog {
    type Error = std::io::Error;

    async fn create_draft_post(
        &self,
        title: &str,
        html_content: &str,
        image: Option<Vec<u8>>,
    ) -> Result<DraftPost, Self::Error> {
        let mut drafts = self.drafts.lock().unwrap();
        drafts.push(DraftCall {
            title: title.to_string(),
            html: html_content.to_string(),
            image,
        });

        let post_id = drafts.len() as u64;
        Ok(DraftPost {
            post_id,
            edit_url: format!("https://blog.test/wp-admin/post.php?post={post_id}&action=edit"),
            public_url: format!("https://blog.test/?p={post_id}"),
        })
    }

    async fn test_connection(&self) -> Result<String, Self::Error> {
        Ok("Connected as Mock".into())
    }
}
