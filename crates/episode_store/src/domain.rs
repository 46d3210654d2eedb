use std::{collections::BTreeMap, path::PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted record of one in-flight publish watch.
///
/// The record doubles as the lock and the cancellation channel for the
/// watcher: whoever holds a loadable record owns the watch, and deleting it
/// cancels the watch at the next poll boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchState {
    pub channel: String,
    /// Message that is watched for the publish reaction
    pub message_ref: String,
    /// Thread that is watched for a publish reply. `None` restricts the
    /// watch to the reaction trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ref: Option<String>,
    pub payload: PublishPayload,
    pub created_at: DateTime<Utc>,
}

/// Parameters needed to perform the eventual publish action
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PublishPayload {
    pub output_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// The fixed set of text artifacts written for every generation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Artifact {
    SelectedTitle,
    YoutubeDescription,
    Keywords,
    NewsletterTeaser,
    BlogPost,
    DescriptionComponents,
    FullResponse,
}

impl Artifact {
    pub const ALL: [Artifact; 7] = [
        Artifact::SelectedTitle,
        Artifact::YoutubeDescription,
        Artifact::Keywords,
        Artifact::NewsletterTeaser,
        Artifact::BlogPost,
        Artifact::DescriptionComponents,
        Artifact::FullResponse,
    ];

    pub const fn file_name(self) -> &'static str {
        match self {
            Artifact::SelectedTitle => "SELECTED_TITLE.txt",
            Artifact::YoutubeDescription => "youtube_description.txt",
            Artifact::Keywords => "keywords.txt",
            Artifact::NewsletterTeaser => "newsletter_teaser.txt",
            Artifact::BlogPost => "linkedin_blog_post.txt",
            Artifact::DescriptionComponents => "description_components.txt",
            Artifact::FullResponse => "full_response.txt",
        }
    }
}

/// Rendered artifacts of one generation cycle, destined for one output
/// directory named `dir_name`.
#[derive(Debug, Clone, Default)]
pub struct ArtifactBundle {
    pub dir_name: String,
    entries: BTreeMap<Artifact, String>,
}

impl ArtifactBundle {
    pub fn new(dir_name: impl Into<String>) -> Self {
        Self {
            dir_name: dir_name.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, artifact: Artifact, contents: impl Into<String>) {
        self.entries.insert(artifact, contents.into());
    }

    pub fn get(&self, artifact: Artifact) -> Option<&str> {
        self.entries.get(&artifact).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Artifact, &str)> {
        self.entries.iter().map(|(a, c)| (*a, c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
