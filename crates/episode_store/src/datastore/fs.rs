use std::{
    cmp::Reverse,
    collections::HashSet,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::Context;
use itertools::Itertools;
use regex::Regex;

use crate::{
    datastore::{ArtifactStore, WatchStateStore},
    Artifact, ArtifactBundle, WatchState,
};

static UNSAFE_DIR_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w.-]+").unwrap());

const PROCESSED_LEDGER: &str = ".processed_transcripts.json";

/// Replaces anything that is not a word character, `.` or `-` with a single
/// `-` so the name is always a single path component.
fn sanitize_dir_name(name: &str) -> String {
    let cleaned = UNSAFE_DIR_CHARS.replace_all(name.trim(), "-");
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.');
    if cleaned.is_empty() {
        "episode".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Artifact store rooted at the configured outputs directory
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates the outputs directory if it does not exist yet
    pub async fn init(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, path = %root.display(), "Failed to create outputs directory"))
            .with_context(|| format!("Failed to create outputs directory {}", root.display()))?;

        Ok(FsArtifactStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ledger_path(&self) -> PathBuf {
        self.root.join(PROCESSED_LEDGER)
    }

    async fn read_ledger(&self) -> anyhow::Result<Vec<String>> {
        match tokio::fs::read(self.ledger_path()).await {
            Ok(bytes) => serde_json::from_slice(&bytes).context("Malformed processed transcripts ledger"),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).context("Failed to read processed transcripts ledger"),
        }
    }
}

impl ArtifactStore for FsArtifactStore {
    async fn save_bundle(&self, bundle: &ArtifactBundle) -> anyhow::Result<PathBuf> {
        let output_dir = self.root.join(sanitize_dir_name(&bundle.dir_name));
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        for (artifact, contents) in bundle.iter() {
            let path = output_dir.join(artifact.file_name());
            tokio::fs::write(&path, contents)
                .await
                .inspect_err(|e| tracing::error!(error = ?e, path = %path.display(), "Failed to write artifact"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        tracing::info!(path = %output_dir.display(), artifacts = bundle.len(), "Saved artifacts");
        Ok(output_dir)
    }

    async fn load_artifact(
        &self,
        output_dir: &Path,
        artifact: Artifact,
    ) -> anyhow::Result<Option<String>> {
        let path = output_dir.join(artifact.file_name());
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn latest_output_dir(&self) -> anyhow::Result<Option<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to list outputs directory"),
        };

        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                dirs.push((metadata.modified()?, entry.path()));
            }
        }

        Ok(dirs
            .into_iter()
            .sorted_by_key(|(modified, _)| Reverse(*modified))
            .map(|(_, path)| path)
            .next())
    }

    async fn processed_transcripts(&self) -> anyhow::Result<HashSet<String>> {
        Ok(self.read_ledger().await?.into_iter().collect())
    }

    async fn mark_processed(&self, transcript_name: &str) -> anyhow::Result<()> {
        let mut names = self.read_ledger().await?;
        if names.iter().any(|n| n == transcript_name) {
            return Ok(());
        }
        names.push(transcript_name.to_string());

        let json = serde_json::to_vec_pretty(&names)?;
        tokio::fs::write(self.ledger_path(), json)
            .await
            .context("Failed to write processed transcripts ledger")?;

        Ok(())
    }
}

/// Watch record stored as a single JSON file.
///
/// Deleting the file, by this process or by hand, is how a watch is cancelled.
/// Only one watch lives at a path; `create` fails while a record is present.
#[derive(Debug, Clone)]
pub struct FileWatchStateStore {
    path: PathBuf,
}

impl FileWatchStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self, state: &WatchState) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", sanitize_dir_name(&state.message_ref)));
        self.path.with_file_name(name)
    }
}

impl WatchStateStore for FileWatchStateStore {
    async fn create(&self, state: &WatchState) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // readers never see a partial record, and a live record is never replaced
        let staging = self.staging_path(state);
        let json = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&staging, json)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        let linked = tokio::fs::hard_link(&staging, &self.path).await;
        let _ = tokio::fs::remove_file(&staging).await;

        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::warn!(path = %self.path.display(), "A publish watch is already active");
                anyhow::bail!("A publish watch is already active at {}", self.path.display());
            }
            Err(e) => {
                tracing::error!(error = ?e, path = %self.path.display(), "Failed to persist watch state");
                return Err(e).with_context(|| {
                    format!("Failed to persist watch state to {}", self.path.display())
                });
            }
        }

        tracing::info!(path = %self.path.display(), "Watch state created");
        Ok(())
    }

    async fn load(&self) -> anyhow::Result<Option<WatchState>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let state = serde_json::from_slice(&bytes).with_context(|| {
                    format!("Malformed watch state in {}", self.path.display())
                })?;
                Ok(Some(state))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    async fn exists(&self) -> anyhow::Result<bool> {
        tokio::fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to stat {}", self.path.display()))
    }

    async fn delete(&self) -> anyhow::Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Watch state deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", self.path.display())),
        }
    }
}
