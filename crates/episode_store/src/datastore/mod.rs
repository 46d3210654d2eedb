use std::{
    collections::HashSet,
    future::Future,
    path::{Path, PathBuf},
};

use crate::{Artifact, ArtifactBundle, WatchState};

pub mod fs;

pub trait ArtifactStore {
    /// Writes every artifact of the bundle and returns the output directory
    fn save_bundle(
        &self,
        bundle: &ArtifactBundle,
    ) -> impl Future<Output = anyhow::Result<PathBuf>> + Send;

    fn load_artifact(
        &self,
        output_dir: &Path,
        artifact: Artifact,
    ) -> impl Future<Output = anyhow::Result<Option<String>>> + Send;

    fn latest_output_dir(&self) -> impl Future<Output = anyhow::Result<Option<PathBuf>>> + Send;

    fn processed_transcripts(&self)
        -> impl Future<Output = anyhow::Result<HashSet<String>>> + Send;

    fn mark_processed(&self, transcript_name: &str)
        -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl<T: ArtifactStore + Send + Sync> ArtifactStore for &T {
    async fn save_bundle(&self, bundle: &ArtifactBundle) -> anyhow::Result<PathBuf> {
        (**self).save_bundle(bundle).await
    }

    async fn load_artifact(
        &self,
        output_dir: &Path,
        artifact: Artifact,
    ) -> anyhow::Result<Option<String>> {
        (**self).load_artifact(output_dir, artifact).await
    }

    async fn latest_output_dir(&self) -> anyhow::Result<Option<PathBuf>> {
        (**self).latest_output_dir().await
    }

    async fn processed_transcripts(&self) -> anyhow::Result<HashSet<String>> {
        (**self).processed_transcripts().await
    }

    async fn mark_processed(&self, transcript_name: &str) -> anyhow::Result<()> {
        (**self).mark_processed(transcript_name).await
    }
}

/// Durable home of the single in-flight [`WatchState`].
///
/// Implementations must make `create` atomic: a concurrent `load` observes
/// either no record or a complete one.
pub trait WatchStateStore {
    /// Fails when a record already exists
    fn create(&self, state: &WatchState) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// `Ok(None)` when no record exists
    fn load(&self) -> impl Future<Output = anyhow::Result<Option<WatchState>>> + Send;

    fn exists(&self) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// Returns whether a record was actually removed
    fn delete(&self) -> impl Future<Output = anyhow::Result<bool>> + Send;
}

impl<T: WatchStateStore + Send + Sync> WatchStateStore for &T {
    async fn create(&self, state: &WatchState) -> anyhow::Result<()> {
        (**self).create(state).await
    }

    async fn load(&self) -> anyhow::Result<Option<WatchState>> {
        (**self).load().await
    }

    async fn exists(&self) -> anyhow::Result<bool> {
        (**self).exists().await
    }

    async fn delete(&self) -> anyhow::Result<bool> {
        (**self).delete().await
    }
}
