use std::path::{Path, PathBuf};

use anyhow::Context;
use episode_store::{ArtifactStore, PublishPayload, WatchState, WatchStateStore};
use itertools::Itertools;

use crate::{
    artifacts,
    clock::Clock,
    config::AppConfig,
    error::Error,
    llm::{prompts, GenerationRequest, Generator},
    messaging::{notifier::Notifier, MessageRef, MessagingChannel},
    negotiation::{negotiate, SelectionOutcome, SelectionStrategy, TitleGenerator},
    parser,
};

pub mod builder;

const TRANSCRIPT_EXTENSIONS: [&str; 3] = ["txt", "md", "json"];

/// How one transcript left the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Completed {
        output_dir: PathBuf,
        title: String,
        /// Present when a publish trigger is now awaitable
        watch: Option<WatchState>,
    },
    Cancelled,
}

/// Turns transcripts into the full set of episode artifacts.
///
/// One run: notify, negotiate a title, generate content, extract sections,
/// save, record the transcript as processed and hand off to a publish watch.
pub struct EpisodeProcessor<S, G, Y, W, M, C> {
    pub(crate) config: AppConfig,
    pub(crate) store: S,
    pub(crate) generator: G,
    pub(crate) strategy: Y,
    pub(crate) watch_store: W,
    pub(crate) notifier: Option<Notifier<M>>,
    pub(crate) clock: C,
}

impl<S, G, Y, W, M, C> EpisodeProcessor<S, G, Y, W, M, C>
where
    S: ArtifactStore + Send + Sync,
    G: Generator + Send + Sync,
    Y: SelectionStrategy + Send + Sync,
    W: WatchStateStore + Send + Sync,
    M: MessagingChannel + Send + Sync,
    C: Clock + Send + Sync,
{
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn is_reserved(&self, path: &Path) -> bool {
        let templates = &self.config.templates;
        [&templates.youtube_description, &templates.newsletter_examples]
            .iter()
            .any(|reserved| reserved.file_name() == path.file_name())
            || path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with('.'))
    }

    /// Transcripts in the transcripts directory not yet in the ledger
    #[tracing::instrument(skip(self))]
    pub async fn pending_transcripts(&self) -> anyhow::Result<Vec<PathBuf>> {
        let dir = &self.config.directories.transcripts;
        let processed = self.store.processed_transcripts().await?;

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to list {}", dir.display()))?;

        let mut pending = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_transcript = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| TRANSCRIPT_EXTENSIONS.contains(&ext));
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };

            if is_transcript && !self.is_reserved(&path) && !processed.contains(&name) {
                pending.push(path);
            }
        }

        Ok(pending.into_iter().sorted().collect())
    }

    async fn generate_content(
        &self,
        transcript: &str,
        title: &str,
        examples: Option<&str>,
    ) -> Result<String, Error> {
        let generation = &self.config.generation;
        let today = self.clock.now().with_timezone(&generation.timezone).date_naive();
        let request = GenerationRequest {
            prompt: prompts::content(transcript, title, examples, today),
            model: generation.model.clone(),
            max_tokens: generation.content_max_tokens,
        };

        self.generator
            .generate(request)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Content generation failed"))
            .map_err(|e| Error::Generation(e.to_string()))
    }

    /// Runs the pipeline for one transcript.
    ///
    /// Failures are reported to the messaging channel before being returned.
    #[tracing::instrument(skip_all, fields(transcript = %path.display()))]
    pub async fn process_transcript(&self, path: &Path) -> anyhow::Result<ProcessOutcome> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Not a transcript file: {}", path.display()))?;

        let thread = match &self.notifier {
            Some(notifier) => notifier.processing_started(&file_name).await.ok(),
            None => None,
        };

        match self.run_pipeline(path, &file_name, thread.as_ref()).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(error = ?e, "Failed to process transcript");
                if let Some(notifier) = &self.notifier {
                    let _ = notifier.error(&file_name, &e.to_string(), thread.as_ref()).await;
                }
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        path: &Path,
        file_name: &str,
        thread: Option<&MessageRef>,
    ) -> anyhow::Result<ProcessOutcome> {
        let transcript = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read transcript {}", path.display()))?;
        tracing::info!(chars = transcript.len(), "Loaded transcript");

        let examples =
            artifacts::load_newsletter_examples(&self.config.templates.newsletter_examples).await?;

        let generation = &self.config.generation;
        let titles = TitleGenerator::new(
            &self.generator,
            generation.title_max_tokens,
            generation.title_max_chars,
            generation.timezone,
        )
        .with_model(generation.model.clone());

        let title = match negotiate(&transcript, &titles, &self.strategy).await? {
            SelectionOutcome::Selected(title) => title,
            SelectionOutcome::Cancelled => {
                if let Some(notifier) = &self.notifier {
                    let _ = notifier.cancelled(file_name, thread).await;
                }
                self.store.mark_processed(file_name).await?;
                return Ok(ProcessOutcome::Cancelled);
            }
        };

        let response = self
            .generate_content(&transcript, &title, examples.as_deref())
            .await?;

        let extraction = parser::extract(&response);
        for warning in &extraction.warnings {
            tracing::warn!(%warning, "Content extraction warning");
        }

        let template =
            artifacts::load_description_template(&self.config.templates.youtube_description)
                .await?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        let now = self.clock.now().with_timezone(&generation.timezone);
        let bundle =
            artifacts::render_bundle(&stem, now, &title, &extraction, &template, &response);

        let output_dir = self
            .store
            .save_bundle(&bundle)
            .await
            .context("Failed to save artifacts")?;
        self.store.mark_processed(file_name).await?;

        let watch = self.hand_off(&output_dir, &title, thread).await;

        Ok(ProcessOutcome::Completed {
            output_dir,
            title,
            watch,
        })
    }

    /// Posts the completion notice and records the watch on it.
    ///
    /// While another watch is live the episode is left for manual publishing.
    async fn hand_off(
        &self,
        output_dir: &Path,
        title: &str,
        thread: Option<&MessageRef>,
    ) -> Option<WatchState> {
        let watch = &self.config.watch;
        let notifier = self.notifier.as_ref()?;

        if self.watch_store.exists().await.unwrap_or(true) {
            tracing::warn!(
                output = %output_dir.display(),
                "Another publish watch is active, this episode must be published manually"
            );
            let _ = notifier.completion_manual_publish(output_dir, thread).await;
            return None;
        }

        let completion = notifier
            .completion(output_dir, &watch.reaction, &watch.reply_command, thread)
            .await
            .ok()?;

        let state = WatchState {
            channel: completion.channel.clone(),
            thread_ref: Some(thread.unwrap_or(&completion).ts.clone()),
            message_ref: completion.ts,
            payload: PublishPayload {
                output_path: output_dir.to_path_buf(),
                selected_title: Some(title.to_string()),
                ..Default::default()
            },
            created_at: self.clock.now(),
        };

        match self.watch_store.create(&state).await {
            Ok(()) => {
                tracing::info!(message = %state.message_ref, "Publish watch created");
                Some(state)
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to persist watch state");
                None
            }
        }
    }

    /// Processes every pending transcript; one failure does not stop the rest
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> anyhow::Result<Vec<ProcessOutcome>> {
        let pending = self.pending_transcripts().await?;
        if pending.is_empty() {
            tracing::debug!("No new transcripts");
            return Ok(Vec::new());
        }
        tracing::info!(count = pending.len(), "Processing new transcripts");

        let mut outcomes = Vec::with_capacity(pending.len());
        for path in pending {
            match self.process_transcript(&path).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!(error = ?e, path = %path.display(), "Skipping transcript")
                }
            }
        }

        Ok(outcomes)
    }
}
