//! # Title negotiation
//!
//! Drives a human through picking an episode title:
//!
//! ```text
//! Proposing ──► AwaitingResponse ──► (confirm) ──► Selected
//!     ▲               │  │                │
//!     └── feedback ───┘  └── cancel       └── rejected: AwaitingResponse, same set
//!                            ▼
//!                        Cancelled
//! ```
//!
//! How the human is reached is a [`SelectionStrategy`]: the terminal or a
//! messaging channel. The state machine in [`negotiate`] is shared.

use std::future::Future;

use crate::{clock::Clock, error::Error, messaging::MessagingChannel};

pub mod candidates;
pub mod remote;
pub mod terminal;
pub mod title_case;

pub use candidates::{parse_titles, CandidateSource, TitleCandidateSet, TitleGenerator};
pub use remote::RemoteStrategy;
pub use terminal::TerminalStrategy;
pub use title_case::to_title_case;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Selected(String),
    Cancelled,
}

/// One human answer to a set of title candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// 1-based index into the candidate set
    Index(usize),
    /// Regenerate with this guidance; empty means plain regeneration
    Feedback(String),
    /// Title typed by the human, not yet title-cased
    Custom(String),
    Cancel,
    Invalid(String),
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &text[prefix.len()..])
}

impl Reply {
    pub fn parse(text: &str) -> Reply {
        let trimmed = text.trim();
        let lower = trimmed.to_lowercase();

        if let Some(custom) = strip_prefix_ignore_case(trimmed, "title:") {
            let custom = custom.trim();
            return if custom.is_empty() {
                Reply::Invalid(trimmed.to_string())
            } else {
                Reply::Custom(custom.to_string())
            };
        }

        if let Some(feedback) = strip_prefix_ignore_case(trimmed, "feedback:") {
            return Reply::Feedback(feedback.trim().to_string());
        }

        if lower == "f" {
            return Reply::Feedback(String::new());
        }
        if let Some(feedback) = strip_prefix_ignore_case(trimmed, "f ") {
            return Reply::Feedback(feedback.trim().to_string());
        }

        if matches!(lower.as_str(), "q" | "quit" | "cancel") {
            return Reply::Cancel;
        }

        match trimmed.parse::<usize>() {
            Ok(index) if (1..=TitleCandidateSet::SIZE).contains(&index) => Reply::Index(index),
            _ => Reply::Invalid(trimmed.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    Invalid,
}

impl Confirmation {
    pub fn parse(text: &str) -> Confirmation {
        match text.trim().to_lowercase().as_str() {
            "y" | "yes" => Confirmation::Yes,
            "n" | "no" => Confirmation::No,
            _ => Confirmation::Invalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationEvent<'a> {
    Regenerating,
    Selected(&'a str),
}

/// How candidates reach the human and answers come back
pub trait SelectionStrategy {
    /// Presents `candidates` and waits for a valid reply
    fn await_selection(
        &self,
        candidates: &TitleCandidateSet,
    ) -> impl Future<Output = Result<Reply, Error>> + Send;

    /// Asks the human to confirm a tentative title
    fn confirm(&self, title: &str) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Progress notices; failures to deliver them are not fatal
    fn notify(&self, event: NegotiationEvent<'_>) -> impl Future<Output = ()> + Send;
}

impl<T: SelectionStrategy + Send + Sync> SelectionStrategy for &T {
    async fn await_selection(&self, candidates: &TitleCandidateSet) -> Result<Reply, Error> {
        (**self).await_selection(candidates).await
    }

    async fn confirm(&self, title: &str) -> Result<bool, Error> {
        (**self).confirm(title).await
    }

    async fn notify(&self, event: NegotiationEvent<'_>) {
        (**self).notify(event).await
    }
}

/// Runs the negotiation to a terminal outcome.
///
/// Candidate generation errors end the negotiation and are returned as-is.
#[tracing::instrument(skip_all)]
pub async fn negotiate<C, S>(
    transcript: &str,
    source: &C,
    strategy: &S,
) -> Result<SelectionOutcome, Error>
where
    C: CandidateSource + Sync,
    S: SelectionStrategy + Sync,
{
    let mut candidates = source.candidates(transcript, None).await?;

    loop {
        let tentative = match strategy.await_selection(&candidates).await? {
            Reply::Cancel => {
                tracing::info!("Title selection cancelled");
                return Ok(SelectionOutcome::Cancelled);
            }
            Reply::Feedback(feedback) => {
                tracing::info!(%feedback, "Regenerating titles from feedback");
                strategy.notify(NegotiationEvent::Regenerating).await;
                let feedback = Some(feedback.as_str()).filter(|f| !f.is_empty());
                candidates = source.candidates(transcript, feedback).await?;
                continue;
            }
            Reply::Index(index) => match candidates.get(index) {
                Some(title) => title.to_string(),
                None => {
                    tracing::warn!(index, "Selection index out of range");
                    continue;
                }
            },
            Reply::Custom(title) => to_title_case(&title),
            Reply::Invalid(text) => {
                tracing::warn!(%text, "Ignoring invalid reply");
                continue;
            }
        };

        if strategy.confirm(&tentative).await? {
            tracing::info!(title = %tentative, "Title selected");
            strategy.notify(NegotiationEvent::Selected(&tentative)).await;
            return Ok(SelectionOutcome::Selected(tentative));
        }
        tracing::info!(title = %tentative, "Title rejected at confirmation");
    }
}

/// Strategy picked from configuration at startup
pub enum ConfiguredStrategy<M, C> {
    Terminal(TerminalStrategy),
    Remote(RemoteStrategy<M, C>),
}

impl<M, C> SelectionStrategy for ConfiguredStrategy<M, C>
where
    M: MessagingChannel + Send + Sync,
    C: Clock + Send + Sync,
{
    async fn await_selection(&self, candidates: &TitleCandidateSet) -> Result<Reply, Error> {
        match self {
            ConfiguredStrategy::Terminal(s) => s.await_selection(candidates).await,
            ConfiguredStrategy::Remote(s) => s.await_selection(candidates).await,
        }
    }

    async fn confirm(&self, title: &str) -> Result<bool, Error> {
        match self {
            ConfiguredStrategy::Terminal(s) => s.confirm(title).await,
            ConfiguredStrategy::Remote(s) => s.confirm(title).await,
        }
    }

    async fn notify(&self, event: NegotiationEvent<'_>) {
        match self {
            ConfiguredStrategy::Terminal(s) => s.notify(event).await,
            ConfiguredStrategy::Remote(s) => s.notify(event).await,
        }
    }
}
