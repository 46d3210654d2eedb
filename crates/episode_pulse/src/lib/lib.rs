pub mod artifacts;
pub mod clock;
pub mod config;
mod error;
pub mod llm;
pub mod messaging;
pub mod negotiation;
pub mod parser;
mod processor;
pub mod publish;
pub mod tracing;
pub mod trigger;

pub use clock::{Clock, SystemClock};
pub use config::{AppConfig, Provider, Secrets};
pub use error::Error;
pub use llm::{anthropic, openai, GenerationRequest, Generator, LlmClient};
pub use messaging::{notifier::Notifier, slack::SlackClient, MessageRef, MessagingChannel};
pub use negotiation::{negotiate, SelectionOutcome, SelectionStrategy};
pub use parser::{extract, Extraction, ExtractionWarning, Field};
pub use processor::{builder::EpisodeProcessorBuilder, EpisodeProcessor, ProcessOutcome};
pub use publish::{PublishAction, PublishCoordinator, PublishResult, Publisher};
pub use trigger::{TriggerOutcome, TriggerWatcher};
