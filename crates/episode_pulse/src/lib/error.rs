use crate::messaging::ChannelError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Generation failed: {0}")]
    Generation(String),
    #[error("Expected 5 title candidates within budget, model produced {found}")]
    IncompleteCandidates { found: usize },
    #[error("No watch state to resume")]
    NoWatchState,
    #[error("Messaging channel error: {0}")]
    Channel(#[from] ChannelError),
    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Interactive prompt failed: {0}")]
    Prompt(String),
}
