use std::sync::{Arc, Mutex};

use episode_pulse::{
    negotiation::{CandidateSource, TitleCandidateSet},
    Error,
};

/// Hands out one prepared candidate set per call
#[derive(Clone)]
pub struct MockCandidates {
    pub batches: Vec<TitleCandidateSet>,
    /// Feedback passed on each call
    pub calls: Arc<Mutex<Vec<Option<String>>>>,
    pub fail_with: Option<String>,
}

impl MockCandidates {
    pub fn new(prefixes: &[&str]) -> Self {
        Self {
            batches: prefixes.iter().map(|p| batch(p)).collect(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new(&[])
        }
    }
}

/// Five titles named `<prefix> 1` .. `<prefix> 5`
pub fn batch(prefix: &str) -> TitleCandidateSet {
    TitleCandidateSet::new(std::array::from_fn(|i| format!("{prefix} {}", i + 1)))
}

impl CandidateSource for MockCandidates {
    async fn candidates(
        &self,
        _transcript: &str,
        feedback: Option<&str>,
    ) -> Result<TitleCandidateSet, Error> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(feedback.map(str::to_string));
            calls.len() - 1
        };
        if let Some(ref msg) = self.fail_with {
            return Err(Error::Generation(msg.clone()));
        }

        let index = call.min(self.batches.len().saturating_sub(1));
        self.batches
            .get(index)
            .cloned()
            .ok_or(Error::IncompleteCandidates { found: 0 })
    }
}
