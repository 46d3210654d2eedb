use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use episode_pulse::{GenerationRequest, Generator};

/// Returns queued responses in order; the last one repeats
#[derive(Clone)]
pub struct MockGenerator {
    pub responses: Arc<Mutex<VecDeque<String>>>,
    pub calls: Arc<Mutex<Vec<GenerationRequest>>>,
    pub fail_with: Option<String>,
}

impl MockGenerator {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.iter().map(|r| r.to_string()).collect(),
            )),
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

impl Generator for MockGenerator {
    type Error = std::io::Error;

    async fn generate(&self, request: GenerationRequest) -> Result<String, Self::Error> {
        self.calls.lock().unwrap().push(request);
        if let Some(ref msg) = self.fail_with {
            return Err(std::io::Error::other(msg.clone()));
        }

        let mut responses = self.responses.lock().unwrap();
        let response = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        Ok(response.unwrap_or_default())
    }
}
