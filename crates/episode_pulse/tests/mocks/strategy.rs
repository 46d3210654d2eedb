use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use episode_pulse::{
    negotiation::{NegotiationEvent, Reply, TitleCandidateSet},
    Error, SelectionStrategy,
};

/// Plays back scripted answers. Runs out of replies as a cancel and out of
/// confirmations as a yes.
#[derive(Clone)]
pub struct ScriptedStrategy {
    pub replies: Arc<Mutex<VecDeque<Reply>>>,
    pub confirmations: Arc<Mutex<VecDeque<bool>>>,
    pub presented: Arc<Mutex<Vec<Vec<String>>>>,
    pub confirm_calls: Arc<Mutex<Vec<String>>>,
    pub events: Arc<Mutex<Vec<String>>>,
}

impl ScriptedStrategy {
    pub fn new(replies: Vec<Reply>, confirmations: Vec<bool>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            confirmations: Arc::new(Mutex::new(confirmations.into())),
            presented: Arc::new(Mutex::new(Vec::new())),
            confirm_calls: Arc::new(Mutex::new(Vec::new())),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl SelectionStrategy for ScriptedStrategy {
    async fn await_selection(&self, candidates: &TitleCandidateSet) -> Result<Reply, Error> {
        self.presented.lock().unwrap().push(candidates.to_vec());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Cancel))
    }

    async fn confirm(&self, title: &str) -> Result<bool, Error> {
        self.confirm_calls.lock().unwrap().push(title.to_string());
        Ok(self.confirmations.lock().unwrap().pop_front().unwrap_or(true))
    }

    async fn notify(&self, event: NegotiationEvent<'_>) {
        let event = match event {
            NegotiationEvent::Regenerating => "regenerating".to_string(),
            NegotiationEvent::Selected(title) => format!("selected: {title}"),
        };
        self.events.lock().unwrap().push(event);
    }
}
