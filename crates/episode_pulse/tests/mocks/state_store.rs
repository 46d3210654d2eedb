use std::sync::{Arc, Mutex};

use episode_store::{WatchState, WatchStateStore};

/// Watch record held in memory. With `vanish_after_checks` set, the record
/// is deleted externally once that many existence checks have passed.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    pub state: Arc<Mutex<Option<WatchState>>>,
    pub exists_checks: Arc<Mutex<usize>>,
    pub deletes: Arc<Mutex<usize>>,
    pub vanish_after_checks: Option<usize>,
}

impl MemoryStateStore {
    pub fn holding(state: WatchState) -> Self {
        Self {
            state: Arc::new(Mutex::new(Some(state))),
            ..Default::default()
        }
    }

    pub fn vanishing_after(mut self, checks: usize) -> Self {
        self.vanish_after_checks = Some(checks);
        self
    }

    pub fn current(&self) -> Option<WatchState> {
        self.state.lock().unwrap().clone()
    }
}

impl WatchStateStore for MemoryStateStore {
    async fn create(&self, state: &WatchState) -> anyhow::Result<()> {
        let mut current = self.state.lock().unwrap();
        if current.is_some() {
            anyhow::bail!("watch already active");
        }
        *current = Some(state.clone());
        Ok(())
    }

    async fn load(&self) -> anyhow::Result<Option<WatchState>> {
        Ok(self.current())
    }

    async fn exists(&self) -> anyhow::Result<bool> {
        let checks = {
            let mut checks = self.exists_checks.lock().unwrap();
            *checks += 1;
            *checks
        };

        let mut state = self.state.lock().unwrap();
        if self.vanish_after_checks.is_some_and(|n| checks > n) {
            *state = None;
        }
        Ok(state.is_some())
    }

    async fn delete(&self) -> anyhow::Result<bool> {
        *self.deletes.lock().unwrap() += 1;
        Ok(self.state.lock().unwrap().take().is_some())
    }
}
