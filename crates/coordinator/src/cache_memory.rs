//! In-memory cache for testing. Nothing survives the process.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Result, cache::ResultCache, types::PersistedState};

#[derive(Default)]
pub struct InMemoryCache {
    state: Mutex<Option<PersistedState>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache, as if an earlier process had written it.
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }

    pub fn snapshot(&self) -> Option<PersistedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ResultCache for InMemoryCache {
    async fn put(&self, state: &PersistedState) -> Result<()> {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        Ok(())
    }

    async fn get(&self) -> Result<Option<PersistedState>> {
        Ok(self.snapshot())
    }

    async fn clear(&self) -> Result<()> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).take();
        Ok(())
    }
}
