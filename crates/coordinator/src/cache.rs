//! Durable storage for the single [`PersistedState`] record.

use async_trait::async_trait;

use crate::{Result, types::PersistedState};

/// Holds at most one record. `put` replaces whatever is there.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn put(&self, state: &PersistedState) -> Result<()>;
    async fn get(&self) -> Result<Option<PersistedState>>;
    async fn clear(&self) -> Result<()>;
}
