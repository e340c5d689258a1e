use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StateStore;
use crate::allocator::AllocatorState;
use crate::error::{Error, Result};

/// In-process store. Used for dry runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    blob: RwLock<Option<AllocatorState>>,
    saves: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AllocatorState) -> Self {
        Self {
            blob: RwLock::new(Some(state)),
            ..Self::default()
        }
    }

    /// A store whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// A store that sleeps before each save.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub async fn current(&self) -> Option<AllocatorState> {
        self.blob.read().await.clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Option<AllocatorState>> {
        if self.fail {
            return Err(Error::Storage("memory store unavailable".into()));
        }
        Ok(self.blob.read().await.clone())
    }

    async fn save(&self, state: &AllocatorState) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::Storage("memory store unavailable".into()));
        }
        *self.blob.write().await = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
