//! Whole-blob persistence for [`AllocatorState`].
//!
//! A backend only knows how to fetch and overwrite one JSON document. The
//! degrade-to-empty and log-and-continue policies live in [`load_state`] and
//! [`persist_state`] so every backend behaves the same.

pub mod dropbox;
pub mod file;
pub mod jsonbin;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::allocator::AllocatorState;
use crate::config::StorageConfig;
use crate::error::{Error, Result};

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Fetch the stored blob. `Ok(None)` means the backend has nothing yet.
    async fn load(&self) -> Result<Option<AllocatorState>>;

    /// Overwrite the stored blob with `state`.
    async fn save(&self, state: &AllocatorState) -> Result<()>;
}

/// Build the backend selected in configuration.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn StateStore>> {
    let store: Arc<dyn StateStore> = match config {
        StorageConfig::JsonBin { bin_id, api_key } => {
            Arc::new(jsonbin::JsonBinStore::new(bin_id, api_key)?)
        }
        StorageConfig::Dropbox { token, path } => Arc::new(dropbox::DropboxStore::new(token, path)?),
        StorageConfig::File { path } => Arc::new(file::FileStore::new(path.clone())),
        StorageConfig::Memory => Arc::new(memory::MemoryStore::new()),
    };
    Ok(store)
}

/// Load the persisted state, falling back to an empty one on any failure.
pub async fn load_state(store: &dyn StateStore) -> AllocatorState {
    match store.load().await {
        Ok(Some(state)) => {
            info!(backend = store.name(), users = state.len(), "link history loaded");
            state
        }
        Ok(None) => {
            info!(backend = store.name(), "no stored link history, starting empty");
            AllocatorState::new()
        }
        Err(e) => {
            error!(backend = store.name(), error = %e, "failed to load link history, starting empty");
            AllocatorState::new()
        }
    }
}

/// Overwrite the persisted state. Returns whether the save succeeded.
pub async fn persist_state(store: &dyn StateStore, state: &AllocatorState, timeout: Duration) -> bool {
    match save_within(store, state, timeout).await {
        Ok(()) => {
            info!(backend = store.name(), users = state.len(), "link history saved");
            true
        }
        Err(e) => {
            warn!(backend = store.name(), error = %e, "failed to save link history");
            false
        }
    }
}

/// Save with an upper bound on how long the backend may take.
pub async fn save_within(store: &dyn StateStore, state: &AllocatorState, timeout: Duration) -> Result<()> {
    match tokio::time::timeout(timeout, store.save(state)).await {
        Ok(result) => result,
        Err(_) => Err(Error::StorageTimeout(timeout)),
    }
}

/// Shared HTTP client for the remote backends.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Storage(format!("failed to build http client: {}", e)))
}
