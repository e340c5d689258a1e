//! Rate-limited unique-link allocator.
//!
//! Owns the in-memory [`AllocatorState`] behind a single async lock and
//! persists the whole state after every issuance.

pub mod catalog;
pub mod record;

pub use catalog::Catalog;
pub use record::{format_wait, AllocatorState, DrawPolicy, DrawRefusal, Issued, UserRecord};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::storage::{persist_state, StateStore};

/// Result of a draw request as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    Issued(Issued),
    Refused(DrawRefusal),
}

pub struct Allocator {
    catalog: Arc<Catalog>,
    policy: DrawPolicy,
    state: Mutex<AllocatorState>,
    store: Arc<dyn StateStore>,
    persist_timeout: Duration,
}

impl Allocator {
    pub fn new(
        catalog: Arc<Catalog>,
        policy: DrawPolicy,
        state: AllocatorState,
        store: Arc<dyn StateStore>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            policy,
            state: Mutex::new(state),
            store,
            persist_timeout,
        }
    }

    pub fn policy(&self) -> DrawPolicy {
        self.policy
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Draw one link for `user_id` at `now` (epoch ms).
    ///
    /// The lock is held across the persistence round-trip so draws are fully
    /// serialized. A failed save is logged by [`persist_state`] and does not
    /// undo the issuance.
    pub async fn draw(&self, user_id: &str, now: i64) -> DrawOutcome {
        let mut state = self.state.lock().await;

        let result = {
            let mut rng = rand::thread_rng();
            state.draw(user_id, &self.catalog, &self.policy, now, &mut rng)
        };

        match result {
            Ok(issued) => {
                info!(
                    user_id,
                    remaining = issued.remaining_in_window,
                    "issued link"
                );
                persist_state(self.store.as_ref(), &state, self.persist_timeout).await;
                DrawOutcome::Issued(issued)
            }
            Err(refusal) => {
                debug!(user_id, ?refusal, "draw refused");
                DrawOutcome::Refused(refusal)
            }
        }
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> AllocatorState {
        self.state.lock().await.clone()
    }
}
