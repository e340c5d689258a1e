//! Per-user issuance records and the pure draw step.
//!
//! Everything here is synchronous and deterministic given a random source,
//! so the cooldown rules can be tested without a clock or a backend.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::catalog::Catalog;

/// Limits applied to every user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawPolicy {
    /// Maximum links per window
    pub max_links: u32,
    /// Length of the cooldown window
    pub cooldown: Duration,
}

impl DrawPolicy {
    fn cooldown_ms(&self) -> i64 {
        i64::try_from(self.cooldown.as_millis()).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Every link ever issued to this user, in issue order
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub current_period_count: u32,
    /// Window start, epoch milliseconds
    #[serde(rename = "lastPeriodStartTime", default)]
    pub window_start: i64,
}

impl UserRecord {
    pub fn new(now: i64) -> Self {
        Self {
            history: Vec::new(),
            current_period_count: 0,
            window_start: now,
        }
    }

    pub fn has_received(&self, item: &str) -> bool {
        self.history.iter().any(|h| h == item)
    }

    /// Time left until the current window expires, zero once it has.
    pub fn remaining_cooldown(&self, policy: &DrawPolicy, now: i64) -> Duration {
        // A window start in the future (clock skew) counts as just started
        let elapsed = now.saturating_sub(self.window_start).max(0);
        let remaining = policy.cooldown_ms().saturating_sub(elapsed).max(0);
        Duration::from_millis(remaining as u64)
    }

    fn window_expired(&self, policy: &DrawPolicy, now: i64) -> bool {
        now.saturating_sub(self.window_start) >= policy.cooldown_ms()
    }
}

/// A successful draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issued {
    pub item: String,
    pub remaining_in_window: u32,
}

/// Why a draw was refused. Neither case mutates the user's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRefusal {
    CooldownActive { remaining: Duration },
    CatalogExhausted,
}

/// All user records; the unit of persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocatorState {
    users: BTreeMap<String, UserRecord>,
}

impl AllocatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str) -> Option<&UserRecord> {
        self.users.get(user_id)
    }

    pub fn insert(&mut self, user_id: impl Into<String>, record: UserRecord) {
        self.users.insert(user_id.into(), record);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Apply one draw for `user_id` at `now` (epoch ms).
    ///
    /// Window handling: an expired window resets the period count and moves
    /// the window start to `now`; the first issuance of a window also anchors
    /// the window start to `now`, so the countdown follows actual usage.
    pub fn draw<R: Rng + ?Sized>(
        &mut self,
        user_id: &str,
        catalog: &Catalog,
        policy: &DrawPolicy,
        now: i64,
        rng: &mut R,
    ) -> Result<Issued, DrawRefusal> {
        let record = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserRecord::new(now));

        if record.window_expired(policy, now) {
            record.current_period_count = 0;
            record.window_start = now;
        }

        let available: Vec<&String> = catalog
            .items()
            .iter()
            .filter(|item| !record.has_received(item))
            .collect();

        if available.is_empty() {
            return Err(DrawRefusal::CatalogExhausted);
        }

        if record.current_period_count >= policy.max_links {
            return Err(DrawRefusal::CooldownActive {
                remaining: record.remaining_cooldown(policy, now),
            });
        }

        let item = match available.choose(rng) {
            Some(item) => (*item).clone(),
            None => return Err(DrawRefusal::CatalogExhausted),
        };

        record.history.push(item.clone());
        record.current_period_count += 1;
        if record.current_period_count == 1 {
            record.window_start = now;
        }

        Ok(Issued {
            item,
            remaining_in_window: policy.max_links - record.current_period_count,
        })
    }
}

/// Render a wait as whole hours plus leftover whole minutes.
pub fn format_wait(wait: Duration) -> String {
    let ms = wait.as_millis();
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    format!("{} hours and {} minutes", hours, minutes)
}
