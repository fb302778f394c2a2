//! Per-IP brute-force ledger for the login endpoint.
//!
//! Every attempt counts, successful or not. An identity whose count reaches the threshold
//! inside the window is locked until the window runs out; expiry is checked lazily on the
//! next lookup. Identities that never come back are swept once the map grows past
//! `SWEEP_THRESHOLD`.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const SWEEP_THRESHOLD: usize = 1024;

pub fn default_window() -> Duration {
    Duration::minutes(15)
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u32,
    window_start: DateTime<Utc>,
}

pub struct LoginAttemptLedger {
    max_attempts: u32,
    window: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl LoginAttemptLedger {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether `identity` may attempt a login right now.
    pub fn check(&self, identity: &str) -> bool {
        self.check_at(identity, Utc::now())
    }

    pub fn record(&self, identity: &str, succeeded: bool) {
        self.record_at(identity, succeeded, Utc::now())
    }

    pub fn check_at(&self, identity: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries();

        match entries.get(identity) {
            Some(entry) if self.is_expired(entry, now) => {
                entries.remove(identity);
                true
            }
            Some(entry) => entry.count < self.max_attempts,
            None => true,
        }
    }

    pub fn record_at(&self, identity: &str, succeeded: bool, now: DateTime<Utc>) {
        let mut entries = self.entries();
        if entries.len() >= SWEEP_THRESHOLD {
            entries.retain(|_, entry| !self.is_expired(entry, now));
        }
        let fresh = Entry {
            count: 0,
            window_start: now,
        };
        let entry = entries.entry(identity.to_string()).or_insert(fresh);

        if self.is_expired(entry, now) {
            *entry = fresh;
        }
        entry.count += 1;

        tracing::debug!(
            identity,
            succeeded,
            attempts = entry.count,
            "Recorded a login attempt"
        );
    }

    fn is_expired(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        now - entry.window_start >= self.window
    }

    #[cfg(test)]
    fn tracked_identities(&self) -> usize {
        self.entries().len()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // A panic while holding the lock leaves the map consistent, so keep using it.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LoginAttemptLedger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, default_window())
    }
}
