//! # Deduplication Store
//!
//! Remembers idempotency tokens for `ttl_ms` so a repeated delivery can be
//! collapsed onto the first one, replaying its stored result.
//!
//! ## Bounds
//!
//! - At most `max_entries` tokens are held.
//! - `record` evicts expired entries first; if still at capacity it evicts the
//!   single entry with the oldest `processed_at` (age order, not access order).
//! - `evict_expired` bounds memory without new traffic.
//!
//! Nothing here fails: absence, expiry and duplication are all outcomes.

use courier_envelope::UnixMillis;
use std::collections::HashMap;
use tracing::debug;

/// Outcome of [`DeduplicationStore::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupCheck<R> {
    /// Token never seen (or already evicted).
    NewMessage,
    /// Token seen within its TTL.
    DuplicateMessage {
        processed_at: UnixMillis,
        result: Option<R>,
    },
    /// Token seen but its TTL has passed. Treat as new.
    TokenExpired,
}

impl<R> DedupCheck<R> {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DedupCheck::DuplicateMessage { .. })
    }
}

#[derive(Debug, Clone)]
struct DedupEntry<R> {
    processed_at: UnixMillis,
    result: Option<R>,
    expires_at: UnixMillis,
}

/// Bounded, TTL-scoped idempotency token store.
#[derive(Debug, Clone)]
pub struct DeduplicationStore<R> {
    entries: HashMap<String, DedupEntry<R>>,
    max_entries: usize,
    ttl_ms: u64,
}

impl<R: Clone> DeduplicationStore<R> {
    pub fn new(max_entries: usize, ttl_ms: u64) -> Self {
        Self {
            entries: HashMap::with_capacity(max_entries.min(1024)),
            max_entries,
            ttl_ms,
        }
    }

    /// Looks up `token` at time `now`.
    pub fn check(&self, token: &str, now: UnixMillis) -> DedupCheck<R> {
        match self.entries.get(token) {
            None => DedupCheck::NewMessage,
            Some(entry) if entry.expires_at > now => DedupCheck::DuplicateMessage {
                processed_at: entry.processed_at,
                result: entry.result.clone(),
            },
            Some(_) => DedupCheck::TokenExpired,
        }
    }

    /// Records `token` as processed at `now`, replacing any existing entry.
    pub fn record(&mut self, token: impl Into<String>, now: UnixMillis, result: Option<R>) {
        let token = token.into();
        self.evict_expired(now);

        if !self.entries.contains_key(&token) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        self.entries.insert(
            token,
            DedupEntry {
                processed_at: now,
                result,
                expires_at: now.saturating_add(self.ttl_ms),
            },
        );
    }

    /// Drops every entry whose TTL has passed. Returns how many were dropped.
    pub fn evict_expired(&mut self, now: UnixMillis) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Removes `token` so the next arrival under it is processed as new.
    ///
    /// Used when a message was admitted but never delivered.
    pub fn forget(&mut self, token: &str) -> bool {
        self.entries.remove(token).is_some()
    }

    /// Whether `token` is currently remembered and unexpired.
    pub fn contains(&self, token: &str, now: UnixMillis) -> bool {
        self.entries
            .get(token)
            .map(|entry| entry.expires_at > now)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn evict_oldest(&mut self) {
        // Ties on processed_at fall back to token order so eviction is deterministic.
        let oldest = self
            .entries
            .iter()
            .min_by(|a, b| {
                a.1.processed_at
                    .cmp(&b.1.processed_at)
                    .then_with(|| a.0.cmp(b.0))
            })
            .map(|(token, _)| token.clone());

        if let Some(token) = oldest {
            debug!(token = %token, "Dedup store at capacity, evicting oldest token");
            self.entries.remove(&token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_entries: usize, ttl_ms: u64) -> DeduplicationStore<&'static str> {
        DeduplicationStore::new(max_entries, ttl_ms)
    }

    #[test]
    fn test_unknown_token_is_new() {
        let store = store(10, 1_000);
        assert_eq!(store.check("t1", 0), DedupCheck::NewMessage);
    }

    #[test]
    fn test_duplicate_replays_stored_result() {
        let mut store = store(10, 1_000);
        store.record("t1", 100, Some("ok"));

        assert_eq!(
            store.check("t1", 500),
            DedupCheck::DuplicateMessage {
                processed_at: 100,
                result: Some("ok")
            }
        );
        assert!(store.contains("t1", 500));
    }

    #[test]
    fn test_expired_token_reported() {
        // max_entries=100, ttl=1000, record at 0, check at 1500
        let mut store = store(100, 1_000);
        store.record("t1", 0, None);
        assert_eq!(store.check("t1", 1_500), DedupCheck::TokenExpired);
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let mut store = store(10, 1_000);
        store.record("t1", 0, None);
        assert!(store.check("t1", 999).is_duplicate());
        assert_eq!(store.check("t1", 1_000), DedupCheck::TokenExpired);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut store = store(2, 10_000);
        store.record("a", 10, None);
        store.record("b", 20, None);
        store.record("c", 30, None);

        assert_eq!(store.len(), 2);
        assert_eq!(store.check("a", 30), DedupCheck::NewMessage);
        assert!(store.contains("b", 30));
        assert!(store.contains("c", 30));
    }

    #[test]
    fn test_record_prefers_evicting_expired() {
        let mut store = store(2, 100);
        store.record("a", 0, None);
        store.record("b", 150, None);
        // "a" expired at 100, so "b" survives
        store.record("c", 160, None);

        assert!(store.contains("b", 160));
        assert!(store.contains("c", 160));
        assert_eq!(store.check("a", 160), DedupCheck::NewMessage);
    }

    #[test]
    fn test_record_is_upsert() {
        let mut store = store(1, 1_000);
        store.record("t1", 0, None);
        store.record("t1", 10, Some("response"));

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.check("t1", 20),
            DedupCheck::DuplicateMessage {
                processed_at: 10,
                result: Some("response")
            }
        );
    }

    #[test]
    fn test_evict_expired_without_traffic() {
        let mut store = store(10, 100);
        store.record("a", 0, None);
        store.record("b", 50, None);

        assert_eq!(store.evict_expired(120), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.evict_expired(1_000), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_forget_makes_token_new_again() {
        let mut store = store(10, 1_000);
        store.record("t1", 0, None);

        assert!(store.forget("t1"));
        assert_eq!(store.check("t1", 10), DedupCheck::NewMessage);
        assert!(!store.forget("t1"));
        assert!(store.is_empty());
    }
}
