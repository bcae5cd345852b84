//! MCP session cache (spec §5: "a keyed map of session id → expiry, guarded
//! by a single short-held mutex").
//!
//! One of the three named instances of process-wide mutable state (the
//! other two are the rate-limiter bucket map and the clock). The MCP
//! transport and tool dispatcher that would populate this cache per-session
//! are external collaborators (spec §1, out of scope here); this struct is
//! the encapsulated piece of shared state they'd hold a handle to, shaped
//! like [`super::rate_limiter::RateLimiter`] — a `Mutex`-guarded map,
//! lazily populated, swept for expired entries on access rather than on a
//! separate timer.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub struct SessionCache {
    sessions: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCache {
    pub fn new() -> Self {
        Self { sessions: Mutex::new(HashMap::new()) }
    }

    /// Registers (or refreshes) a session, valid until `expires_at`.
    pub fn insert(&self, session_id: Uuid, expires_at: DateTime<Utc>) {
        self.sessions.lock().expect("session cache mutex poisoned").insert(session_id, expires_at);
    }

    /// Returns whether `session_id` is present and not yet expired. Expired
    /// entries are evicted as a side effect of checking them.
    pub fn is_valid(&self, session_id: Uuid) -> bool {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().expect("session cache mutex poisoned");
        match sessions.get(&session_id) {
            Some(expires_at) if *expires_at > now => true,
            Some(_) => {
                sessions.remove(&session_id);
                false
            }
            None => false,
        }
    }

    pub fn remove(&self, session_id: Uuid) {
        self.sessions.lock().expect("session cache mutex poisoned").remove(&session_id);
    }

    /// Drops every entry past its expiry. Exposed for a periodic sweep;
    /// `is_valid` also self-heals lazily, so this is only needed to reclaim
    /// memory for sessions nobody ever re-checks.
    pub fn sweep_expired(&self) {
        let now = Utc::now();
        self.sessions.lock().expect("session cache mutex poisoned").retain(|_, expires_at| *expires_at > now);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fresh_session_is_valid() {
        let cache = SessionCache::new();
        let id = Uuid::new_v4();
        cache.insert(id, Utc::now() + Duration::minutes(5));
        assert!(cache.is_valid(id));
    }

    #[test]
    fn expired_session_is_invalid_and_evicted_on_check() {
        let cache = SessionCache::new();
        let id = Uuid::new_v4();
        cache.insert(id, Utc::now() - Duration::seconds(1));
        assert!(!cache.is_valid(id));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn unknown_session_is_invalid() {
        let cache = SessionCache::new();
        assert!(!cache.is_valid(Uuid::new_v4()));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let cache = SessionCache::new();
        let live = Uuid::new_v4();
        let dead = Uuid::new_v4();
        cache.insert(live, Utc::now() + Duration::minutes(5));
        cache.insert(dead, Utc::now() - Duration::seconds(1));
        cache.sweep_expired();
        assert_eq!(cache.len(), 1);
        assert!(cache.is_valid(live));
    }
}
