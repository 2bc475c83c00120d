use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

use crate::models::AdminSession;

/// In-memory admin sessions keyed by bearer token.
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, NaiveDateTime>>,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            ttl: Duration::minutes(ttl_minutes),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn issue(&self, now: NaiveDateTime) -> AdminSession {
        let session = AdminSession {
            token: Uuid::new_v4().simple().to_string(),
            expires_at: now + self.ttl,
        };
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, expires_at| *expires_at > now);
        sessions.insert(session.token.clone(), session.expires_at);
        session
    }

    /// True while `token` is live. Expired tokens are forgotten.
    pub fn validate(&self, token: &str, now: NaiveDateTime) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get(token) {
            Some(expires_at) if *expires_at > now => true,
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        }
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(token)
            .is_some()
    }
}

/// Compares without stopping at the first differing byte.
pub fn password_matches(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_issue_and_validate() {
        let store = SessionStore::new(30);
        let session = store.issue(dt("2025-06-15 09:00"));
        assert_eq!(session.expires_at, dt("2025-06-15 09:30"));
        assert!(store.validate(&session.token, dt("2025-06-15 09:29")));
        assert!(!store.validate("not-a-token", dt("2025-06-15 09:00")));
    }

    #[test]
    fn test_expired_session_rejected() {
        let store = SessionStore::new(30);
        let session = store.issue(dt("2025-06-15 09:00"));
        assert!(!store.validate(&session.token, dt("2025-06-15 09:30")));
        // stays gone even if the clock were wound back
        assert!(!store.validate(&session.token, dt("2025-06-15 09:10")));
    }

    #[test]
    fn test_revoke() {
        let store = SessionStore::new(30);
        let session = store.issue(dt("2025-06-15 09:00"));
        assert!(store.revoke(&session.token));
        assert!(!store.revoke(&session.token));
        assert!(!store.validate(&session.token, dt("2025-06-15 09:01")));
    }

    #[test]
    fn test_tokens_are_distinct() {
        let store = SessionStore::new(30);
        let a = store.issue(dt("2025-06-15 09:00"));
        let b = store.issue(dt("2025-06-15 09:00"));
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_password_matches() {
        assert!(password_matches("changeme", "changeme"));
        assert!(!password_matches("changemf", "changeme"));
        assert!(!password_matches("change", "changeme"));
        assert!(!password_matches("", "changeme"));
    }
}
