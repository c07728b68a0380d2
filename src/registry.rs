//! Session registry
//!
//! Enforces the one-active-session-per-scope invariant with an atomic
//! check-and-insert. This is what stops a user from opening two concurrent
//! blackjack hands or crash bets.

use crate::errors::{EngineError, EngineResult};
use crate::session::Session;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Insert a session for its scope; `Busy` if the scope already holds a
    /// non-terminal one. The entry guard makes the check-and-insert atomic.
    pub fn create(&self, session: Session) -> EngineResult<Arc<Session>> {
        let session = Arc::new(session);
        match self.sessions.entry(session.scope.clone()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_terminal() {
                    return Err(EngineError::Busy);
                }
                // stale terminal entry, safe to displace
                occupied.insert(session.clone());
                Ok(session)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(session.clone());
                Ok(session)
            }
        }
    }

    pub fn get(&self, scope: &str) -> Option<Arc<Session>> {
        self.sessions.get(scope).map(|s| s.clone())
    }

    /// Idempotent; removing an absent scope is a no-op
    pub fn remove(&self, scope: &str) {
        self.sessions.remove(scope);
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::GamePayload;
    use crate::session::SessionKind;

    fn session(scope: &str) -> Session {
        Session::new(
            scope,
            "alice",
            SessionKind::Dice,
            10,
            GamePayload::Dice {
                called: 1,
                rolled: 1,
            },
        )
    }

    #[test]
    fn test_create_and_get() {
        let registry = SessionRegistry::new();
        registry.create(session("scope-1")).unwrap();
        assert!(registry.get("scope-1").is_some());
        assert!(registry.get("scope-2").is_none());
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_second_create_is_busy() {
        let registry = SessionRegistry::new();
        let first = registry.create(session("scope-1")).unwrap();
        first.activate();

        match registry.create(session("scope-1")) {
            Err(EngineError::Busy) => {}
            other => panic!("expected Busy, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_terminal_entry_can_be_displaced() {
        let registry = SessionRegistry::new();
        let first = registry.create(session("scope-1")).unwrap();
        first.activate();
        first.begin_resolution();
        first.finish_resolution();

        assert!(registry.create(session("scope-1")).is_ok());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = SessionRegistry::new();
        registry.create(session("scope-1")).unwrap();
        registry.remove("scope-1");
        registry.remove("scope-1");
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_concurrent_creates_one_winner() {
        let registry = std::sync::Arc::new(SessionRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                registry.create(session("scope-1")).is_ok()
            }));
        }
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(winners, 1);
    }
}
