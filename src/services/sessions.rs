use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::Session;

/// In-memory sessions keyed by the caller's opaque id.
///
/// Each session sits behind its own async mutex, so two turns for the same id
/// run one after the other while different sessions proceed in parallel.
/// Sessions live until the caller ends them; there is no expiry.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<tokio::sync::Mutex<Session>>>>,
    window: usize,
}

impl SessionStore {
    pub fn new(window: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Returns the session handle, creating it on first use.
    pub fn handle(&self, session_id: &str) -> Arc<tokio::sync::Mutex<Session>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "creating session");
                Arc::new(tokio::sync::Mutex::new(Session::new(session_id, self.window)))
            })
            .clone()
    }

    /// Clears flow, messages and pending booking fields. Returns false for unknown ids.
    pub async fn reset(&self, session_id: &str) -> bool {
        let handle = {
            let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.get(session_id).cloned()
        };
        match handle {
            Some(handle) => {
                handle.lock().await.reset();
                true
            }
            None => false,
        }
    }

    pub fn end(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .map(|s| s.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RouteState;

    #[tokio::test]
    async fn test_handle_returns_same_session() {
        let store = SessionStore::new(10);
        store.handle("a").lock().await.state = RouteState::InFaqFlow;
        assert_eq!(store.handle("a").lock().await.state, RouteState::InFaqFlow);
        assert_eq!(store.handle("b").lock().await.state, RouteState::NoContext);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_reset_and_end() {
        let store = SessionStore::new(10);
        store.handle("a").lock().await.state = RouteState::InAppointmentFlow;
        assert!(store.reset("a").await);
        assert_eq!(store.handle("a").lock().await.state, RouteState::NoContext);
        assert!(!store.reset("missing").await);

        assert!(store.end("a"));
        assert!(!store.end("a"));
        assert!(store.is_empty());
    }
}
