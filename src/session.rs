//! Per-session state. Each browser session owns its own document tree; a
//! tree is never shared across sessions, and handlers for the same session
//! serialize on the session mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use uuid::Uuid;

use crate::document::UiStateStore;

/// One user's dashboard state, alive from first request to session end.
#[derive(Debug)]
pub struct Session {
    pub store: UiStateStore,
}

impl Session {
    pub fn new() -> Self {
        Session {
            store: UiStateStore::with_skeleton(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

/// Registry of live sessions keyed by the session cookie's UUID.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the session for `id`, instantiating a fresh skeleton on first
    /// sight.
    pub fn get_or_create(&self, id: Uuid) -> Arc<Mutex<Session>> {
        if let Some(session) = self.sessions.read().unwrap().get(&id) {
            return Arc::clone(session);
        }
        let mut sessions = self.sessions.write().unwrap();
        Arc::clone(
            sessions
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(Session::new()))),
        )
    }

    /// Tear a session down. Nothing persists across sessions.
    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().unwrap().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        SessionRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_isolated() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create(Uuid::new_v4());
        let b = registry.get_or_create(Uuid::new_v4());

        crate::upload::on_upload(&mut a.lock().unwrap().store, b"H\n1\n", "a.csv").unwrap();

        let b = b.lock().unwrap();
        assert!(crate::compute::read_uploaded_table(&b.store).is_err());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn get_or_create_is_stable_for_the_same_id() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        let first = registry.get_or_create(id);
        let again = registry.get_or_create(id);
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn remove_tears_the_session_down() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        registry.get_or_create(id);

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }
}
