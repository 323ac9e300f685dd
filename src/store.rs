//! Playground state container.
//!
//! [`PlaygroundStore`] is the write surface the loader targets. The store
//! owns whatever it is given; the loader keeps nothing.
//! [`MemoryStore`] is the in-process implementation used by the CLI.

use std::sync::{Mutex, MutexGuard};

use crate::model::{CanonicalMessage, SessionSummary};

/// State the loader reads from and writes to.
pub trait PlaygroundStore: Send + Sync {
    /// The playground base URL currently selected, if any.
    fn selected_endpoint(&self) -> Option<String>;

    fn set_messages(&self, messages: Vec<CanonicalMessage>);

    fn set_sessions_data(&self, sessions: Vec<SessionSummary>);

    fn set_is_sessions_loading(&self, loading: bool);
}

#[derive(Debug, Default)]
struct StoreState {
    endpoint: Option<String>,
    messages: Vec<CanonicalMessage>,
    sessions: Vec<SessionSummary>,
    is_sessions_loading: bool,
    message_writes: usize,
}

/// A [`PlaygroundStore`] held in memory behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                endpoint: endpoint.filter(|e| !e.trim().is_empty()),
                ..StoreState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // A poisoned store still holds consistent plain data.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn messages(&self) -> Vec<CanonicalMessage> {
        self.lock().messages.clone()
    }

    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.lock().sessions.clone()
    }

    pub fn is_sessions_loading(&self) -> bool {
        self.lock().is_sessions_loading
    }

    /// How many times `set_messages` has been called.
    pub fn message_writes(&self) -> usize {
        self.lock().message_writes
    }
}

impl PlaygroundStore for MemoryStore {
    fn selected_endpoint(&self) -> Option<String> {
        self.lock().endpoint.clone()
    }

    fn set_messages(&self, messages: Vec<CanonicalMessage>) {
        let mut state = self.lock();
        state.messages = messages;
        state.message_writes += 1;
    }

    fn set_sessions_data(&self, sessions: Vec<SessionSummary>) {
        self.lock().sessions = sessions;
    }

    fn set_is_sessions_loading(&self, loading: bool) {
        self.lock().is_sessions_loading = loading;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_endpoint_counts_as_unset() {
        assert_eq!(MemoryStore::new(Some("  ".to_string())).selected_endpoint(), None);
        assert_eq!(
            MemoryStore::new(Some("http://localhost:7777".to_string())).selected_endpoint(),
            Some("http://localhost:7777".to_string())
        );
    }

    #[test]
    fn message_writes_are_counted() {
        let store = MemoryStore::default();
        store.set_messages(Vec::new());
        store.set_messages(Vec::new());
        assert_eq!(store.message_writes(), 2);
        assert!(store.messages().is_empty());
    }
}
