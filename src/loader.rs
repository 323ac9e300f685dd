//! Session loader: wires the playground client, the normalizer, the state
//! store, and the notifier together.
//!
//! Both entry points are total: every failure ends in a notice (or silence)
//! and a `None`, never an error returned to the caller.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::client::PlaygroundApi;
use crate::error::{LoadError, SESSIONS_LOAD_FAILED};
use crate::model::{CanonicalMessage, SessionSummary};
use crate::normalize::{normalize_value, now_epoch_secs};
use crate::notify::Notifier;
use crate::store::PlaygroundStore;

/// Holds the sessions-loading flag up for as long as it lives.
struct LoadingGuard<'a> {
    store: &'a dyn PlaygroundStore,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(store: &'a dyn PlaygroundStore) -> Self {
        store.set_is_sessions_loading(true);
        Self { store }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.set_is_sessions_loading(false);
    }
}

/// Loads session lists and individual sessions into a [`PlaygroundStore`].
pub struct SessionLoader {
    api: Arc<dyn PlaygroundApi>,
    store: Arc<dyn PlaygroundStore>,
    notifier: Arc<dyn Notifier>,
    /// Ticket of the newest `get_session`. Held while clearing and while
    /// publishing, so the freshness check and the write cannot be split.
    latest_request: Mutex<u64>,
    clock: fn() -> i64,
}

impl SessionLoader {
    pub fn new(
        api: Arc<dyn PlaygroundApi>,
        store: Arc<dyn PlaygroundStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            store,
            notifier,
            latest_request: Mutex::new(0),
            clock: now_epoch_secs,
        }
    }

    /// Replace the epoch-seconds clock used for tool-call timestamp defaults.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    fn latest_request(&self) -> MutexGuard<'_, u64> {
        self.latest_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn endpoint(&self) -> Option<String> {
        self.store
            .selected_endpoint()
            .filter(|endpoint| !endpoint.trim().is_empty())
    }

    /// Fetch the session list for `agent_id` into the store.
    ///
    /// A blank agent id or missing endpoint makes this a no-op. On failure
    /// the previous list is kept and "Error loading sessions" is reported.
    pub fn get_sessions(&self, agent_id: &str) -> Option<Vec<SessionSummary>> {
        if agent_id.is_empty() {
            return None;
        }
        let endpoint = self.endpoint()?;

        let _loading = LoadingGuard::acquire(&*self.store);
        match self.api.fetch_sessions(&endpoint, agent_id) {
            Ok(sessions) => {
                info!(agent_id, count = sessions.len(), "loaded session list");
                self.store.set_sessions_data(sessions.clone());
                Some(sessions)
            }
            Err(e) => {
                warn!(agent_id, error = %format!("{e:#}"), "failed to load session list");
                self.notifier.error(SESSIONS_LOAD_FAILED);
                None
            }
        }
    }

    /// Load one session, normalize it, and publish the messages.
    ///
    /// The store's messages are cleared before fetching. Returns `None` when
    /// preconditions are missing, the service answers with nothing, the
    /// session holds no messages, or anything fails along the way.
    pub fn get_session(&self, session_id: &str, agent_id: &str) -> Option<Vec<CanonicalMessage>> {
        if session_id.is_empty() || agent_id.is_empty() {
            return None;
        }
        let endpoint = self.endpoint()?;

        let ticket = {
            let mut latest = self.latest_request();
            *latest += 1;
            self.store.set_messages(Vec::new());
            *latest
        };
        info!(session_id, agent_id, ticket, "loading session");

        // The fetch runs unlocked so a newer call can start meanwhile.
        match self.load_session(&endpoint, session_id, agent_id) {
            Ok(messages) => {
                let latest = self.latest_request();
                if *latest == ticket {
                    self.store.set_messages(messages.clone());
                    debug!(session_id, count = messages.len(), "messages published");
                } else {
                    debug!(
                        session_id,
                        ticket,
                        latest = *latest,
                        "newer load in flight; not publishing stale messages"
                    );
                }
                drop(latest);
                Some(messages)
            }
            Err(err) => {
                match err.user_message() {
                    Some(notice) => {
                        warn!(session_id, agent_id, error = %err, "session load failed");
                        self.notifier.error(notice);
                    }
                    None => debug!(session_id, error = %err, "session load came back empty"),
                }
                None
            }
        }
    }

    fn load_session(
        &self,
        endpoint: &str,
        session_id: &str,
        agent_id: &str,
    ) -> Result<Vec<CanonicalMessage>, LoadError> {
        let raw = self
            .api
            .fetch_session(endpoint, agent_id, session_id)
            .map_err(LoadError::Fetch)?
            .ok_or_else(|| LoadError::EmptyResponse {
                session_id: session_id.to_string(),
            })?;

        let messages = normalize_value(raw, (self.clock)())?;
        if messages.is_empty() {
            return Err(LoadError::NoMessages {
                session_id: session_id.to_string(),
            });
        }
        Ok(messages)
    }
}
