//! Typed errors for session loading.
//!
//! Collaborators propagate with `anyhow`; the loader classifies every
//! failure into a [`LoadError`] so it can pick the right user-facing notice.

/// Notice shown when the session list cannot be fetched.
pub const SESSIONS_LOAD_FAILED: &str = "Error loading sessions";

/// Notice shown when a session loads but yields nothing displayable.
pub const NO_MESSAGES_FOUND: &str = "No messages found in this session";

/// Notice shown for any fetch or processing failure of a single session.
pub const SESSION_LOAD_FAILED: &str = "Error loading session messages";

/// Errors that can end a session load.
///
/// None of these escape [`SessionLoader`](crate::loader::SessionLoader);
/// they are reported through the notifier and surfaced as `None`.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The playground service could not be reached or answered with an error.
    #[error("failed to fetch from playground: {0:#}")]
    Fetch(#[source] anyhow::Error),

    /// The payload could not be interpreted as a session record.
    #[error("malformed session payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The service answered, but with nothing.
    #[error("session '{session_id}' returned an empty response")]
    EmptyResponse { session_id: String },

    /// The record parsed, but none of its runs produced a message.
    #[error("session '{session_id}' contains no messages")]
    NoMessages { session_id: String },
}

impl LoadError {
    /// The notice to surface to the user, if any.
    ///
    /// An empty response is treated as a silent miss.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            LoadError::Fetch(_) | LoadError::Malformed(_) => Some(SESSION_LOAD_FAILED),
            LoadError::NoMessages { .. } => Some(NO_MESSAGES_FOUND),
            LoadError::EmptyResponse { .. } => None,
        }
    }
}
