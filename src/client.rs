//! Playground service client.
//!
//! [`PlaygroundApi`] is the fetch surface the loader depends on;
//! [`HttpPlaygroundApi`] implements it over the playground REST routes:
//!
//! ```text
//! GET {endpoint}/v1/playground/agents/{agent_id}/sessions
//! GET {endpoint}/v1/playground/agents/{agent_id}/sessions/{session_id}
//! ```

use std::time::Duration;

use anyhow::{Context, bail};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, trace};

use crate::model::SessionSummary;

/// Fetches raw session data from a playground service.
pub trait PlaygroundApi: Send + Sync {
    /// All sessions stored for `agent_id`.
    fn fetch_sessions(&self, endpoint: &str, agent_id: &str)
    -> anyhow::Result<Vec<SessionSummary>>;

    /// One raw session record, or `None` when the service has nothing.
    fn fetch_session(
        &self,
        endpoint: &str,
        agent_id: &str,
        session_id: &str,
    ) -> anyhow::Result<Option<Value>>;
}

/// Canonical base URL: scheme added when missing, trailing slashes trimmed.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

pub fn sessions_url(endpoint: &str, agent_id: &str) -> String {
    format!(
        "{}/v1/playground/agents/{}/sessions",
        normalize_endpoint(endpoint),
        urlencoding::encode(agent_id)
    )
}

pub fn session_url(endpoint: &str, agent_id: &str, session_id: &str) -> String {
    format!(
        "{}/{}",
        sessions_url(endpoint, agent_id),
        urlencoding::encode(session_id)
    )
}

/// Blocking HTTP implementation of [`PlaygroundApi`].
#[derive(Debug, Clone)]
pub struct HttpPlaygroundApi {
    client: reqwest::blocking::Client,
}

impl HttpPlaygroundApi {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("playback/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }

    /// GET `url`; `Ok(None)` on 404 or a blank / `null` body.
    fn get_json(&self, url: &str) -> anyhow::Result<Option<Value>> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("requesting {url}"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%url, "not found");
            return Ok(None);
        }
        let body = response
            .text()
            .with_context(|| format!("reading response body from {url}"))?;
        if !status.is_success() {
            bail!("{url} returned {status}: {}", body.trim());
        }
        trace!(%url, bytes = body.len(), "response received");

        if body.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(&body)
            .with_context(|| format!("parsing JSON from {url}"))?;
        Ok((!value.is_null()).then_some(value))
    }
}

impl PlaygroundApi for HttpPlaygroundApi {
    fn fetch_sessions(
        &self,
        endpoint: &str,
        agent_id: &str,
    ) -> anyhow::Result<Vec<SessionSummary>> {
        let url = sessions_url(endpoint, agent_id);
        let Some(value) = self.get_json(&url)? else {
            return Ok(Vec::new());
        };
        serde_json::from_value(value).with_context(|| format!("decoding session list from {url}"))
    }

    fn fetch_session(
        &self,
        endpoint: &str,
        agent_id: &str,
        session_id: &str,
    ) -> anyhow::Result<Option<Value>> {
        self.get_json(&session_url(endpoint, agent_id, session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_gets_scheme_and_loses_trailing_slash() {
        assert_eq!(normalize_endpoint("localhost:7777/"), "http://localhost:7777");
        assert_eq!(
            normalize_endpoint(" https://agents.example.com// "),
            "https://agents.example.com"
        );
    }

    #[test]
    fn session_routes_are_built_and_encoded() {
        assert_eq!(
            sessions_url("http://localhost:7777", "web-agent"),
            "http://localhost:7777/v1/playground/agents/web-agent/sessions"
        );
        assert_eq!(
            session_url("localhost:7777", "my agent", "a/b"),
            "http://localhost:7777/v1/playground/agents/my%20agent/sessions/a%2Fb"
        );
    }
}
