//! HTTP client for the navigation service

use showcue_common::api::{CommandRequest, ErrorResponse, NavigationStateResponse};
use showcue_common::NavCommand;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ConsoleError, Result};

/// Typed client for one session on one navigation service
#[derive(Clone)]
pub struct NavClient {
    client: reqwest::Client,
    base_url: String,
    session_id: Uuid,
}

impl NavClient {
    pub fn new(base_url: &str, session_id: Uuid) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// URL of the session's SSE event stream
    pub fn events_url(&self) -> String {
        format!("{}/sessions/{}/events", self.base_url, self.session_id)
    }

    /// Apply a navigation command; returns the resulting state
    pub async fn apply(&self, command: NavCommand) -> Result<NavigationStateResponse> {
        debug!(?command, "sending navigation command");
        let response = self
            .client
            .post(format!(
                "{}/sessions/{}/navigate",
                self.base_url, self.session_id
            ))
            .json(&CommandRequest { command })
            .send()
            .await?;
        Self::parse_state(response).await
    }

    /// Fetch the authoritative current state (resync read)
    pub async fn fetch_state(&self) -> Result<NavigationStateResponse> {
        let response = self
            .client
            .get(format!(
                "{}/sessions/{}/navigation",
                self.base_url, self.session_id
            ))
            .send()
            .await?;
        Self::parse_state(response).await
    }

    async fn parse_state(response: reqwest::Response) -> Result<NavigationStateResponse> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(err) => Err(ConsoleError::Server {
                code: err.error,
                message: err.message,
            }),
            Err(_) => Err(ConsoleError::Server {
                code: status.as_str().to_string(),
                message: format!("server returned {}", status),
            }),
        }
    }
}
