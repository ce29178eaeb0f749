use std::time::Duration;

use hnbrief_core::error::AppError;
use reqwest::Client;
use reqwest::redirect::Policy;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "hnbrief/",
    env!("CARGO_PKG_VERSION"),
    " (Hacker News article summarizer)"
);

/// Settings for the single HTTP client shared by every collaborator.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 5,
        }
    }
}

impl ClientConfig {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Build the HTTP client. Request timeouts are set per call by the users of
/// the client, so the item lookup and the page fetch can differ.
pub fn build_http_client(config: &ClientConfig) -> Result<Client, AppError> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout)
        .redirect(Policy::limited(config.max_redirects))
        .build()
        .map_err(|e| AppError::HttpError(e.to_string()))
}

/// Classify a transport error from `send()` or a body read.
pub(crate) fn map_transport_error(e: reqwest::Error, timeout: Duration) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout)
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {e}"))
    } else {
        AppError::HttpError(e.to_string())
    }
}
