use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use hnbrief_core::error::AppError;
use hnbrief_core::models::ItemId;
use hnbrief_core::resolver::DEFAULT_RESOLVE_TIMEOUT;
use hnbrief_core::traits::ItemSource;
use reqwest::Client;

use crate::http::map_transport_error;

pub const DEFAULT_HN_API: &str = "https://hacker-news.firebaseio.com/v0";

/// Which story listing to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Feed {
    #[default]
    New,
    Top,
    Best,
}

impl Feed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::New => "new",
            Feed::Top => "top",
            Feed::Best => "best",
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            Feed::New => "newstories.json",
            Feed::Top => "topstories.json",
            Feed::Best => "beststories.json",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Feed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Feed::New),
            "top" => Ok(Feed::Top),
            "best" => Ok(Feed::Best),
            _ => Err(format!("Unknown feed: {s} (expected new, top or best)")),
        }
    }
}

/// Client for the Hacker News Firebase API.
///
/// Lists story ids and serves raw item payloads to the resolver.
#[derive(Clone)]
pub struct HnApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HnApiClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_HN_API.to_string(),
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The first `limit` ids of a story listing, in ranking order.
    pub async fn story_ids(&self, feed: Feed, limit: usize) -> Result<Vec<ItemId>, AppError> {
        let url = format!("{}/{}", self.base_url, feed.endpoint());
        let value = self.get_json(&url).await?;

        let raw: Vec<u64> = serde_json::from_value(value)
            .map_err(|e| AppError::MalformedPayload(format!("{feed} listing: {e}")))?;

        raw.into_iter()
            .take(limit)
            .map(|id| {
                ItemId::new(id)
                    .map_err(|_| AppError::MalformedPayload(format!("{feed} listing contains id 0")))
            })
            .collect()
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, AppError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        serde_json::from_slice(&body)
            .map_err(|e| AppError::MalformedPayload(format!("invalid JSON from {url}: {e}")))
    }
}

impl ItemSource for HnApiClient {
    async fn get_item(&self, id: ItemId) -> Result<Option<serde_json::Value>, AppError> {
        let url = format!("{}/item/{id}.json", self.base_url);
        let value = self.get_json(&url).await?;
        // The API answers `null` for ids it does not know.
        Ok((!value.is_null()).then_some(value))
    }
}
