use std::future::Future;

use crate::error::AppError;
use crate::models::ItemId;

/// Source of raw item payloads (the listing API).
pub trait ItemSource: Send + Sync + Clone + 'static {
    /// Fetch the JSON payload for an item. `Ok(None)` means the API answered
    /// but has no such item.
    fn get_item(
        &self,
        id: ItemId,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, AppError>> + Send;
}

/// A downloaded resource, body fully buffered.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Downloads the resource an item links to.
pub trait Fetcher: Send + Sync + Clone + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, AppError>> + Send;
}

/// Turns raw HTML into the main readable text of the page.
///
/// CPU-bound and synchronous; callers run it off the async workers.
pub trait Extractor: Send + Sync + Clone + 'static {
    fn extract(&self, html: &[u8], content_type: Option<&str>) -> Result<String, AppError>;
}

/// Text-in, text-out summarization service.
pub trait Summarizer: Send + Sync + Clone {
    fn summarize(&self, prompt: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}
