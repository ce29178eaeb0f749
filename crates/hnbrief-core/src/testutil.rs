//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` (or atomics) for interior mutability,
//! allowing test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::enrich::{EnrichEvent, EnrichReporter};
use crate::error::AppError;
use crate::models::ItemId;
use crate::traits::{Extractor, FetchedPage, Fetcher, ItemSource, Summarizer};

pub fn item_id(raw: u64) -> ItemId {
    ItemId::new(raw).unwrap()
}

pub fn item_ids(raw: &[u64]) -> Vec<ItemId> {
    raw.iter().copied().map(item_id).collect()
}

/// HTML long enough to pass [`MockExtractor`], tagged so tests can tell
/// pages apart.
pub fn article_html(tag: &str) -> String {
    format!(
        "<html><body><nav>Home</nav><article><p>This is article {tag}. \
         It has enough words to count as real content for the mock extractor.</p>\
         </article></body></html>"
    )
}

/// Failure a mock collaborator should produce.
#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    Status(u16),
    Timeout,
    Network,
    ContentType(&'static str),
}

impl MockFailure {
    fn to_error(self, target: &str) -> AppError {
        match self {
            MockFailure::Status(status) => AppError::HttpStatus {
                status,
                url: target.to_string(),
            },
            MockFailure::Timeout => AppError::Timeout(Duration::from_secs(1)),
            MockFailure::Network => AppError::NetworkError(format!("connection refused: {target}")),
            MockFailure::ContentType(ct) => AppError::UnsupportedContentType(ct.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockItemSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum MockItem {
    Payload(serde_json::Value),
    Missing,
    Fail(MockFailure),
}

/// Mock listing API backed by an in-memory map. Unknown ids are "not found".
#[derive(Clone, Default)]
pub struct MockItemSource {
    items: Arc<Mutex<HashMap<u64, MockItem>>>,
    delay: Duration,
}

impl MockItemSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(self, id: u64, payload: serde_json::Value) -> Self {
        self.items
            .lock()
            .unwrap()
            .insert(id, MockItem::Payload(payload));
        self
    }

    pub fn story(self, id: u64, url: &str) -> Self {
        self.item(
            id,
            serde_json::json!({
                "id": id,
                "type": "story",
                "by": "tester",
                "title": format!("Story {id}"),
                "url": url,
                "score": 10,
                "descendants": 3,
                "time": 1_700_000_000
            }),
        )
    }

    pub fn job(self, id: u64) -> Self {
        self.item(
            id,
            serde_json::json!({
                "id": id,
                "type": "job",
                "by": "recruiter",
                "title": format!("Job {id} is hiring"),
                "score": 1,
                "time": 1_700_000_000
            }),
        )
    }

    pub fn missing(self, id: u64) -> Self {
        self.items.lock().unwrap().insert(id, MockItem::Missing);
        self
    }

    pub fn failing(self, id: u64, failure: MockFailure) -> Self {
        self.items
            .lock()
            .unwrap()
            .insert(id, MockItem::Fail(failure));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl ItemSource for MockItemSource {
    async fn get_item(&self, id: ItemId) -> Result<Option<serde_json::Value>, AppError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let entry = self.items.lock().unwrap().get(&id.get()).cloned();
        match entry {
            Some(MockItem::Payload(payload)) => Ok(Some(payload)),
            Some(MockItem::Missing) | None => Ok(None),
            Some(MockItem::Fail(failure)) => Err(failure.to_error(&format!("item/{id}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct MockPage {
    response: Result<String, MockFailure>,
    delay: Duration,
}

/// Mock fetcher keyed by URL. Tracks how many fetches overlap.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<Mutex<HashMap<String, MockPage>>>,
    calls: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, html: impl Into<String>) -> Self {
        self.page_with_delay(url, html, Duration::ZERO)
    }

    pub fn page_with_delay(self, url: &str, html: impl Into<String>, delay: Duration) -> Self {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            MockPage {
                response: Ok(html.into()),
                delay,
            },
        );
        self
    }

    pub fn failing(self, url: &str, failure: MockFailure) -> Self {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            MockPage {
                response: Err(failure),
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the fetch future is dropped.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, AppError> {
        self.calls.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        let page = self.pages.lock().unwrap().get(url).cloned();
        let Some(page) = page else {
            return Err(MockFailure::Status(404).to_error(url));
        };

        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }

        match page.response {
            Ok(html) => Ok(FetchedPage {
                final_url: url.to_string(),
                content_type: Some("text/html; charset=utf-8".to_string()),
                body: html.into_bytes(),
            }),
            Err(failure) => Err(failure.to_error(url)),
        }
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor: strips tags, collapses whitespace, enforces a minimum
/// length. Deterministic.
#[derive(Clone, Default)]
pub struct MockExtractor {
    slow_page: Option<(String, Duration)>,
}

impl MockExtractor {
    pub const MIN_CHARS: usize = 60;

    pub fn new() -> Self {
        Self::default()
    }

    /// Block the calling thread for `delay` on pages containing `marker`.
    pub fn with_slow_page(mut self, marker: &str, delay: Duration) -> Self {
        self.slow_page = Some((marker.to_string(), delay));
        self
    }
}

impl Extractor for MockExtractor {
    fn extract(&self, html: &[u8], _content_type: Option<&str>) -> Result<String, AppError> {
        let raw = String::from_utf8_lossy(html);
        if let Some((marker, delay)) = &self.slow_page {
            if raw.contains(marker.as_str()) {
                std::thread::sleep(*delay);
            }
        }
        let mut text = String::new();
        let mut in_tag = false;
        for ch in raw.chars() {
            match ch {
                '<' => in_tag = true,
                '>' => {
                    in_tag = false;
                    text.push(' ');
                }
                _ if !in_tag => text.push(ch),
                _ => {}
            }
        }
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.chars().count() < Self::MIN_CHARS {
            return Err(AppError::ExtractionFailed(format!(
                "only {} characters of text",
                text.chars().count()
            )));
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// MockSummarizer
// ---------------------------------------------------------------------------

/// Mock summarizer that returns queued responses and records prompts.
#[derive(Clone, Default)]
pub struct MockSummarizer {
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl MockSummarizer {
    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Summarizer for MockSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String, AppError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("A default summary.".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that flattens events into strings for assertions.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl EnrichReporter for RecordingReporter {
    fn report(&self, event: EnrichEvent<'_>) {
        let line = match event {
            EnrichEvent::BatchStarted { items } => format!("started:{items}"),
            EnrichEvent::UnitEnriched { record, .. } => format!("enriched:{}", record.id),
            EnrichEvent::UnitSkipped { skip, .. } => format!("skipped:{}:{}", skip.id, skip.kind),
            EnrichEvent::UnitAborted { error } => format!("aborted:{error}"),
            EnrichEvent::BatchFinished {
                enriched, skipped, ..
            } => format!("finished:{enriched}:{skipped}"),
        };
        self.events.lock().unwrap().push(line);
    }
}
