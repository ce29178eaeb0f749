use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Identifier of a listing item. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    pub fn new(raw: u64) -> Result<Self, AppError> {
        if raw == 0 {
            return Err(AppError::InvalidInput("item id must be positive".into()));
        }
        Ok(Self(raw))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ItemId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("'{s}' is not a valid item id")))?;
        Self::new(raw)
    }
}

/// Kind of listing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Story,
    Job,
    Poll,
    PollOpt,
    Comment,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Story => "story",
            ItemType::Job => "job",
            ItemType::Poll => "poll",
            ItemType::PollOpt => "pollopt",
            ItemType::Comment => "comment",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "story" => Ok(ItemType::Story),
            "job" => Ok(ItemType::Job),
            "poll" => Ok(ItemType::Poll),
            "pollopt" => Ok(ItemType::PollOpt),
            "comment" => Ok(ItemType::Comment),
            _ => Err(format!("Unknown item type: {s}")),
        }
    }
}

/// Item metadata as returned by the listing API.
///
/// Fields the API leaves out stay `None`. In particular a missing `score` or
/// `descendant_count` is not the same thing as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawItem {
    pub id: ItemId,
    pub item_type: ItemType,
    pub title: Option<String>,
    pub url: Option<String>,
    pub score: Option<u32>,
    pub descendant_count: Option<u32>,
    pub author: Option<String>,
    pub unix_time: Option<i64>,
    pub deleted: bool,
    pub dead: bool,
}

/// Wire shape of an item payload. Everything optional so validation can
/// report exactly what is missing.
#[derive(Deserialize)]
struct ItemPayload {
    id: Option<u64>,
    #[serde(rename = "type")]
    item_type: Option<String>,
    by: Option<String>,
    time: Option<i64>,
    title: Option<String>,
    url: Option<String>,
    score: Option<i64>,
    descendants: Option<i64>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    dead: bool,
}

impl RawItem {
    /// Decode and validate a JSON payload for the requested id.
    ///
    /// Fails closed: a payload with a missing or mismatched id, an unknown
    /// type, or negative counters is rejected as a whole.
    pub fn from_payload(requested: ItemId, payload: serde_json::Value) -> Result<Self, AppError> {
        if payload.is_null() {
            return Err(AppError::MalformedPayload(format!(
                "item {requested} not found"
            )));
        }

        let raw: ItemPayload = serde_json::from_value(payload)
            .map_err(|e| AppError::MalformedPayload(format!("item {requested}: {e}")))?;

        match raw.id {
            Some(id) if id == requested.get() => {}
            Some(other) => {
                return Err(AppError::MalformedPayload(format!(
                    "asked for item {requested}, got {other}"
                )));
            }
            None => {
                return Err(AppError::MalformedPayload(format!(
                    "item {requested}: missing id"
                )));
            }
        }

        let item_type = raw
            .item_type
            .as_deref()
            .ok_or_else(|| AppError::MalformedPayload(format!("item {requested}: missing type")))?
            .parse::<ItemType>()
            .map_err(|e| AppError::MalformedPayload(format!("item {requested}: {e}")))?;

        Ok(Self {
            id: requested,
            item_type,
            title: raw.title,
            url: raw.url,
            score: non_negative(raw.score, "score", requested)?,
            descendant_count: non_negative(raw.descendants, "descendants", requested)?,
            author: raw.by,
            unix_time: raw.time,
            deleted: raw.deleted,
            dead: raw.dead,
        })
    }
}

fn non_negative(value: Option<i64>, field: &str, id: ItemId) -> Result<Option<u32>, AppError> {
    value
        .map(|v| {
            u32::try_from(v).map_err(|_| {
                AppError::MalformedPayload(format!("item {id}: {field} out of range ({v})"))
            })
        })
        .transpose()
}

/// Why an item produced no enriched record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum SkipKind {
    NoUrl,
    NonTextType,
    HttpError(u16),
    Timeout,
    UnsupportedContentType,
    ExtractionFailed,
    NetworkError,
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipKind::NoUrl => write!(f, "no_url"),
            SkipKind::NonTextType => write!(f, "non_text_type"),
            SkipKind::HttpError(code) => write!(f, "http_error({code})"),
            SkipKind::Timeout => write!(f, "timeout"),
            SkipKind::UnsupportedContentType => write!(f, "unsupported_content_type"),
            SkipKind::ExtractionFailed => write!(f, "extraction_failed"),
            SkipKind::NetworkError => write!(f, "network_error"),
        }
    }
}

/// A skipped item with its classification and a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipReason {
    pub id: ItemId,
    #[serde(flatten)]
    pub kind: SkipKind,
    pub detail: String,
}

impl SkipReason {
    pub fn new(id: ItemId, kind: SkipKind, detail: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            detail: detail.into(),
        }
    }

    pub fn from_error(id: ItemId, error: &AppError) -> Self {
        Self::new(id, error.skip_kind(), error.to_string())
    }
}

/// A qualifying item together with its extracted article text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub id: ItemId,
    pub title: Option<String>,
    pub url: String,
    pub score: Option<u32>,
    pub descendant_count: Option<u32>,
    pub author: Option<String>,
    pub time_iso: Option<String>,
    pub content: String,
}

impl EnrichedRecord {
    /// Build a record from a resolved item and its extracted content.
    ///
    /// Blank content is rejected as an extraction failure.
    pub fn new(item: RawItem, url: String, content: String) -> Result<Self, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::ExtractionFailed("extracted content is empty".into()));
        }

        Ok(Self {
            id: item.id,
            title: item.title,
            url,
            score: item.score,
            descendant_count: item.descendant_count,
            author: item.author,
            time_iso: item.unix_time.and_then(unix_to_iso),
            content,
        })
    }
}

/// One slot of a batch result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Enriched(EnrichedRecord),
    Skipped(SkipReason),
}

impl Outcome {
    pub fn id(&self) -> ItemId {
        match self {
            Outcome::Enriched(record) => record.id,
            Outcome::Skipped(skip) => skip.id,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Enriched(_) => OutcomeKind::Enriched,
            Outcome::Skipped(skip) => OutcomeKind::Skipped(skip.kind),
        }
    }

    pub fn as_record(&self) -> Option<&EnrichedRecord> {
        match self {
            Outcome::Enriched(record) => Some(record),
            Outcome::Skipped(_) => None,
        }
    }

    pub fn as_skip(&self) -> Option<&SkipReason> {
        match self {
            Outcome::Enriched(_) => None,
            Outcome::Skipped(skip) => Some(skip),
        }
    }
}

/// Ordered outcomes, one per input id.
pub type BatchResult = Vec<Outcome>;

/// Coarse outcome label used for timing reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Enriched,
    Skipped(SkipKind),
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Enriched => write!(f, "enriched"),
            OutcomeKind::Skipped(kind) => write!(f, "skipped:{kind}"),
        }
    }
}

/// Duration of a single unit, from dispatch to outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitTiming {
    pub id: ItemId,
    pub outcome: OutcomeKind,
    pub duration: Duration,
}

/// Convert a unix timestamp (seconds) to an RFC 3339 UTC string.
///
/// Example: `0` → `"1970-01-01T00:00:00+00:00"`
pub fn unix_to_iso(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339())
}
