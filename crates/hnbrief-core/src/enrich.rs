//! Concurrent enrichment of listing items.
//!
//! Every input id becomes one unit of work: resolve → qualify → fetch →
//! extract. Units run concurrently on the tokio runtime and each yields
//! exactly one [`Outcome`]. Two semaphores bound the work in flight: one for
//! metadata lookups, one shared by all fetch+extract steps. Outcomes are
//! written to position-indexed slots so the result order always matches the
//! input order, whatever order the units finish in.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::models::{
    BatchResult, EnrichedRecord, ItemId, Outcome, SkipKind, SkipReason, UnitTiming,
};
use crate::qualify::qualify;
use crate::resolver::{DEFAULT_RESOLVE_TIMEOUT, ItemResolver};
use crate::traits::{Extractor, Fetcher, ItemSource};

pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;
pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 16;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(10);

/// Limits and timeouts for one coordinator.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Maximum fetch+extract units in flight at once.
    pub fetch_concurrency: usize,
    /// Maximum item lookups in flight at once.
    pub resolve_concurrency: usize,
    pub resolve_timeout: Duration,
    pub fetch_timeout: Duration,
    /// Deadline for extracting one fetched page. The fetch permit is
    /// released when it expires even though the blocking thread runs on.
    pub extract_timeout: Duration,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            resolve_concurrency: DEFAULT_RESOLVE_CONCURRENCY,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            extract_timeout: DEFAULT_EXTRACT_TIMEOUT,
        }
    }
}

impl EnrichConfig {
    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.fetch_concurrency = limit;
        self
    }

    pub fn with_resolve_concurrency(mut self, limit: usize) -> Self {
        self.resolve_concurrency = limit;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_extract_timeout(mut self, timeout: Duration) -> Self {
        self.extract_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.fetch_concurrency == 0 {
            return Err(AppError::ConfigError(
                "fetch concurrency must be at least 1".into(),
            ));
        }
        if self.resolve_concurrency == 0 {
            return Err(AppError::ConfigError(
                "resolve concurrency must be at least 1".into(),
            ));
        }
        if self.resolve_timeout.is_zero()
            || self.fetch_timeout.is_zero()
            || self.extract_timeout.is_zero()
        {
            return Err(AppError::ConfigError("timeouts must be positive".into()));
        }
        Ok(())
    }
}

/// Everything one `enrich` call produced.
#[derive(Debug, Clone)]
pub struct EnrichmentReport {
    /// One outcome per input id, in input order.
    pub results: BatchResult,
    /// One timing per input id, in input order. Advisory only.
    pub timings: Vec<UnitTiming>,
    pub elapsed: Duration,
}

impl EnrichmentReport {
    pub fn records(&self) -> impl Iterator<Item = &EnrichedRecord> {
        self.results.iter().filter_map(Outcome::as_record)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkipReason> {
        self.results.iter().filter_map(Outcome::as_skip)
    }

    /// Consume the report, keeping only the enriched records in order.
    pub fn into_records(self) -> Vec<EnrichedRecord> {
        self.results
            .into_iter()
            .filter_map(|outcome| match outcome {
                Outcome::Enriched(record) => Some(record),
                Outcome::Skipped(_) => None,
            })
            .collect()
    }
}

/// Events emitted by the coordinator for monitoring/logging.
#[derive(Debug, Clone)]
pub enum EnrichEvent<'a> {
    BatchStarted {
        items: usize,
    },
    UnitEnriched {
        record: &'a EnrichedRecord,
        duration: Duration,
    },
    UnitSkipped {
        skip: &'a SkipReason,
        duration: Duration,
    },
    UnitAborted {
        error: &'a str,
    },
    BatchFinished {
        enriched: usize,
        skipped: usize,
        elapsed: Duration,
    },
}

/// Trait for receiving coordinator events (decoupled logging).
pub trait EnrichReporter: Send + Sync {
    fn report(&self, event: EnrichEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEnrichReporter;

impl EnrichReporter for TracingEnrichReporter {
    fn report(&self, event: EnrichEvent<'_>) {
        match event {
            EnrichEvent::BatchStarted { items } => {
                tracing::info!(%items, "Enrichment started");
            }
            EnrichEvent::UnitEnriched { record, duration } => {
                tracing::debug!(
                    id = %record.id,
                    chars = record.content.chars().count(),
                    ?duration,
                    "Item enriched"
                );
            }
            EnrichEvent::UnitSkipped { skip, duration } => {
                tracing::warn!(
                    id = %skip.id,
                    reason = %skip.kind,
                    detail = %skip.detail,
                    ?duration,
                    "Item skipped"
                );
            }
            EnrichEvent::UnitAborted { error } => {
                tracing::error!(%error, "Enrichment unit terminated abnormally");
            }
            EnrichEvent::BatchFinished {
                enriched,
                skipped,
                elapsed,
            } => {
                tracing::info!(%enriched, %skipped, ?elapsed, "Enrichment finished");
            }
        }
    }
}

/// Reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl EnrichReporter for SilentReporter {}

/// Resolves, filters, fetches and extracts a batch of items.
///
/// Generic over its collaborators so tests can run without real HTTP.
/// Holds no state between invocations besides its configuration.
pub struct EnrichmentCoordinator<S, F, X>
where
    S: ItemSource,
    F: Fetcher,
    X: Extractor,
{
    resolver: ItemResolver<S>,
    fetcher: F,
    extractor: X,
    config: EnrichConfig,
}

impl<S, F, X> EnrichmentCoordinator<S, F, X>
where
    S: ItemSource,
    F: Fetcher,
    X: Extractor,
{
    /// Create a coordinator. Fails fast on an unusable configuration.
    pub fn new(source: S, fetcher: F, extractor: X, config: EnrichConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            resolver: ItemResolver::new(source).with_timeout(config.resolve_timeout),
            fetcher,
            extractor,
            config,
        })
    }

    pub fn config(&self) -> &EnrichConfig {
        &self.config
    }

    /// Enrich `ids`, logging through `tracing`, with no batch-wide deadline.
    pub async fn enrich(&self, ids: &[ItemId]) -> EnrichmentReport {
        self.enrich_with(ids, &CancellationToken::new(), &TracingEnrichReporter)
            .await
    }

    /// Enrich `ids` under a batch-wide cancellation token.
    ///
    /// Cancelling the token resolves every unfinished unit as
    /// [`SkipKind::Timeout`]; the report still has one entry per id.
    pub async fn enrich_with<R: EnrichReporter>(
        &self,
        ids: &[ItemId],
        cancel: &CancellationToken,
        reporter: &R,
    ) -> EnrichmentReport {
        let started = Instant::now();
        reporter.report(EnrichEvent::BatchStarted { items: ids.len() });

        let resolve_permits = Arc::new(Semaphore::new(self.config.resolve_concurrency));
        let fetch_permits = Arc::new(Semaphore::new(self.config.fetch_concurrency));

        let mut units = JoinSet::new();
        for (index, &id) in ids.iter().enumerate() {
            let unit = Unit {
                resolver: self.resolver.clone(),
                fetcher: self.fetcher.clone(),
                extractor: self.extractor.clone(),
                fetch_timeout: self.config.fetch_timeout,
                extract_timeout: self.config.extract_timeout,
                resolve_permits: Arc::clone(&resolve_permits),
                fetch_permits: Arc::clone(&fetch_permits),
            };
            let cancel = cancel.clone();

            units.spawn(async move {
                let dispatched = Instant::now();
                let outcome = tokio::select! {
                    outcome = unit.run(id) => outcome,
                    () = cancel.cancelled() => Outcome::Skipped(SkipReason::new(
                        id,
                        SkipKind::Timeout,
                        "batch cancelled before the item finished",
                    )),
                };
                (index, outcome, dispatched.elapsed())
            });
        }

        let mut slots: Vec<Option<(Outcome, Duration)>> = (0..ids.len()).map(|_| None).collect();
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((index, outcome, duration)) => {
                    match &outcome {
                        Outcome::Enriched(record) => {
                            reporter.report(EnrichEvent::UnitEnriched { record, duration });
                        }
                        Outcome::Skipped(skip) => {
                            reporter.report(EnrichEvent::UnitSkipped { skip, duration });
                        }
                    }
                    slots[index] = Some((outcome, duration));
                }
                Err(e) => {
                    let error = e.to_string();
                    reporter.report(EnrichEvent::UnitAborted { error: &error });
                }
            }
        }

        let mut results = Vec::with_capacity(ids.len());
        let mut timings = Vec::with_capacity(ids.len());
        for (slot, &id) in slots.into_iter().zip(ids) {
            let (outcome, duration) = slot.unwrap_or_else(|| {
                let skip = SkipReason::new(id, SkipKind::NetworkError, "unit terminated abnormally");
                (Outcome::Skipped(skip), Duration::ZERO)
            });
            timings.push(UnitTiming {
                id,
                outcome: outcome.kind(),
                duration,
            });
            results.push(outcome);
        }

        let report = EnrichmentReport {
            results,
            timings,
            elapsed: started.elapsed(),
        };
        let enriched = report.records().count();
        reporter.report(EnrichEvent::BatchFinished {
            enriched,
            skipped: report.results.len() - enriched,
            elapsed: report.elapsed,
        });
        report
    }
}

/// The per-id unit of work. Owns clones of every collaborator so it can run
/// as an independent task.
struct Unit<S, F, X> {
    resolver: ItemResolver<S>,
    fetcher: F,
    extractor: X,
    fetch_timeout: Duration,
    extract_timeout: Duration,
    resolve_permits: Arc<Semaphore>,
    fetch_permits: Arc<Semaphore>,
}

impl<S, F, X> Unit<S, F, X>
where
    S: ItemSource,
    F: Fetcher,
    X: Extractor,
{
    async fn run(self, id: ItemId) -> Outcome {
        let item = {
            let Ok(_permit) = self.resolve_permits.acquire().await else {
                return closed_limiter(id);
            };
            match self.resolver.resolve(id).await {
                Ok(item) => item,
                Err(skip) => return Outcome::Skipped(skip),
            }
        };

        let url = match qualify(&item) {
            Ok(url) => url.to_string(),
            Err(skip) => return Outcome::Skipped(skip),
        };

        // Held across fetch and extraction: the unit counts against the limit
        // until its outcome is known.
        let Ok(_permit) = self.fetch_permits.acquire().await else {
            return closed_limiter(id);
        };

        tracing::debug!(%id, %url, "Fetching linked resource");
        let content = match self.fetch_and_extract(&url).await {
            Ok(content) => content,
            Err(e) => return Outcome::Skipped(SkipReason::from_error(id, &e)),
        };

        match EnrichedRecord::new(item, url, content) {
            Ok(record) => Outcome::Enriched(record),
            Err(e) => Outcome::Skipped(SkipReason::from_error(id, &e)),
        }
    }

    async fn fetch_and_extract(&self, url: &str) -> Result<String, AppError> {
        let page = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| AppError::Timeout(self.fetch_timeout))??;

        tracing::debug!(
            url = %page.final_url,
            bytes = page.body.len(),
            content_type = ?page.content_type,
            "Fetched resource"
        );

        let extractor = self.extractor.clone();
        let extraction = tokio::task::spawn_blocking(move || {
            extractor.extract(&page.body, page.content_type.as_deref())
        });
        tokio::time::timeout(self.extract_timeout, extraction)
            .await
            .map_err(|_| {
                AppError::ExtractionFailed(format!(
                    "extraction did not finish within {:?}",
                    self.extract_timeout
                ))
            })?
            .map_err(|e| AppError::ExtractionFailed(format!("extraction task failed: {e}")))?
    }
}

fn closed_limiter(id: ItemId) -> Outcome {
    Outcome::Skipped(SkipReason::new(
        id,
        SkipKind::NetworkError,
        "concurrency limiter closed",
    ))
}
