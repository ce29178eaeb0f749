pub mod enrich;
pub mod error;
pub mod models;
pub mod prompt;
pub mod qualify;
pub mod resolver;
pub mod summarize;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use enrich::{
    EnrichConfig, EnrichEvent, EnrichReporter, EnrichmentCoordinator, EnrichmentReport,
    SilentReporter, TracingEnrichReporter,
};
pub use error::AppError;
pub use models::{
    BatchResult, EnrichedRecord, ItemId, ItemType, Outcome, OutcomeKind, RawItem, SkipKind,
    SkipReason, UnitTiming,
};
pub use prompt::PromptTemplate;
pub use qualify::qualify;
pub use resolver::ItemResolver;
pub use summarize::{Summary, SummaryService};
pub use traits::{Extractor, FetchedPage, Fetcher, ItemSource, Summarizer};
