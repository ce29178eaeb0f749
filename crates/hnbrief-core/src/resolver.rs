use std::time::Duration;

use crate::models::{ItemId, RawItem, SkipKind, SkipReason};
use crate::traits::ItemSource;

/// Default per-lookup timeout for item metadata.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves item ids into validated [`RawItem`]s.
///
/// Every failure is classified into a [`SkipReason`]; nothing is raised to
/// the caller.
#[derive(Clone)]
pub struct ItemResolver<S> {
    source: S,
    timeout: Duration,
}

impl<S: ItemSource> ItemResolver<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn resolve(&self, id: ItemId) -> Result<RawItem, SkipReason> {
        let payload = match tokio::time::timeout(self.timeout, self.source.get_item(id)).await {
            Err(_) => {
                return Err(SkipReason::new(
                    id,
                    SkipKind::Timeout,
                    format!("item lookup exceeded {:?}", self.timeout),
                ));
            }
            Ok(Err(e)) => return Err(SkipReason::from_error(id, &e)),
            Ok(Ok(None)) => {
                return Err(SkipReason::new(
                    id,
                    SkipKind::NetworkError,
                    format!("item {id} not found"),
                ));
            }
            Ok(Ok(Some(payload))) => payload,
        };

        RawItem::from_payload(id, payload).map_err(|e| SkipReason::from_error(id, &e))
    }
}
