//! Price data source ports.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::error::AuagError;
use crate::domain::record::PriceRecord;
use crate::domain::throttle::RateLimitContext;

/// Remote range fetch. One call issues one request for `[start, end]`;
/// chunking a large window into provider-sized requests is the
/// caller's job. Backoffs observed during the call are recorded into
/// the shared throttle context.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        throttle: &RateLimitContext,
    ) -> Result<Vec<PriceRecord>, AuagError>;
}

/// Result of reading a bootstrap source: the parsed records plus the
/// count of rows dropped during normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSeries {
    pub records: Vec<PriceRecord>,
    pub dropped_rows: usize,
}

/// A local bootstrap source (e.g. a bundled CSV) consulted when the
/// cache is empty. Each source is tried at most once per session.
pub trait SeedSource {
    /// Stable name used for the session's exhausted set.
    fn name(&self) -> &str;

    fn load(&self) -> Result<ParsedSeries, AuagError>;
}
