//! Persisted canonical series store.

use serde::Deserialize;
use tracing::warn;

use super::record::PriceRecord;
use super::series::sort_dedupe;
use crate::ports::cache_port::CachePort;

/// Fixed identifier for the single cached canonical series.
pub const CACHE_KEY: &str = "auag-prices";

/// Accepted blob shapes: the flat array we write, and a wrapped
/// `{"rows": [...]}` form older uploads used.
#[derive(Deserialize)]
#[serde(untagged)]
enum CacheBlob {
    Flat(Vec<PriceRecord>),
    Wrapped { rows: Vec<PriceRecord> },
}

/// Owns the persisted cache behind a [`CachePort`]. All reads degrade
/// to an empty series and writes are fire-and-forget; the in-memory
/// series stays authoritative for the session.
pub struct SeriesStore {
    cache: Box<dyn CachePort>,
    key: String,
}

impl SeriesStore {
    pub fn new(cache: Box<dyn CachePort>) -> Self {
        Self {
            cache,
            key: CACHE_KEY.to_string(),
        }
    }

    /// Read and decode the persisted series. Absent, unreadable or
    /// structurally invalid blobs all come back as an empty series.
    pub fn load(&self) -> Vec<PriceRecord> {
        let blob = match self.cache.read(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "cache read failed, starting empty");
                return Vec::new();
            }
        };

        let rows = match serde_json::from_str::<CacheBlob>(&blob) {
            Ok(CacheBlob::Flat(rows)) | Ok(CacheBlob::Wrapped { rows }) => rows,
            Err(e) => {
                warn!(key = %self.key, error = %e, "corrupt cache blob, starting empty");
                return Vec::new();
            }
        };

        sort_dedupe(rows.into_iter().filter(PriceRecord::is_valid).collect())
    }

    /// Persist the full series as the flat-array form. A write failure
    /// is logged and swallowed.
    pub fn save(&self, series: &[PriceRecord]) {
        let canonical = sort_dedupe(series.to_vec());
        let blob = match serde_json::to_string(&canonical) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(key = %self.key, error = %e, "cache serialization failed");
                return;
            }
        };
        if let Err(e) = self.cache.write(&self.key, &blob) {
            warn!(key = %self.key, error = %e, "cache write failed, in-memory series kept");
        }
    }
}
