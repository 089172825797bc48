//! History assembly: cache, bootstrap sources and remote fetch merged
//! into one canonical window.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::error::AuagError;
use super::record::PriceRecord;
use super::series::{merge, missing_gaps, slice_range, sort_dedupe, split_chunks};
use super::store::SeriesStore;
use super::throttle::RateLimitContext;
use crate::ports::price_source_port::{PriceSource, SeedSource};
use crate::ports::sleep_port::SleepPort;

/// Sub-chunk ceiling per request, under typical provider 365-day
/// window limits.
pub const MAX_CHUNK_DAYS: i64 = 360;

/// Outcome of one assembly pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledHistory {
    /// Canonical records restricted to the requested window.
    pub records: Vec<PriceRecord>,
    /// Rows dropped while normalizing bootstrap sources.
    pub dropped_rows: usize,
    /// Terminal fetch failure, if one gap could not be filled. The
    /// already cached/merged data is still returned alongside it.
    pub fetch_error: Option<String>,
    /// The load was superseded mid-flight; nothing was committed and
    /// `records` reflects the prior cache state.
    pub superseded: bool,
}

/// Lets a newer request supersede an in-flight assembly.
#[derive(Clone)]
pub struct AssemblerHandle {
    generation: Arc<AtomicU64>,
}

impl AssemblerHandle {
    pub fn supersede(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Orchestrates one price window: read cache, bootstrap if empty,
/// fetch only the missing gaps in throttled sub-chunks, merge under
/// cache-wins precedence, persist, slice.
pub struct HistoryAssembler {
    store: SeriesStore,
    seeds: Vec<Box<dyn SeedSource>>,
    exhausted_seeds: HashSet<String>,
    throttle: RateLimitContext,
    sleeper: Box<dyn SleepPort>,
    generation: Arc<AtomicU64>,
}

impl HistoryAssembler {
    pub fn new(store: SeriesStore, sleeper: Box<dyn SleepPort>) -> Self {
        Self {
            store,
            seeds: Vec::new(),
            exhausted_seeds: HashSet::new(),
            throttle: RateLimitContext::new(),
            sleeper,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append a bootstrap source; sources are consulted in insertion
    /// order when the cache comes up empty.
    pub fn with_seed(mut self, seed: Box<dyn SeedSource>) -> Self {
        self.seeds.push(seed);
        self
    }

    pub fn handle(&self) -> AssemblerHandle {
        AssemblerHandle {
            generation: Arc::clone(&self.generation),
        }
    }

    pub fn throttle(&self) -> &RateLimitContext {
        &self.throttle
    }

    /// Assemble the canonical series for `[start, end]`.
    ///
    /// Without a source, gaps simply stay absent from the result. A
    /// terminal fetch error is carried on the outcome instead of
    /// discarding the data that did assemble.
    pub async fn load_merged_prices(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        source: Option<&dyn PriceSource>,
    ) -> Result<AssembledHistory, AuagError> {
        if end < start {
            return Err(AuagError::Validation {
                reason: format!("end date {end} before start date {start}"),
            });
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let mut series = self.store.load();
        let mut dropped_rows = 0;
        let mut seeded = false;

        if series.is_empty() {
            (series, dropped_rows, seeded) = self.bootstrap();
        }

        let gaps = missing_gaps(&series, start, end);
        let mut fetched = Vec::new();
        let mut fetch_error = None;

        if let Some(source) = source {
            let mut issued_any = false;
            'gaps: for gap in &gaps {
                for (chunk_start, chunk_end) in split_chunks(gap.start, gap.end, MAX_CHUNK_DAYS) {
                    if issued_any {
                        let pause = self.throttle.current_delay();
                        if !pause.is_zero() {
                            self.sleeper.sleep(pause).await;
                        }
                    }
                    issued_any = true;

                    debug!(%chunk_start, %chunk_end, "fetching gap chunk");
                    match source.fetch_range(chunk_start, chunk_end, &self.throttle).await {
                        Ok(records) => {
                            fetched.extend(records.into_iter().filter(PriceRecord::is_valid));
                        }
                        Err(e) => {
                            warn!(%chunk_start, %chunk_end, error = %e, "gap fetch failed, keeping assembled data");
                            fetch_error = Some(e.to_string());
                            break 'gaps;
                        }
                    }
                }
            }
        }

        if seeded || !fetched.is_empty() {
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("assembly superseded, discarding fetched records");
                return Ok(AssembledHistory {
                    records: slice_range(&self.store.load(), start, end),
                    dropped_rows,
                    fetch_error,
                    superseded: true,
                });
            }
            // cache and bootstrap data take precedence: the fetch only
            // fills true gaps
            let merged = merge(&sort_dedupe(fetched), &series);
            self.store.save(&merged);
            series = merged;
        }

        Ok(AssembledHistory {
            records: slice_range(&series, start, end),
            dropped_rows,
            fetch_error,
            superseded: false,
        })
    }

    /// Try each seed source once per session, in order, until one
    /// yields data.
    fn bootstrap(&mut self) -> (Vec<PriceRecord>, usize, bool) {
        for seed in &self.seeds {
            let name = seed.name().to_string();
            if !self.exhausted_seeds.insert(name.clone()) {
                continue;
            }
            match seed.load() {
                Ok(parsed) if !parsed.records.is_empty() => {
                    debug!(seed = %name, records = parsed.records.len(), "bootstrapped from seed source");
                    return (sort_dedupe(parsed.records), parsed.dropped_rows, true);
                }
                Ok(_) => {
                    debug!(seed = %name, "seed source empty");
                }
                Err(e) => {
                    warn!(seed = %name, error = %e, "seed source failed");
                }
            }
        }
        (Vec::new(), 0, false)
    }
}
