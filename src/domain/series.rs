//! Canonical series algebra: ordering, merging, range queries and gap
//! detection over daily price records.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use super::record::PriceRecord;

/// A maximal contiguous run of dates absent from the series, inclusive
/// on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Sort ascending by date and collapse duplicates; the later element
/// of the input wins for a given date.
pub fn sort_dedupe(records: Vec<PriceRecord>) -> Vec<PriceRecord> {
    let mut by_date: BTreeMap<NaiveDate, PriceRecord> = BTreeMap::new();
    for record in records {
        by_date.insert(record.date, record);
    }
    by_date.into_values().collect()
}

/// Per-date union of two series; `b` wins where both hold a date.
pub fn merge(a: &[PriceRecord], b: &[PriceRecord]) -> Vec<PriceRecord> {
    let mut by_date: BTreeMap<NaiveDate, PriceRecord> = BTreeMap::new();
    for record in a.iter().chain(b.iter()) {
        by_date.insert(record.date, *record);
    }
    by_date.into_values().collect()
}

/// Records whose date falls within `[start, end]`.
pub fn slice_range(records: &[PriceRecord], start: NaiveDate, end: NaiveDate) -> Vec<PriceRecord> {
    records
        .iter()
        .filter(|r| r.date >= start && r.date <= end)
        .copied()
        .collect()
}

/// Maximal contiguous missing runs within `[start, end]`.
pub fn missing_gaps(records: &[PriceRecord], start: NaiveDate, end: NaiveDate) -> Vec<Gap> {
    let present: std::collections::BTreeSet<NaiveDate> =
        records.iter().map(|r| r.date).collect();

    let mut gaps = Vec::new();
    let mut open: Option<Gap> = None;

    let mut day = start;
    while day <= end {
        if present.contains(&day) {
            if let Some(gap) = open.take() {
                gaps.push(gap);
            }
        } else {
            match &mut open {
                Some(gap) => gap.end = day,
                None => open = Some(Gap { start: day, end: day }),
            }
        }
        day += Duration::days(1);
    }
    if let Some(gap) = open {
        gaps.push(gap);
    }
    gaps
}

/// Split an inclusive date range into sequential sub-ranges of at most
/// `max_days` days each.
pub fn split_chunks(start: NaiveDate, end: NaiveDate, max_days: i64) -> Vec<(NaiveDate, NaiveDate)> {
    let mut chunks = Vec::new();
    let mut chunk_start = start;
    while chunk_start <= end {
        let chunk_end = (chunk_start + Duration::days(max_days - 1)).min(end);
        chunks.push((chunk_start, chunk_end));
        chunk_start = chunk_end + Duration::days(1);
    }
    chunks
}
