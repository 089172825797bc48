#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use auag::domain::error::AuagError;
use auag::domain::record::PriceRecord;
use auag::domain::throttle::RateLimitContext;
use auag::ports::cache_port::CachePort;
use auag::ports::price_source_port::PriceSource;
use auag::ports::sleep_port::SleepPort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn record(d: NaiveDate, gold: f64, silver: f64) -> PriceRecord {
    PriceRecord { date: d, gold, silver }
}

/// In-memory cache sharing its blobs with the test through an `Arc`.
#[derive(Clone)]
pub struct MemoryCache {
    pub blobs: Arc<Mutex<HashMap<String, String>>>,
    pub fail_writes: bool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(Mutex::new(HashMap::new())),
            fail_writes: false,
        }
    }
}

impl CachePort for MemoryCache {
    fn read(&self, key: &str) -> Result<Option<String>, AuagError> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), AuagError> {
        if self.fail_writes {
            return Err(AuagError::Cache {
                reason: "quota exceeded".into(),
            });
        }
        self.blobs.lock().unwrap().insert(key.into(), value.into());
        Ok(())
    }
}

/// Sleeper that records requested delays instead of waiting.
pub struct RecordingSleeper {
    pub delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> (Self, Arc<Mutex<Vec<Duration>>>) {
        let delays = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                delays: Arc::clone(&delays),
            },
            delays,
        )
    }
}

#[async_trait]
impl SleepPort for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

pub enum ScriptedReply {
    Records(Vec<PriceRecord>),
    Fail(String),
}

/// Price source that replays a script and logs the requested ranges.
/// An optional hook runs on every fetch, letting tests supersede an
/// assembly mid-flight.
pub struct ScriptedSource {
    replies: Mutex<VecDeque<ScriptedReply>>,
    pub calls: Arc<Mutex<Vec<(NaiveDate, NaiveDate)>>>,
    on_fetch: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ScriptedSource {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
            on_fetch: None,
        }
    }

    pub fn with_hook(mut self, hook: Box<dyn Fn() + Send + Sync>) -> Self {
        self.on_fetch = Some(hook);
        self
    }

    pub fn ranges(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        _throttle: &RateLimitContext,
    ) -> Result<Vec<PriceRecord>, AuagError> {
        self.calls.lock().unwrap().push((start, end));
        if let Some(hook) = &self.on_fetch {
            hook();
        }
        match self.replies.lock().unwrap().pop_front() {
            Some(ScriptedReply::Records(records)) => Ok(records),
            Some(ScriptedReply::Fail(reason)) => Err(AuagError::Fetch { reason }),
            None => Ok(Vec::new()),
        }
    }
}
