//! Metals price API client.
//!
//! One GET per call against a `timeframe` endpoint (base currency
//! fixed to USD, symbols XAU/XAG). Rate-limit signals (HTTP 429, any
//! 5xx, or an API-reported condition inside a 200 body) go through
//! the retry policy, and every observed backoff ratchets the shared
//! throttle. Any other non-2xx status and malformed JSON fail
//! immediately.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::backoff::{RetryPolicy, RetryState};
use crate::domain::error::AuagError;
use crate::domain::record::PriceRecord;
use crate::domain::series::sort_dedupe;
use crate::domain::throttle::RateLimitContext;
use crate::ports::price_source_port::PriceSource;
use crate::ports::sleep_port::SleepPort;

pub struct MetalsApiSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    policy: RetryPolicy,
    sleeper: Box<dyn SleepPort>,
}

impl MetalsApiSource {
    pub fn new(base_url: String, api_key: String, sleeper: Box<dyn SleepPort>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            policy: RetryPolicy::default(),
            sleeper,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Debug, Deserialize)]
struct TimeframeResponse {
    success: Option<bool>,
    error: Option<ApiError>,
    rates: Option<RatesBody>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<i64>,
    info: Option<String>,
}

/// Multi-day requests come back keyed by date; a single-day request
/// may return the bare rate object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RatesBody {
    ByDate(BTreeMap<String, DayRates>),
    Single(DayRates),
}

#[derive(Debug, Default, Deserialize)]
struct DayRates {
    #[serde(rename = "USDXAU")]
    usd_xau: Option<f64>,
    #[serde(rename = "USDXAG")]
    usd_xag: Option<f64>,
    #[serde(rename = "XAU")]
    xau: Option<f64>,
    #[serde(rename = "XAG")]
    xag: Option<f64>,
}

impl DayRates {
    fn gold(&self) -> Option<f64> {
        derive_price(self.usd_xau, self.xau)
    }

    fn silver(&self) -> Option<f64> {
        derive_price(self.usd_xag, self.xag)
    }
}

/// Prefer the direct USD-per-ounce field; else invert the
/// ounces-per-USD rate. Anything non-finite or non-positive is
/// unusable.
fn derive_price(direct: Option<f64>, per_usd: Option<f64>) -> Option<f64> {
    let price = match direct {
        Some(p) if p.is_finite() && p > 0.0 => p,
        _ => match per_usd {
            Some(r) if r.is_finite() && r > 0.0 => 1.0 / r,
            _ => return None,
        },
    };
    (price.is_finite() && price > 0.0).then_some(price)
}

/// Provider error codes that mean "slow down" rather than "give up".
fn is_rate_limit_body(response: &TimeframeResponse) -> bool {
    if response.success != Some(false) {
        return false;
    }
    let Some(error) = &response.error else {
        return false;
    };
    if matches!(error.code, Some(104) | Some(106) | Some(429)) {
        return true;
    }
    error
        .info
        .as_deref()
        .is_some_and(|info| info.to_lowercase().contains("rate limit"))
}

fn retry_after_header(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn collect_records(rates: RatesBody, request_start: NaiveDate) -> Vec<PriceRecord> {
    let by_date: Vec<(NaiveDate, DayRates)> = match rates {
        RatesBody::ByDate(map) => map
            .into_iter()
            .filter_map(|(key, day)| {
                NaiveDate::parse_from_str(&key, "%Y-%m-%d")
                    .ok()
                    .map(|date| (date, day))
            })
            .collect(),
        RatesBody::Single(day) => vec![(request_start, day)],
    };

    let records = by_date
        .into_iter()
        .filter_map(|(date, day)| {
            let record = PriceRecord {
                date,
                gold: day.gold()?,
                silver: day.silver()?,
            };
            record.is_valid().then_some(record)
        })
        .collect();
    sort_dedupe(records)
}

#[async_trait]
impl PriceSource for MetalsApiSource {
    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        throttle: &RateLimitContext,
    ) -> Result<Vec<PriceRecord>, AuagError> {
        let url = format!("{}/timeframe", self.base_url);
        let start_param = start.format("%Y-%m-%d").to_string();
        let end_param = end.format("%Y-%m-%d").to_string();

        let mut attempt = 1u32;
        loop {
            debug!(%start, %end, attempt, "requesting timeframe");
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("access_key", self.api_key.as_str()),
                    ("start_date", start_param.as_str()),
                    ("end_date", end_param.as_str()),
                    ("base", "USD"),
                    ("symbols", "XAU,XAG"),
                ])
                .send()
                .await
                .map_err(|e| AuagError::Fetch {
                    reason: format!("request for {start}..{end} failed: {e}"),
                })?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let retry_after = retry_after_header(&response);
                attempt = self
                    .back_off(attempt, retry_after, format!("HTTP {status}"), throttle)
                    .await?;
                continue;
            }

            let body = response.text().await.map_err(|e| AuagError::Fetch {
                reason: format!("failed to read response body: {e}"),
            })?;
            if !status.is_success() {
                return Err(AuagError::Fetch {
                    reason: format!("HTTP {status}: {body}"),
                });
            }

            let parsed: TimeframeResponse =
                serde_json::from_str(&body).map_err(|e| AuagError::Fetch {
                    reason: format!("malformed response body: {e}"),
                })?;

            if is_rate_limit_body(&parsed) {
                attempt = self
                    .back_off(attempt, None, "provider rate limit".to_string(), throttle)
                    .await?;
                continue;
            }
            if parsed.success == Some(false) {
                let info = parsed
                    .error
                    .and_then(|e| e.info)
                    .unwrap_or_else(|| "unspecified provider error".to_string());
                return Err(AuagError::Fetch { reason: info });
            }

            let rates = parsed.rates.ok_or_else(|| AuagError::Fetch {
                reason: "response missing rates".to_string(),
            })?;
            return Ok(collect_records(rates, start));
        }
    }
}

impl MetalsApiSource {
    /// Resolve one rate-limit signal: either sleep and hand back the
    /// next attempt number, or fail terminally with the last cause.
    async fn back_off(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        cause: String,
        throttle: &RateLimitContext,
    ) -> Result<u32, AuagError> {
        match self.policy.on_rate_limited(attempt, retry_after) {
            RetryState::Failed { attempts } => Err(AuagError::Fetch {
                reason: format!("giving up after {attempts} attempts: {cause}"),
            }),
            RetryState::BackingOff { next_attempt, delay } => {
                warn!(attempt, delay_ms = delay.as_millis() as u64, %cause, "rate limited, backing off");
                throttle.record_backoff(delay);
                self.sleeper.sleep(delay).await;
                Ok(next_attempt)
            }
        }
    }
}
