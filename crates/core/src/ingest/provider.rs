use crate::config::Settings;
use crate::domain::market::{AssetClass, PriceSeries, SentimentScore};
use crate::ingest::types::{FxRateResponse, PriceSeriesResponse, SentimentResponse};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SENTIMENT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRIES: u32 = 3;
const MAX_RETRIES: u32 = 10;
const MAX_BACKOFF_EXPONENT: u32 = 5;

/// Market data consumed by one recommendation cycle.
///
/// Implementations own their timeouts and retry policy. Failures are plain `anyhow` errors;
/// the pipeline decides which of them are fatal.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// The latest `lookback` daily closes, ascending by date. Shorter histories are an error.
    async fn get_price_series(&self, symbol: &str, lookback: usize) -> Result<PriceSeries>;

    async fn get_sentiment(&self, asset: AssetClass) -> Result<SentimentScore>;

    /// Units of `quote` per unit of `base`.
    async fn get_fx_rate(&self, base: &str, quote: &str) -> Result<f64>;
}

#[derive(Debug, Clone)]
pub struct HttpJsonDataProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    sentiment_timeout: Duration,
    retries: u32,
}

impl HttpJsonDataProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_data_provider_base_url()?.to_string();
        let api_key = settings.data_provider_api_key.clone();

        let timeout_secs = env_parse("DATA_PROVIDER_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);
        let sentiment_timeout_secs = env_parse("DATA_PROVIDER_SENTIMENT_TIMEOUT_SECS")
            .unwrap_or(DEFAULT_SENTIMENT_TIMEOUT_SECS);
        let retries = env_parse("DATA_PROVIDER_RETRIES").unwrap_or(DEFAULT_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build data provider http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            sentiment_timeout: Duration::from_secs(sentiment_timeout_secs),
            retries: retries.clamp(1, MAX_RETRIES),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn fetch_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> Result<T> {
        let mut req = self
            .http
            .get(self.url(path))
            .headers(self.headers()?)
            .query(query);
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }

        let res = req.send().await.context("data provider request failed")?;
        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read provider response")?;

        if !status.is_success() {
            anyhow::bail!("data provider HTTP {status} for {path}: {text}");
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("provider response for {path} has unexpected shape: {text}"))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(path, query, timeout).await {
                Ok(parsed) => return Ok(parsed),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = backoff_after(attempt);
                    tracing::warn!(attempt, path, ?backoff, error = %err, "data provider fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for HttpJsonDataProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn get_price_series(&self, symbol: &str, lookback: usize) -> Result<PriceSeries> {
        let resp: PriceSeriesResponse = self
            .fetch(
                "/v1/prices",
                &[("symbol", symbol.to_string()), ("lookback", lookback.to_string())],
                None,
            )
            .await?;
        validate_price_response(resp, symbol, lookback)
    }

    async fn get_sentiment(&self, asset: AssetClass) -> Result<SentimentScore> {
        let path = format!("/v1/sentiment/{}", asset.as_str());
        let resp: SentimentResponse = self
            .fetch(&path, &[], Some(self.sentiment_timeout))
            .await?;
        validate_sentiment_response(resp, asset)
    }

    async fn get_fx_rate(&self, base: &str, quote: &str) -> Result<f64> {
        let resp: FxRateResponse = self
            .fetch(
                "/v1/fx",
                &[("base", base.to_string()), ("quote", quote.to_string())],
                None,
            )
            .await?;
        validate_fx_response(&resp, base, quote)
    }
}

/// 1s, 2s, 4s, ... capped at 32s.
fn backoff_after(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    Duration::from_secs(1u64 << exponent)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

fn validate_price_response(
    resp: PriceSeriesResponse,
    symbol: &str,
    lookback: usize,
) -> Result<PriceSeries> {
    anyhow::ensure!(
        resp.symbol == symbol,
        "provider symbol mismatch: expected {symbol}, got {}",
        resp.symbol
    );
    anyhow::ensure!(
        resp.points.len() >= lookback,
        "history for {symbol} too short: expected {lookback} points, got {}",
        resp.points.len()
    );

    let mut resp = resp;
    let excess = resp.points.len() - lookback;
    resp.points.drain(..excess);
    Ok(resp.into_series()?)
}

fn validate_sentiment_response(resp: SentimentResponse, asset: AssetClass) -> Result<SentimentScore> {
    anyhow::ensure!(
        resp.asset == asset.as_str(),
        "provider asset mismatch: expected {asset}, got {}",
        resp.asset
    );
    Ok(SentimentScore::new(resp.score)?)
}

fn validate_fx_response(resp: &FxRateResponse, base: &str, quote: &str) -> Result<f64> {
    anyhow::ensure!(
        resp.base == base && resp.quote == quote,
        "provider fx pair mismatch: expected {base}/{quote}, got {}/{}",
        resp.base,
        resp.quote
    );
    anyhow::ensure!(
        resp.rate.is_finite() && resp.rate > 0.0,
        "fx rate must be positive (got {})",
        resp.rate
    );
    Ok(resp.rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use serde_json::json;

    fn price_json(symbol: &str, n: usize) -> serde_json::Value {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let points: Vec<_> = (0..n)
            .map(|i| {
                json!({
                    "date": start + ChronoDuration::days(i as i64),
                    "price": 100.0 + i as f64,
                })
            })
            .collect();
        json!({ "symbol": symbol, "points": points })
    }

    #[test]
    fn parses_price_series_and_keeps_latest_lookback() {
        let resp: PriceSeriesResponse = serde_json::from_value(price_json("IWDA.AS", 10)).unwrap();
        let series = validate_price_response(resp, "IWDA.AS", 4).unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.closes(), vec![106.0, 107.0, 108.0, 109.0]);
    }

    #[test]
    fn rejects_short_history() {
        let resp: PriceSeriesResponse = serde_json::from_value(price_json("IWDA.AS", 3)).unwrap();
        assert!(validate_price_response(resp, "IWDA.AS", 4).is_err());
    }

    #[test]
    fn rejects_symbol_mismatch() {
        let resp: PriceSeriesResponse = serde_json::from_value(price_json("SPY", 5)).unwrap();
        assert!(validate_price_response(resp, "IWDA.AS", 5).is_err());
    }

    #[test]
    fn rejects_non_positive_prices() {
        let v = json!({
            "symbol": "BTC-USD",
            "points": [
                {"date": "2025-01-01", "price": 100.0},
                {"date": "2025-01-02", "price": 0.0}
            ]
        });
        let resp: PriceSeriesResponse = serde_json::from_value(v).unwrap();
        assert!(validate_price_response(resp, "BTC-USD", 2).is_err());
    }

    #[test]
    fn rejects_non_numeric_price_via_deserialize() {
        let v = json!({
            "symbol": "BTC-USD",
            "points": [{"date": "2025-01-01", "price": "100.0"}]
        });
        assert!(serde_json::from_value::<PriceSeriesResponse>(v).is_err());
    }

    #[test]
    fn sentiment_must_be_in_range() {
        let ok: SentimentResponse =
            serde_json::from_value(json!({"asset": "crypto", "score": 23})).unwrap();
        assert_eq!(
            validate_sentiment_response(ok, AssetClass::Crypto).unwrap().value(),
            23
        );

        let bad: SentimentResponse =
            serde_json::from_value(json!({"asset": "crypto", "score": 140})).unwrap();
        assert!(validate_sentiment_response(bad, AssetClass::Crypto).is_err());

        let wrong_asset: SentimentResponse =
            serde_json::from_value(json!({"asset": "equity", "score": 40})).unwrap();
        assert!(validate_sentiment_response(wrong_asset, AssetClass::Crypto).is_err());
    }

    #[test]
    fn fx_rate_must_be_positive_and_match_pair() {
        let ok = FxRateResponse {
            base: "EUR".into(),
            quote: "USD".into(),
            rate: 1.08,
        };
        assert_eq!(validate_fx_response(&ok, "EUR", "USD").unwrap(), 1.08);
        assert!(validate_fx_response(&ok, "USD", "EUR").is_err());

        let zero = FxRateResponse { rate: 0.0, ..ok };
        assert!(validate_fx_response(&zero, "EUR", "USD").is_err());
    }

    #[test]
    fn backoff_doubles_then_saturates() {
        assert_eq!(backoff_after(1), Duration::from_secs(1));
        assert_eq!(backoff_after(2), Duration::from_secs(2));
        assert_eq!(backoff_after(4), Duration::from_secs(8));
        assert_eq!(backoff_after(6), Duration::from_secs(32));
        assert_eq!(backoff_after(65), Duration::from_secs(32));
        assert_eq!(backoff_after(u32::MAX), Duration::from_secs(32));
    }

    #[test]
    fn url_joins_without_double_slashes() {
        let p = HttpJsonDataProvider {
            http: reqwest::Client::new(),
            base_url: "https://data.example.com/".into(),
            api_key: None,
            sentiment_timeout: Duration::from_secs(1),
            retries: 1,
        };
        assert_eq!(p.url("/v1/fx"), "https://data.example.com/v1/fx");
        assert_eq!(p.url("v1/fx"), "https://data.example.com/v1/fx");
    }
}
