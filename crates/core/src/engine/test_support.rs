use crate::domain::market::{
    AssetMarket, MarketSnapshot, PricePoint, PriceSeries, SentimentReading, SentimentScore,
};
use chrono::{Duration, NaiveDate};

pub fn series(symbol: &str, prices: &[f64]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let points = prices
        .iter()
        .enumerate()
        .map(|(i, &price)| PricePoint {
            date: start + Duration::days(i as i64),
            price,
        })
        .collect();
    PriceSeries::new(symbol, points).unwrap()
}

/// Flat history ending at `last`.
pub fn flat_then(len: usize, level: f64, last: f64) -> Vec<f64> {
    let mut out = vec![level; len - 1];
    out.push(last);
    out
}

/// Alternating +/- moves so the return series has a non-zero spread.
pub fn zigzag(len: usize, level: f64, amplitude: f64) -> Vec<f64> {
    (0..len)
        .map(|i| if i % 2 == 0 { level } else { level * (1.0 + amplitude) })
        .collect()
}

pub struct SnapshotBuilder {
    pub equity: Vec<f64>,
    pub crypto: Vec<f64>,
    pub vix: Vec<f64>,
    pub equity_sentiment: u8,
    pub crypto_sentiment: u8,
    pub fx_rate: f64,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self {
            equity: zigzag(300, 50.0, 0.01),
            crypto: zigzag(300, 40_000.0, 0.03),
            vix: flat_then(300, 18.0, 18.0),
            equity_sentiment: 50,
            crypto_sentiment: 50,
            fx_rate: 1.0,
        }
    }
}

impl SnapshotBuilder {
    pub fn build(self) -> MarketSnapshot {
        let reading = |v: u8| SentimentReading::observed(SentimentScore::new(v as i64).unwrap());
        MarketSnapshot {
            as_of_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            equity: AssetMarket {
                prices: series("IWDA.AS", &self.equity),
                sentiment: reading(self.equity_sentiment),
            },
            crypto: AssetMarket {
                prices: series("BTC-USD", &self.crypto),
                sentiment: reading(self.crypto_sentiment),
            },
            volatility_index: series("^VIX", &self.vix),
            fx_rate: self.fx_rate,
        }
    }
}
