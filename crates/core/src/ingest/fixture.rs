//! Deterministic in-process market used by `--fixture` runs and tests.

use crate::domain::market::{AssetClass, PricePoint, PriceSeries, SentimentScore};
use crate::ingest::provider::MarketDataProvider;
use crate::strategy::AssetSymbols;
use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone)]
pub struct FixtureDataProvider {
    symbols: AssetSymbols,
    end_date: NaiveDate,
    /// `None` makes the sentiment fetch fail.
    equity_sentiment: Option<u8>,
    crypto_sentiment: Option<u8>,
    volatility_level: f64,
    equity_level: f64,
    crypto_level: f64,
    fx_rate: f64,
    missing_symbol: Option<String>,
}

impl FixtureDataProvider {
    pub fn new(symbols: AssetSymbols, end_date: NaiveDate) -> Self {
        Self {
            symbols,
            end_date,
            equity_sentiment: Some(50),
            crypto_sentiment: Some(50),
            volatility_level: 18.0,
            equity_level: 85.0,
            crypto_level: 60_000.0,
            fx_rate: 1.08,
            missing_symbol: None,
        }
    }

    pub fn with_sentiment(mut self, equity: Option<u8>, crypto: Option<u8>) -> Self {
        self.equity_sentiment = equity;
        self.crypto_sentiment = crypto;
        self
    }

    pub fn with_volatility_level(mut self, level: f64) -> Self {
        self.volatility_level = level;
        self
    }

    pub fn with_fx_rate(mut self, rate: f64) -> Self {
        self.fx_rate = rate;
        self
    }

    /// Makes price fetches for `symbol` fail.
    pub fn without_prices_for(mut self, symbol: impl Into<String>) -> Self {
        self.missing_symbol = Some(symbol.into());
        self
    }

    fn path(&self, level: f64, drift: f64, amplitude: f64, period: f64, lookback: usize) -> Vec<f64> {
        // Ends exactly at `level`; oscillates around a gentle drift before that.
        (0..lookback)
            .map(|i| {
                let back = (lookback - 1 - i) as f64;
                level * (-drift * back).exp() * (1.0 + amplitude * (back / period).sin())
            })
            .collect()
    }

    fn series(&self, symbol: &str, values: Vec<f64>) -> Result<PriceSeries> {
        let n = values.len() as i64;
        let points = values
            .into_iter()
            .enumerate()
            .map(|(i, price)| PricePoint {
                date: self.end_date - Duration::days(n - 1 - i as i64),
                price,
            })
            .collect();
        Ok(PriceSeries::new(symbol, points)?)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for FixtureDataProvider {
    fn provider_name(&self) -> &'static str {
        "fixture"
    }

    async fn get_price_series(&self, symbol: &str, lookback: usize) -> Result<PriceSeries> {
        if self.missing_symbol.as_deref() == Some(symbol) {
            bail!("fixture has no prices for {symbol}");
        }

        let values = if symbol == self.symbols.equity {
            self.path(self.equity_level, 0.0003, 0.02, 9.0, lookback)
        } else if symbol == self.symbols.crypto {
            self.path(self.crypto_level, 0.001, 0.06, 5.0, lookback)
        } else if symbol == self.symbols.volatility_index {
            self.path(self.volatility_level, 0.0, 0.15, 13.0, lookback)
        } else {
            bail!("fixture does not know symbol {symbol}");
        };
        self.series(symbol, values)
    }

    async fn get_sentiment(&self, asset: AssetClass) -> Result<SentimentScore> {
        let value = match asset {
            AssetClass::Equity => self.equity_sentiment,
            AssetClass::Crypto => self.crypto_sentiment,
        };
        match value {
            Some(v) => Ok(SentimentScore::new(v.into())?),
            None => bail!("fixture sentiment feed for {asset} is down"),
        }
    }

    async fn get_fx_rate(&self, base: &str, quote: &str) -> Result<f64> {
        if base == quote {
            return Ok(1.0);
        }
        Ok(self.fx_rate)
    }
}
