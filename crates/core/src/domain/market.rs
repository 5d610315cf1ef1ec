use crate::error::{CoreError, CoreResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Crypto,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::Crypto => "crypto",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Daily closes for one symbol, strictly ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> CoreResult<Self> {
        let symbol = symbol.into();
        for (idx, point) in points.iter().enumerate() {
            if !point.price.is_finite() || point.price <= 0.0 {
                return Err(CoreError::DataUnavailable {
                    what: symbol,
                    reason: format!("non-positive price {} on {}", point.price, point.date),
                });
            }
            if idx > 0 && points[idx - 1].date >= point.date {
                return Err(CoreError::DataUnavailable {
                    what: symbol,
                    reason: format!("dates not strictly ascending at {}", point.date),
                });
            }
        }
        Ok(Self { symbol, points })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    /// The last `n` closes, or `InsufficientHistory` when fewer exist.
    pub fn trailing_closes(&self, n: usize) -> CoreResult<Vec<f64>> {
        if self.points.len() < n {
            return Err(CoreError::insufficient(&self.symbol, n, self.points.len()));
        }
        Ok(self.points[self.points.len() - n..]
            .iter()
            .map(|p| p.price)
            .collect())
    }
}

/// Fear/greed reading in 0..=100; 50 is neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct SentimentScore(u8);

impl SentimentScore {
    pub const NEUTRAL: Self = Self(50);

    pub fn new(value: i64) -> CoreResult<Self> {
        if !(0..=100).contains(&value) {
            return Err(CoreError::Validation(format!(
                "sentiment must be within 0..=100 (got {value})"
            )));
        }
        Ok(Self(value as u8))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for SentimentScore {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SentimentScore> for u8 {
    fn from(score: SentimentScore) -> Self {
        score.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SentimentSource {
    Observed,
    /// The fetch failed and the neutral score was substituted.
    Defaulted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub score: SentimentScore,
    pub source: SentimentSource,
}

impl SentimentReading {
    pub fn observed(score: SentimentScore) -> Self {
        Self {
            score,
            source: SentimentSource::Observed,
        }
    }

    pub fn defaulted(reason: impl Into<String>) -> Self {
        Self {
            score: SentimentScore::NEUTRAL,
            source: SentimentSource::Defaulted {
                reason: reason.into(),
            },
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self.source, SentimentSource::Defaulted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetMarket {
    pub prices: PriceSeries,
    pub sentiment: SentimentReading,
}

/// Everything one recommendation cycle reads from the market. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub as_of_date: NaiveDate,
    pub equity: AssetMarket,
    pub crypto: AssetMarket,
    pub volatility_index: PriceSeries,
    /// Units of the crypto quote currency per unit of base currency.
    pub fx_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrentPrices {
    pub equity: f64,
    /// Crypto price in its quote currency.
    pub crypto: f64,
    pub fx_rate: f64,
}

impl MarketSnapshot {
    pub fn asset(&self, asset: AssetClass) -> &AssetMarket {
        match asset {
            AssetClass::Equity => &self.equity,
            AssetClass::Crypto => &self.crypto,
        }
    }

    /// Latest closes. Missing or non-positive prices are fatal.
    pub fn current_prices(&self) -> CoreResult<CurrentPrices> {
        let latest = |asset: AssetClass| -> CoreResult<f64> {
            let series = &self.asset(asset).prices;
            match series.latest() {
                Some(p) if p.price.is_finite() && p.price > 0.0 => Ok(p.price),
                _ => Err(CoreError::PriceUnavailable {
                    asset: series.symbol().to_string(),
                }),
            }
        };

        if !self.fx_rate.is_finite() || self.fx_rate <= 0.0 {
            return Err(CoreError::DataUnavailable {
                what: "fx rate".to_string(),
                reason: format!("fx rate must be positive (got {})", self.fx_rate),
            });
        }

        Ok(CurrentPrices {
            equity: latest(AssetClass::Equity)?,
            crypto: latest(AssetClass::Crypto)?,
            fx_rate: self.fx_rate,
        })
    }
}
