use crate::domain::market::{SentimentReading, SentimentScore};
use crate::strategy::LadderSizing;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Discrete crypto regime, keyed on crypto sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketRegime {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl MarketRegime {
    pub fn is_fear(&self) -> bool {
        matches!(self, Self::ExtremeFear | Self::Fear)
    }

    pub fn is_greed(&self) -> bool {
        matches!(self, Self::Greed | Self::ExtremeGreed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ExtremeFear => "EXTREME_FEAR",
            Self::Fear => "FEAR",
            Self::Neutral => "NEUTRAL",
            Self::Greed => "GREED",
            Self::ExtremeGreed => "EXTREME_GREED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeAssessment {
    /// Buy-signal strength: fear and elevated volatility push it up.
    pub composite_score: f64,
    pub equity_sentiment: SentimentScore,
    pub crypto_sentiment: SentimentScore,
    pub equity_sentiment_z: f64,
    pub crypto_sentiment_z: f64,
    pub volatility_index_level: f64,
    pub volatility_index_z: f64,
    /// Percent distance of the latest close from its moving average.
    pub equity_vs_ma_pct: f64,
    pub crypto_vs_ma_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRisk {
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe: f64,
    pub kelly_fraction: f64,
    /// Daily return at the configured lower percentile (negative = loss).
    pub value_at_risk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub equity: AssetRisk,
    pub crypto: AssetRisk,
    pub var_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquitySignal {
    /// Enough fear signals fired; buy more.
    Opportunity,
    /// Equity sentiment is greedy; buy less.
    Caution,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquitySignals {
    pub low_sentiment: bool,
    pub high_volatility: bool,
    pub below_moving_average: bool,
}

impl EquitySignals {
    pub fn count(&self) -> usize {
        [self.low_sentiment, self.high_volatility, self.below_moving_average]
            .iter()
            .filter(|&&fired| fired)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityAllocation {
    pub symbol: String,
    pub price: f64,
    pub multiplier: f64,
    pub target_amount: f64,
    pub shares: u64,
    /// `shares * price`; never above `target_amount`.
    pub amount: f64,
    /// Part of the target left uninvested by whole-share rounding.
    pub leftover: f64,
    pub kelly_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoAllocation {
    pub symbol: String,
    /// Price in its quote currency.
    pub price: f64,
    pub price_in_base: f64,
    pub multiplier: f64,
    pub cap: f64,
    pub uncapped_target: f64,
    pub target_amount: f64,
    pub capped: bool,
    pub units: f64,
    pub kelly_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub regime: MarketRegime,
    pub equity_signal: EquitySignal,
    pub equity_signals: EquitySignals,
    pub bearish_signal_count: usize,
    /// Set when the equity fear signals reached the opportunity threshold.
    pub equity_fear: bool,
    pub crypto_fear: bool,
    pub crypto_greed: bool,
    pub equity: EquityAllocation,
    pub crypto: CryptoAllocation,
    pub total_investment: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub price: f64,
    pub size_pct: f64,
    pub order_type: OrderType,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceZones {
    pub support_1: f64,
    pub support_2: f64,
    pub resistance_1: f64,
    pub resistance_2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLadder {
    pub symbol: String,
    pub currency: String,
    pub current_price: f64,
    pub zones: PriceZones,
    pub chunks: u32,
    pub sizing: LadderSizing,
    pub orders: Vec<OrderSpec>,
    /// `100 - sum(size_pct)`; negative when the orders over-commit.
    pub unallocated_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLadders {
    pub equity: OrderLadder,
    pub crypto: OrderLadder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioForecast {
    pub equity_weight: f64,
    pub crypto_weight: f64,
    pub expected_return: f64,
    pub risk: f64,
    pub sharpe: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub generated_at: DateTime<Utc>,
    pub as_of_date: NaiveDate,
    pub strategy_version: u32,
    pub monthly_amount: f64,
    pub base_currency: String,
    pub equity_sentiment: SentimentReading,
    pub crypto_sentiment: SentimentReading,
    pub assessment: RegimeAssessment,
    pub risk: RiskProfile,
    pub plan: AllocationPlan,
    pub ladders: OrderLadders,
    pub forecast: PortfolioForecast,
}
