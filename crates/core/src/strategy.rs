//! Versioned strategy table.
//!
//! Every threshold, multiplier and window the allocation core uses lives here. The value is
//! loaded once per process and handed to each computation by shared reference; nothing in the
//! core mutates it.

use crate::domain::recommendation::MarketRegime;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

pub const STRATEGY_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub version: u32,
    pub assets: AssetSymbols,
    pub monthly_target: f64,
    pub amount_bounds: AmountBounds,
    pub equity_weight: f64,
    pub crypto_weight: f64,
    /// Crypto regime bands, ascending by `max_sentiment`.
    pub regime_bands: Vec<RegimeBand>,
    pub equity_signals: EquitySignalConfig,
    pub windows: WindowConfig,
    pub risk: RiskConfig,
    pub zones: ZoneConfig,
    pub forecast: ForecastConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSymbols {
    pub equity: String,
    pub crypto: String,
    pub volatility_index: String,
    /// Currency the monthly amount and the equity price are denominated in.
    pub base_currency: String,
    /// Currency the crypto price is quoted in.
    pub crypto_quote_currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountBounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeBand {
    pub regime: MarketRegime,
    /// Inclusive upper bound of crypto sentiment for this band.
    pub max_sentiment: u8,
    pub multiplier: f64,
    /// Ceiling on the crypto target, in base currency.
    pub cap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySignalConfig {
    /// Equity sentiment at or below this counts as a fear signal.
    pub fear_sentiment_max: u8,
    /// Volatility index strictly above this counts as a fear signal.
    pub high_volatility_index: f64,
    /// Price-vs-MA (percent) strictly below this counts as a fear signal.
    pub below_ma_pct: f64,
    pub min_signals_for_opportunity: usize,
    /// Equity sentiment strictly above this triggers the caution branch.
    pub greed_sentiment_min: u8,
    pub opportunity_multiplier: f64,
    pub caution_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub moving_average: usize,
    pub volatility_index_zscore: usize,
    /// Trailing daily returns behind annualized return and volatility.
    pub volatility_returns: usize,
    pub var_returns: usize,
    pub trading_days_per_year: usize,
    /// Samples requested from the data provider per series.
    pub lookback: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub max_kelly_fraction: f64,
    pub var_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderSizing {
    /// Every order gets `100 / chunks` percent; the remainder is reported as unallocated.
    Literal,
    /// Sizes are rescaled so the emitted orders always sum to 100 percent.
    Normalized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub equity_step: f64,
    pub crypto_step: f64,
    pub crypto_fear_chunks: u32,
    pub crypto_default_chunks: u32,
    pub equity_fear_chunks: u32,
    pub equity_default_chunks: u32,
    pub sizing: LadderSizing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub equity_expected_return: f64,
    pub crypto_expected_return: f64,
    pub correlation: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            version: STRATEGY_VERSION,
            assets: AssetSymbols::default(),
            monthly_target: 1500.0,
            amount_bounds: AmountBounds::default(),
            equity_weight: 0.67,
            crypto_weight: 0.33,
            regime_bands: default_regime_bands(),
            equity_signals: EquitySignalConfig::default(),
            windows: WindowConfig::default(),
            risk: RiskConfig::default(),
            zones: ZoneConfig::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl Default for AssetSymbols {
    fn default() -> Self {
        Self {
            equity: "IWDA.AS".to_string(),
            crypto: "BTC-USD".to_string(),
            volatility_index: "^VIX".to_string(),
            base_currency: "EUR".to_string(),
            crypto_quote_currency: "USD".to_string(),
        }
    }
}

impl Default for AmountBounds {
    fn default() -> Self {
        Self {
            min: 100.0,
            max: 10_000.0,
        }
    }
}

impl Default for EquitySignalConfig {
    fn default() -> Self {
        Self {
            fear_sentiment_max: 35,
            high_volatility_index: 25.0,
            below_ma_pct: -5.0,
            min_signals_for_opportunity: 2,
            greed_sentiment_min: 65,
            opportunity_multiplier: 1.2,
            caution_multiplier: 0.8,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            moving_average: 200,
            volatility_index_zscore: 252,
            volatility_returns: 252,
            var_returns: 252,
            trading_days_per_year: 252,
            lookback: 400,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_kelly_fraction: 0.25,
            var_confidence: 0.95,
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            equity_step: 0.01,
            crypto_step: 0.03,
            crypto_fear_chunks: 4,
            crypto_default_chunks: 2,
            equity_fear_chunks: 3,
            equity_default_chunks: 2,
            sizing: LadderSizing::Literal,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            equity_expected_return: 0.08,
            crypto_expected_return: 0.15,
            correlation: 0.3,
        }
    }
}

fn default_regime_bands() -> Vec<RegimeBand> {
    let band = |regime, max_sentiment, multiplier, cap| RegimeBand {
        regime,
        max_sentiment,
        multiplier,
        cap,
    };
    vec![
        band(MarketRegime::ExtremeFear, 20, 2.5, 1000.0),
        band(MarketRegime::Fear, 35, 1.8, 750.0),
        band(MarketRegime::Neutral, 64, 1.0, 500.0),
        band(MarketRegime::Greed, 79, 0.4, 300.0),
        band(MarketRegime::ExtremeGreed, 100, 0.2, 200.0),
    ]
}

impl StrategyConfig {
    /// Reads a JSON strategy table. Missing keys fall back to the defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read strategy config {path}"))?;
        let config = serde_json::from_str::<Self>(&text)
            .with_context(|| format!("strategy config {path} is not valid JSON"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.amount_bounds.min > 0.0 && self.amount_bounds.min <= self.amount_bounds.max,
            "amount bounds must satisfy 0 < min <= max"
        );
        ensure!(
            self.equity_weight >= 0.0 && self.crypto_weight >= 0.0,
            "weights must be non-negative"
        );
        ensure!(
            ((self.equity_weight + self.crypto_weight) - 1.0).abs() < 1e-9,
            "equity_weight + crypto_weight must equal 1 (got {})",
            self.equity_weight + self.crypto_weight
        );

        ensure!(!self.regime_bands.is_empty(), "regime_bands must be non-empty");
        let mut prev: Option<u8> = None;
        for band in &self.regime_bands {
            if let Some(p) = prev {
                ensure!(
                    band.max_sentiment > p,
                    "regime bands must be strictly ascending (got {} after {p})",
                    band.max_sentiment
                );
            }
            ensure!(
                band.multiplier >= 0.0 && band.cap >= 0.0,
                "regime band {:?} has a negative multiplier or cap",
                band.regime
            );
            prev = Some(band.max_sentiment);
        }
        ensure!(
            prev == Some(100),
            "last regime band must end at sentiment 100"
        );

        let w = &self.windows;
        ensure!(
            w.moving_average >= 1 && w.volatility_index_zscore >= 2
                && w.volatility_returns >= 2
                && w.var_returns >= 1,
            "rolling windows must be positive"
        );
        let needed = w
            .moving_average
            .max(w.volatility_index_zscore)
            .max(w.volatility_returns + 1)
            .max(w.var_returns + 1);
        ensure!(
            w.lookback >= needed,
            "lookback {} is shorter than the longest window ({needed})",
            w.lookback
        );

        ensure!(
            self.risk.max_kelly_fraction >= 0.0,
            "max_kelly_fraction must be non-negative"
        );
        ensure!(
            self.risk.var_confidence > 0.0 && self.risk.var_confidence < 1.0,
            "var_confidence must be in (0, 1)"
        );

        let z = &self.zones;
        ensure!(
            z.crypto_fear_chunks > 0
                && z.crypto_default_chunks > 0
                && z.equity_fear_chunks > 0
                && z.equity_default_chunks > 0,
            "chunk counts must be positive"
        );
        ensure!(
            z.equity_step > 0.0 && z.equity_step < 0.5 && z.crypto_step > 0.0 && z.crypto_step < 0.5,
            "zone steps must be in (0, 0.5)"
        );
        ensure!(
            (-1.0..=1.0).contains(&self.forecast.correlation),
            "correlation must be within [-1, 1]"
        );

        Ok(())
    }

    /// Band for a crypto sentiment score. A validated table matches every score in 0..=100.
    pub fn band_for(&self, crypto_sentiment: u8) -> Option<&RegimeBand> {
        self.regime_bands
            .iter()
            .find(|band| crypto_sentiment <= band.max_sentiment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_valid() {
        StrategyConfig::default().validate().unwrap();
    }

    #[test]
    fn bands_are_contiguous_over_full_sentiment_range() {
        let config = StrategyConfig::default();
        let mut seen = Vec::new();
        for score in 0..=100u8 {
            let band = config.band_for(score).unwrap();
            if seen.last() != Some(&band.regime) {
                seen.push(band.regime);
            }
        }
        assert_eq!(
            seen,
            vec![
                MarketRegime::ExtremeFear,
                MarketRegime::Fear,
                MarketRegime::Neutral,
                MarketRegime::Greed,
                MarketRegime::ExtremeGreed,
            ]
        );
    }

    #[test]
    fn band_edges_match_table() {
        let config = StrategyConfig::default();
        assert_eq!(config.band_for(20).unwrap().regime, MarketRegime::ExtremeFear);
        assert_eq!(config.band_for(21).unwrap().regime, MarketRegime::Fear);
        assert_eq!(config.band_for(35).unwrap().regime, MarketRegime::Fear);
        assert_eq!(config.band_for(36).unwrap().regime, MarketRegime::Neutral);
        assert_eq!(config.band_for(64).unwrap().regime, MarketRegime::Neutral);
        assert_eq!(config.band_for(65).unwrap().regime, MarketRegime::Greed);
        assert_eq!(config.band_for(79).unwrap().regime, MarketRegime::Greed);
        assert_eq!(config.band_for(80).unwrap().regime, MarketRegime::ExtremeGreed);
    }

    #[test]
    fn rejects_gap_at_top_of_range() {
        let mut config = StrategyConfig::default();
        config.regime_bands.last_mut().unwrap().max_sentiment = 99;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unordered_bands() {
        let mut config = StrategyConfig::default();
        config.regime_bands.swap(0, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut config = StrategyConfig::default();
        config.crypto_weight = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_lookback_shorter_than_volatility_window() {
        let mut config = StrategyConfig::default();
        config.windows.volatility_returns = 400;
        assert!(config.validate().is_err());
        config.windows.lookback = 401;
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_override_keeps_defaults() {
        let v = json!({
            "monthly_target": 2000.0,
            "zones": {
                "equity_step": 0.02,
                "crypto_step": 0.03,
                "crypto_fear_chunks": 4,
                "crypto_default_chunks": 2,
                "equity_fear_chunks": 3,
                "equity_default_chunks": 2,
                "sizing": "normalized"
            }
        });
        let config: StrategyConfig = serde_json::from_value(v).unwrap();
        config.validate().unwrap();
        assert_eq!(config.monthly_target, 2000.0);
        assert_eq!(config.zones.sizing, LadderSizing::Normalized);
        assert_eq!(config.regime_bands.len(), 5);
        assert_eq!(config.risk.max_kelly_fraction, 0.25);
    }
}
