//! Sentiment/volatility regime assessment.

use crate::domain::market::{MarketSnapshot, PriceSeries, SentimentScore};
use crate::domain::recommendation::RegimeAssessment;
use crate::engine::stats;
use crate::error::CoreResult;
use crate::strategy::StrategyConfig;

const SENTIMENT_CENTER: f64 = 50.0;
const SENTIMENT_SCALE: f64 = 25.0;

pub fn sentiment_z(score: SentimentScore) -> f64 {
    (f64::from(score.value()) - SENTIMENT_CENTER) / SENTIMENT_SCALE
}

/// Latest close relative to its trailing moving average, in percent.
pub fn price_vs_moving_average(series: &PriceSeries, window: usize) -> CoreResult<f64> {
    let closes = series.trailing_closes(window)?;
    let ma = stats::mean(&closes).unwrap_or(0.0);
    let last = closes.last().copied().unwrap_or(0.0);
    if ma <= 0.0 {
        return Ok(0.0);
    }
    Ok((last / ma - 1.0) * 100.0)
}

/// Latest volatility-index level and its z-score against the trailing window.
pub fn volatility_index_z(series: &PriceSeries, window: usize) -> CoreResult<(f64, f64)> {
    let values = series.trailing_closes(window)?;
    let level = values.last().copied().unwrap_or(0.0);
    Ok((level, stats::z_score(level, &values)))
}

pub fn classify(snapshot: &MarketSnapshot, config: &StrategyConfig) -> CoreResult<RegimeAssessment> {
    let windows = &config.windows;

    let equity_sentiment = snapshot.equity.sentiment.score;
    let crypto_sentiment = snapshot.crypto.sentiment.score;
    let equity_sentiment_z = sentiment_z(equity_sentiment);
    let crypto_sentiment_z = sentiment_z(crypto_sentiment);

    let (volatility_index_level, volatility_index_z) =
        volatility_index_z(&snapshot.volatility_index, windows.volatility_index_zscore)?;

    let equity_vs_ma_pct = price_vs_moving_average(&snapshot.equity.prices, windows.moving_average)?;
    let crypto_vs_ma_pct = price_vs_moving_average(&snapshot.crypto.prices, windows.moving_average)?;

    // Fear (negative sentiment z) raises the score, as does an elevated volatility index.
    let composite_score = (-equity_sentiment_z - crypto_sentiment_z + volatility_index_z) / 3.0;

    Ok(RegimeAssessment {
        composite_score,
        equity_sentiment,
        crypto_sentiment,
        equity_sentiment_z,
        crypto_sentiment_z,
        volatility_index_level,
        volatility_index_z,
        equity_vs_ma_pct,
        crypto_vs_ma_pct,
    })
}
