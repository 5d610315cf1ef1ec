//! Per-asset volatility, bounded Kelly sizing and historical VaR.

use crate::domain::market::{MarketSnapshot, PriceSeries};
use crate::domain::recommendation::{AssetRisk, RiskProfile};
use crate::engine::stats;
use crate::error::{CoreError, CoreResult};
use crate::strategy::StrategyConfig;

/// Bounded Kelly-style fraction.
///
/// This is `sharpe / volatility` (i.e. `mean / volatility^2`) on annualized figures, the
/// mean-variance approximation of continuous Kelly sizing rather than the exact formula.
/// Non-finite inputs size to zero.
pub fn kelly_fraction(sharpe: f64, annualized_volatility: f64, max_fraction: f64) -> f64 {
    if annualized_volatility <= 0.0 || !annualized_volatility.is_finite() {
        return 0.0;
    }
    let raw = sharpe / annualized_volatility;
    if !raw.is_finite() {
        return if raw > 0.0 { max_fraction } else { 0.0 };
    }
    raw.clamp(0.0, max_fraction)
}

/// Historical VaR: the `(1 - confidence)` percentile of `returns`. Negative means loss.
pub fn historical_var(returns: &[f64], confidence: f64) -> Option<f64> {
    stats::percentile(returns, (1.0 - confidence) * 100.0)
}

fn trailing<'a>(returns: &'a [f64], window: usize, label: &str) -> CoreResult<&'a [f64]> {
    if returns.len() < window {
        return Err(CoreError::insufficient(label, window, returns.len()));
    }
    Ok(&returns[returns.len() - window..])
}

pub fn estimate_asset(series: &PriceSeries, config: &StrategyConfig) -> CoreResult<AssetRisk> {
    let returns = stats::daily_returns(&series.closes());
    let returns_label = format!("{} returns", series.symbol());
    let windows = &config.windows;

    let sample = trailing(&returns, windows.volatility_returns.max(2), &returns_label)?;
    let days = windows.trading_days_per_year as f64;
    let daily_mean = stats::mean(sample).unwrap_or(0.0);
    let daily_std = stats::sample_std(sample).unwrap_or(0.0);

    let annualized_return = daily_mean * days;
    let annualized_volatility = daily_std * days.sqrt();
    let sharpe = if annualized_volatility > 0.0 {
        annualized_return / annualized_volatility
    } else {
        0.0
    };

    let var_sample = trailing(&returns, windows.var_returns, &returns_label)?;
    let value_at_risk = historical_var(var_sample, config.risk.var_confidence).unwrap_or(0.0);

    Ok(AssetRisk {
        annualized_return,
        annualized_volatility,
        sharpe,
        kelly_fraction: kelly_fraction(sharpe, annualized_volatility, config.risk.max_kelly_fraction),
        value_at_risk,
    })
}

pub fn estimate(snapshot: &MarketSnapshot, config: &StrategyConfig) -> CoreResult<RiskProfile> {
    Ok(RiskProfile {
        equity: estimate_asset(&snapshot.equity.prices, config)?,
        crypto: estimate_asset(&snapshot.crypto.prices, config)?,
        var_confidence: config.risk.var_confidence,
    })
}
