//! Regime-conditioned allocation of the monthly amount.

use crate::domain::market::{CurrentPrices, MarketSnapshot, SentimentScore};
use crate::domain::recommendation::{
    AllocationPlan, CryptoAllocation, EquityAllocation, EquitySignal, EquitySignals,
    RegimeAssessment, RiskProfile,
};
use crate::error::{CoreError, CoreResult};
use crate::strategy::{EquitySignalConfig, RegimeBand, StrategyConfig};

pub fn regime_band(crypto_sentiment: SentimentScore, config: &StrategyConfig) -> CoreResult<&RegimeBand> {
    config.band_for(crypto_sentiment.value()).ok_or_else(|| {
        CoreError::Validation(format!(
            "no regime band covers crypto sentiment {}",
            crypto_sentiment.value()
        ))
    })
}

pub fn equity_signals(assessment: &RegimeAssessment, cfg: &EquitySignalConfig) -> EquitySignals {
    EquitySignals {
        low_sentiment: assessment.equity_sentiment.value() <= cfg.fear_sentiment_max,
        high_volatility: assessment.volatility_index_level > cfg.high_volatility_index,
        below_moving_average: assessment.equity_vs_ma_pct < cfg.below_ma_pct,
    }
}

/// Opportunity wins over caution: greed only matters when the fear signals did not fire.
pub fn equity_multiplier(
    signals: &EquitySignals,
    equity_sentiment: SentimentScore,
    cfg: &EquitySignalConfig,
) -> (EquitySignal, f64) {
    if signals.count() >= cfg.min_signals_for_opportunity {
        (EquitySignal::Opportunity, cfg.opportunity_multiplier)
    } else if equity_sentiment.value() > cfg.greed_sentiment_min {
        (EquitySignal::Caution, cfg.caution_multiplier)
    } else {
        (EquitySignal::Neutral, 1.0)
    }
}

/// Whole shares affordable within `target`, and what they cost.
pub fn whole_shares(target: f64, price: f64) -> (u64, f64) {
    if target <= 0.0 {
        return (0, 0.0);
    }
    let mut shares = (target / price).floor() as u64;
    // Guard against the quotient rounding up to the next integer.
    while shares > 0 && shares as f64 * price > target {
        shares -= 1;
    }
    (shares, shares as f64 * price)
}

fn checked_price(price: f64, symbol: &str) -> CoreResult<f64> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(CoreError::PriceUnavailable {
            asset: symbol.to_string(),
        })
    }
}

pub fn allocate(
    assessment: &RegimeAssessment,
    risk: &RiskProfile,
    prices: &CurrentPrices,
    config: &StrategyConfig,
    monthly_amount: f64,
) -> CoreResult<AllocationPlan> {
    let equity_price = checked_price(prices.equity, &config.assets.equity)?;
    let crypto_price = checked_price(prices.crypto, &config.assets.crypto)?;
    if !prices.fx_rate.is_finite() || prices.fx_rate <= 0.0 {
        return Err(CoreError::DataUnavailable {
            what: "fx rate".to_string(),
            reason: format!("fx rate must be positive (got {})", prices.fx_rate),
        });
    }

    let band = regime_band(assessment.crypto_sentiment, config)?;
    let uncapped_crypto = monthly_amount * config.crypto_weight * band.multiplier;
    let crypto_target = uncapped_crypto.min(band.cap);
    let crypto_price_in_base = crypto_price / prices.fx_rate;

    let signals = equity_signals(assessment, &config.equity_signals);
    let (equity_signal, eq_multiplier) =
        equity_multiplier(&signals, assessment.equity_sentiment, &config.equity_signals);
    let equity_target = monthly_amount * config.equity_weight * eq_multiplier;
    let (shares, equity_amount) = whole_shares(equity_target, equity_price);

    Ok(AllocationPlan {
        regime: band.regime,
        equity_signal,
        equity_signals: signals,
        bearish_signal_count: signals.count(),
        equity_fear: equity_signal == EquitySignal::Opportunity,
        crypto_fear: band.regime.is_fear(),
        crypto_greed: band.regime.is_greed(),
        equity: EquityAllocation {
            symbol: config.assets.equity.clone(),
            price: equity_price,
            multiplier: eq_multiplier,
            target_amount: equity_target,
            shares,
            amount: equity_amount,
            leftover: equity_target - equity_amount,
            kelly_fraction: risk.equity.kelly_fraction,
        },
        crypto: CryptoAllocation {
            symbol: config.assets.crypto.clone(),
            price: crypto_price,
            price_in_base: crypto_price_in_base,
            multiplier: band.multiplier,
            cap: band.cap,
            uncapped_target: uncapped_crypto,
            target_amount: crypto_target,
            capped: uncapped_crypto > band.cap,
            units: crypto_target / crypto_price_in_base,
            kelly_fraction: risk.crypto.kelly_fraction,
        },
        total_investment: equity_amount + crypto_target,
    })
}

pub fn optimize(
    assessment: &RegimeAssessment,
    risk: &RiskProfile,
    snapshot: &MarketSnapshot,
    config: &StrategyConfig,
    monthly_amount: f64,
) -> CoreResult<AllocationPlan> {
    let prices = snapshot.current_prices()?;
    allocate(assessment, risk, &prices, config, monthly_amount)
}
