//! One recommendation cycle: validate, fetch, classify, estimate, optimize, plan, assemble.

use crate::domain::contract::validate_monthly_amount;
use crate::domain::market::{AssetClass, AssetMarket, MarketSnapshot, SentimentReading, SentimentScore};
use crate::domain::recommendation::Recommendation;
use crate::engine::assemble::{assemble, AssemblyInput};
use crate::engine::{allocation, entry_zones, regime, risk};
use crate::error::{CoreError, CoreResult};
use crate::ingest::MarketDataProvider;
use crate::strategy::StrategyConfig;
use chrono::{DateTime, NaiveDate, Utc};

fn sentiment_reading(asset: AssetClass, res: anyhow::Result<SentimentScore>) -> SentimentReading {
    match res {
        Ok(score) => SentimentReading::observed(score),
        Err(err) => {
            tracing::warn!(%asset, error = %format!("{err:#}"), "sentiment fetch failed; using neutral score");
            SentimentReading::defaulted(format!("{err:#}"))
        }
    }
}

/// Fetches everything a cycle needs. Price and fx failures abort; sentiment failures degrade
/// to an explicitly defaulted neutral reading.
pub async fn fetch_snapshot(
    provider: &dyn MarketDataProvider,
    config: &StrategyConfig,
    as_of_date: NaiveDate,
) -> CoreResult<MarketSnapshot> {
    let assets = &config.assets;
    let lookback = config.windows.lookback;

    let (equity_prices, crypto_prices, vix, equity_sentiment, crypto_sentiment, fx_rate) = tokio::join!(
        provider.get_price_series(&assets.equity, lookback),
        provider.get_price_series(&assets.crypto, lookback),
        provider.get_price_series(&assets.volatility_index, lookback),
        provider.get_sentiment(AssetClass::Equity),
        provider.get_sentiment(AssetClass::Crypto),
        provider.get_fx_rate(&assets.base_currency, &assets.crypto_quote_currency),
    );

    let equity_prices = equity_prices.map_err(|e| CoreError::data_unavailable(&assets.equity, &e))?;
    let crypto_prices = crypto_prices.map_err(|e| CoreError::data_unavailable(&assets.crypto, &e))?;
    let volatility_index =
        vix.map_err(|e| CoreError::data_unavailable(&assets.volatility_index, &e))?;
    let fx_pair = format!("{}/{}", assets.base_currency, assets.crypto_quote_currency);
    let fx_rate = fx_rate.map_err(|e| CoreError::data_unavailable(&fx_pair, &e))?;
    if !fx_rate.is_finite() || fx_rate <= 0.0 {
        return Err(CoreError::DataUnavailable {
            what: fx_pair,
            reason: format!("fx rate must be positive (got {fx_rate})"),
        });
    }

    Ok(MarketSnapshot {
        as_of_date,
        equity: AssetMarket {
            prices: equity_prices,
            sentiment: sentiment_reading(AssetClass::Equity, equity_sentiment),
        },
        crypto: AssetMarket {
            prices: crypto_prices,
            sentiment: sentiment_reading(AssetClass::Crypto, crypto_sentiment),
        },
        volatility_index,
        fx_rate,
    })
}

/// Pure part of the cycle. Deterministic for a given snapshot, config, amount and timestamp.
pub fn recommend(
    snapshot: &MarketSnapshot,
    config: &StrategyConfig,
    monthly_amount: f64,
    generated_at: DateTime<Utc>,
) -> CoreResult<Recommendation> {
    let monthly_amount = validate_monthly_amount(monthly_amount, &config.amount_bounds)?;

    let assessment = regime::classify(snapshot, config)?;
    let risk = risk::estimate(snapshot, config)?;
    let plan = allocation::optimize(&assessment, &risk, snapshot, config, monthly_amount)?;
    let ladders = entry_zones::plan(&plan, config);

    Ok(assemble(
        AssemblyInput {
            snapshot,
            assessment,
            risk,
            plan,
            ladders,
            monthly_amount,
            generated_at,
        },
        config,
    ))
}

pub async fn generate_recommendation(
    provider: &dyn MarketDataProvider,
    config: &StrategyConfig,
    monthly_amount: f64,
    as_of_date: NaiveDate,
) -> CoreResult<Recommendation> {
    // Reject bad input before touching the network.
    let monthly_amount = validate_monthly_amount(monthly_amount, &config.amount_bounds)?;
    let snapshot = fetch_snapshot(provider, config, as_of_date).await?;
    recommend(&snapshot, config, monthly_amount, Utc::now())
}
