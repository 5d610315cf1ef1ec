use monto_core::domain::market::{SentimentReading, SentimentSource};
use monto_core::domain::recommendation::{OrderLadder, OrderType, Recommendation};
use std::fmt::Write;

fn sentiment(reading: &SentimentReading) -> String {
    match &reading.source {
        SentimentSource::Observed => reading.score.value().to_string(),
        SentimentSource::Defaulted { .. } => format!("{} (defaulted)", reading.score.value()),
    }
}

fn ladder(out: &mut String, ladder: &OrderLadder) {
    let _ = writeln!(
        out,
        "  {} @ {:.2} {} ({} chunks)",
        ladder.symbol, ladder.current_price, ladder.currency, ladder.chunks
    );
    for order in &ladder.orders {
        let kind = match order.order_type {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        };
        let _ = writeln!(
            out,
            "    {kind:<6} {:>12.2}  {:>5.1}%  {:?}",
            order.price, order.size_pct, order.confidence
        );
    }
    if ladder.unallocated_pct.abs() > 1e-9 {
        let _ = writeln!(out, "    unallocated {:+.1}%", ladder.unallocated_pct);
    }
}

/// Plain-text summary. Reads the finished recommendation only.
pub fn render(rec: &Recommendation) -> String {
    let mut out = String::new();
    let plan = &rec.plan;
    let cur = &rec.base_currency;

    let _ = writeln!(out, "Recommendation for {} (generated {})", rec.as_of_date, rec.generated_at);
    let _ = writeln!(
        out,
        "Regime {}  composite {:+.2}  sentiment equity {} / crypto {}",
        plan.regime.label(),
        rec.assessment.composite_score,
        sentiment(&rec.equity_sentiment),
        sentiment(&rec.crypto_sentiment),
    );
    let _ = writeln!(
        out,
        "Volatility index {:.2} (z {:+.2})  equity vs MA {:+.2}%  signals {}",
        rec.assessment.volatility_index_level,
        rec.assessment.volatility_index_z,
        rec.assessment.equity_vs_ma_pct,
        plan.bearish_signal_count,
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Equity {}: {} shares x {:.2} = {:.2} {cur} (target {:.2}, x{:.1})",
        plan.equity.symbol,
        plan.equity.shares,
        plan.equity.price,
        plan.equity.amount,
        plan.equity.target_amount,
        plan.equity.multiplier,
    );
    let _ = writeln!(
        out,
        "Crypto {}: {:.2} {cur} = {:.6} units (x{:.1}, cap {:.0}{})",
        plan.crypto.symbol,
        plan.crypto.target_amount,
        plan.crypto.units,
        plan.crypto.multiplier,
        plan.crypto.cap,
        if plan.crypto.capped { ", capped" } else { "" },
    );
    let _ = writeln!(out, "Total {:.2} {cur} of {:.2}", plan.total_investment, rec.monthly_amount);
    let _ = writeln!(out);
    let _ = writeln!(out, "Entry ladders");
    ladder(&mut out, &rec.ladders.equity);
    ladder(&mut out, &rec.ladders.crypto);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Risk  VaR({:.0}%) equity {:+.2}% crypto {:+.2}%  Kelly equity {:.2} crypto {:.2}",
        rec.risk.var_confidence * 100.0,
        rec.risk.equity.value_at_risk * 100.0,
        rec.risk.crypto.value_at_risk * 100.0,
        rec.risk.equity.kelly_fraction,
        rec.risk.crypto.kelly_fraction,
    );
    let _ = writeln!(
        out,
        "Forecast  return {:.2}%  risk {:.2}%  sharpe {:.2}",
        rec.forecast.expected_return * 100.0,
        rec.forecast.risk * 100.0,
        rec.forecast.sharpe,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use monto_core::ingest::fixture::FixtureDataProvider;
    use monto_core::strategy::StrategyConfig;

    #[tokio::test]
    async fn renders_plan_and_flags_defaulted_sentiment() {
        let config = StrategyConfig::default();
        let as_of = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let provider =
            FixtureDataProvider::new(config.assets.clone(), as_of).with_sentiment(None, Some(15));
        let snapshot = monto_core::pipeline::fetch_snapshot(&provider, &config, as_of)
            .await
            .unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 18, 0, 0).unwrap();
        let rec = monto_core::pipeline::recommend(&snapshot, &config, 1500.0, at).unwrap();

        let text = render(&rec);
        assert!(text.contains("Regime EXTREME_FEAR"));
        assert!(text.contains("50 (defaulted)"));
        assert!(text.contains("IWDA.AS"));
        assert!(text.contains("capped"));
        assert!(text.contains("unallocated +25.0%"));
    }
}
