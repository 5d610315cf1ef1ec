//! Tiered buy ladders around the current price.

use crate::domain::recommendation::{
    AllocationPlan, Confidence, OrderLadder, OrderLadders, OrderSpec, OrderType, PriceZones,
};
use crate::strategy::{LadderSizing, StrategyConfig};

pub fn price_zones(price: f64, step: f64) -> PriceZones {
    PriceZones {
        support_1: price * (1.0 - step),
        support_2: price * (1.0 - 2.0 * step),
        resistance_1: price * (1.0 + step),
        resistance_2: price * (1.0 + 2.0 * step),
    }
}

/// Always three orders: market at the current price, then limits at both supports.
///
/// Under [`LadderSizing::Literal`] each order is `100 / chunks` percent, so the ladder only
/// sums to 100 when `chunks == 3`; the gap is reported in `unallocated_pct`.
pub fn build_ladder(
    symbol: &str,
    currency: &str,
    price: f64,
    step: f64,
    chunks: u32,
    sizing: LadderSizing,
) -> OrderLadder {
    let zones = price_zones(price, step);
    let template = [
        (price, OrderType::Market, Confidence::High),
        (zones.support_1, OrderType::Limit, Confidence::High),
        (zones.support_2, OrderType::Limit, Confidence::Medium),
    ];

    let size_pct = match sizing {
        LadderSizing::Literal => 100.0 / f64::from(chunks.max(1)),
        LadderSizing::Normalized => 100.0 / template.len() as f64,
    };

    let orders: Vec<OrderSpec> = template
        .iter()
        .map(|&(price, order_type, confidence)| OrderSpec {
            price,
            size_pct,
            order_type,
            confidence,
        })
        .collect();
    let allocated: f64 = orders.iter().map(|o| o.size_pct).sum();

    OrderLadder {
        symbol: symbol.to_string(),
        currency: currency.to_string(),
        current_price: price,
        zones,
        chunks,
        sizing,
        orders,
        unallocated_pct: 100.0 - allocated,
    }
}

pub fn plan(plan: &AllocationPlan, config: &StrategyConfig) -> OrderLadders {
    let zones = &config.zones;

    let crypto_chunks = if plan.crypto_fear {
        zones.crypto_fear_chunks
    } else {
        zones.crypto_default_chunks
    };
    let equity_chunks = if plan.equity_fear {
        zones.equity_fear_chunks
    } else {
        zones.equity_default_chunks
    };

    OrderLadders {
        equity: build_ladder(
            &plan.equity.symbol,
            &config.assets.base_currency,
            plan.equity.price,
            zones.equity_step,
            equity_chunks,
            zones.sizing,
        ),
        crypto: build_ladder(
            &plan.crypto.symbol,
            &config.assets.crypto_quote_currency,
            plan.crypto.price,
            zones.crypto_step,
            crypto_chunks,
            zones.sizing,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{flat_then, SnapshotBuilder};
    use crate::engine::{allocation, regime, risk};

    fn allocation_plan(builder: SnapshotBuilder, config: &StrategyConfig) -> AllocationPlan {
        let snapshot = builder.build();
        let assessment = regime::classify(&snapshot, config).unwrap();
        let risk = risk::estimate(&snapshot, config).unwrap();
        allocation::optimize(&assessment, &risk, &snapshot, config, 1500.0).unwrap()
    }

    fn sum(ladder: &OrderLadder) -> f64 {
        ladder.orders.iter().map(|o| o.size_pct).sum()
    }

    #[test]
    fn zones_are_symmetric() {
        let z = price_zones(100.0, 0.03);
        assert!((z.support_1 - 97.0).abs() < 1e-9);
        assert!((z.support_2 - 94.0).abs() < 1e-9);
        assert!((z.resistance_1 - 103.0).abs() < 1e-9);
        assert!((z.resistance_2 - 106.0).abs() < 1e-9);
    }

    #[test]
    fn always_three_orders_in_fixed_shape() {
        for chunks in [1, 2, 3, 4, 7] {
            for sizing in [LadderSizing::Literal, LadderSizing::Normalized] {
                let ladder = build_ladder("BTC-USD", "USD", 40_000.0, 0.03, chunks, sizing);
                assert_eq!(ladder.orders.len(), 3);
                let types: Vec<_> = ladder.orders.iter().map(|o| o.order_type).collect();
                assert_eq!(types, vec![OrderType::Market, OrderType::Limit, OrderType::Limit]);
                let conf: Vec<_> = ladder.orders.iter().map(|o| o.confidence).collect();
                assert_eq!(conf, vec![Confidence::High, Confidence::High, Confidence::Medium]);
                assert_eq!(ladder.orders[0].price, 40_000.0);
                assert_eq!(ladder.orders[1].price, ladder.zones.support_1);
                assert_eq!(ladder.orders[2].price, ladder.zones.support_2);
            }
        }
    }

    #[test]
    fn literal_sizing_surfaces_shortfall_and_overcommit() {
        let two = build_ladder("IWDA.AS", "EUR", 80.0, 0.01, 2, LadderSizing::Literal);
        assert!(two.orders.iter().all(|o| o.size_pct == 50.0));
        assert!((sum(&two) - 150.0).abs() < 1e-9);
        assert!((two.unallocated_pct + 50.0).abs() < 1e-9);

        let four = build_ladder("BTC-USD", "USD", 40_000.0, 0.03, 4, LadderSizing::Literal);
        assert!(four.orders.iter().all(|o| o.size_pct == 25.0));
        assert!((sum(&four) - 75.0).abs() < 1e-9);
        assert!((four.unallocated_pct - 25.0).abs() < 1e-9);

        let three = build_ladder("IWDA.AS", "EUR", 80.0, 0.01, 3, LadderSizing::Literal);
        assert!(three.unallocated_pct.abs() < 1e-9);
    }

    #[test]
    fn normalized_sizing_always_sums_to_hundred() {
        for chunks in [2, 3, 4] {
            let ladder = build_ladder("BTC-USD", "USD", 40_000.0, 0.03, chunks, LadderSizing::Normalized);
            assert!((sum(&ladder) - 100.0).abs() < 1e-9);
            assert!(ladder.unallocated_pct.abs() < 1e-9);
            assert_eq!(ladder.chunks, chunks);
        }
    }

    #[test]
    fn equity_fear_uses_three_chunks_while_neutral_crypto_uses_two() {
        let config = StrategyConfig::default();
        let plan = allocation_plan(
            SnapshotBuilder {
                equity_sentiment: 30,
                vix: flat_then(300, 30.0, 30.0),
                ..SnapshotBuilder::default()
            },
            &config,
        );
        assert!(plan.equity_fear);
        assert!(!plan.crypto_fear);

        let ladders = super::plan(&plan, &config);
        assert_eq!(ladders.equity.chunks, 3);
        assert!(ladders.equity.unallocated_pct.abs() < 1e-9);
        assert_eq!(ladders.crypto.chunks, 2);
        assert!((ladders.crypto.unallocated_pct + 50.0).abs() < 1e-9);
    }

    #[test]
    fn chunk_count_follows_each_fear_flag() {
        let config = StrategyConfig::default();
        let base = allocation_plan(SnapshotBuilder::default(), &config);

        // (equity_fear, crypto_fear) -> (equity chunks, crypto chunks, equity gap, crypto gap)
        let cases = [
            ((false, false), (2, 2, -50.0, -50.0)),
            ((true, false), (3, 2, 0.0, -50.0)),
            ((false, true), (2, 4, -50.0, 25.0)),
            ((true, true), (3, 4, 0.0, 25.0)),
        ];
        for ((equity_fear, crypto_fear), (eq_chunks, cr_chunks, eq_gap, cr_gap)) in cases {
            let mut plan = base.clone();
            plan.equity_fear = equity_fear;
            plan.crypto_fear = crypto_fear;

            let ladders = super::plan(&plan, &config);
            assert_eq!(ladders.equity.chunks, eq_chunks, "equity_fear={equity_fear}");
            assert_eq!(ladders.crypto.chunks, cr_chunks, "crypto_fear={crypto_fear}");
            assert!((ladders.equity.unallocated_pct - eq_gap).abs() < 1e-9);
            assert!((ladders.crypto.unallocated_pct - cr_gap).abs() < 1e-9);
        }
    }
}
