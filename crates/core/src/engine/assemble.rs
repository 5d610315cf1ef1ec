use crate::domain::market::MarketSnapshot;
use crate::domain::recommendation::{
    AllocationPlan, OrderLadders, PortfolioForecast, Recommendation, RegimeAssessment, RiskProfile,
};
use crate::strategy::StrategyConfig;
use chrono::{DateTime, Utc};

/// Two-asset expected return and risk, using allocation weights and the assumed correlation.
pub fn forecast(plan: &AllocationPlan, risk: &RiskProfile, config: &StrategyConfig) -> PortfolioForecast {
    let total = plan.total_investment;
    let (w_e, w_c) = if total > 0.0 {
        (plan.equity.amount / total, plan.crypto.target_amount / total)
    } else {
        (0.0, 0.0)
    };

    let f = &config.forecast;
    let expected_return = w_e * f.equity_expected_return + w_c * f.crypto_expected_return;

    let s_e = risk.equity.annualized_volatility;
    let s_c = risk.crypto.annualized_volatility;
    let variance = (w_e * s_e).powi(2) + (w_c * s_c).powi(2) + 2.0 * w_e * w_c * f.correlation * s_e * s_c;
    let portfolio_risk = variance.max(0.0).sqrt();

    let sharpe = if portfolio_risk > 0.0 {
        expected_return / portfolio_risk
    } else {
        0.0
    };

    PortfolioForecast {
        equity_weight: w_e,
        crypto_weight: w_c,
        expected_return,
        risk: portfolio_risk,
        sharpe,
    }
}

pub struct AssemblyInput<'a> {
    pub snapshot: &'a MarketSnapshot,
    pub assessment: RegimeAssessment,
    pub risk: RiskProfile,
    pub plan: AllocationPlan,
    pub ladders: OrderLadders,
    pub monthly_amount: f64,
    pub generated_at: DateTime<Utc>,
}

pub fn assemble(input: AssemblyInput<'_>, config: &StrategyConfig) -> Recommendation {
    let forecast = forecast(&input.plan, &input.risk, config);

    Recommendation {
        generated_at: input.generated_at,
        as_of_date: input.snapshot.as_of_date,
        strategy_version: config.version,
        monthly_amount: input.monthly_amount,
        base_currency: config.assets.base_currency.clone(),
        equity_sentiment: input.snapshot.equity.sentiment.clone(),
        crypto_sentiment: input.snapshot.crypto.sentiment.clone(),
        assessment: input.assessment,
        risk: input.risk,
        plan: input.plan,
        ladders: input.ladders,
        forecast,
    }
}
