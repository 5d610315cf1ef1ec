use crate::error::{CoreError, CoreResult};
use crate::strategy::AmountBounds;
use serde::{Deserialize, Serialize};

/// Inbound request accepted by the recommendation entry points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub monthly_amount: f64,
}

impl RecommendationRequest {
    pub fn validate(&self, bounds: &AmountBounds) -> CoreResult<f64> {
        validate_monthly_amount(self.monthly_amount, bounds)
    }
}

/// Rejects non-finite or out-of-range amounts. Values are never clamped.
pub fn validate_monthly_amount(amount: f64, bounds: &AmountBounds) -> CoreResult<f64> {
    if !amount.is_finite() {
        return Err(CoreError::Validation(format!(
            "monthly_amount must be a finite number (got {amount})"
        )));
    }
    if !(bounds.min..=bounds.max).contains(&amount) {
        return Err(CoreError::Validation(format!(
            "monthly_amount must be between {} and {} (got {amount})",
            bounds.min, bounds.max
        )));
    }
    Ok(amount)
}
