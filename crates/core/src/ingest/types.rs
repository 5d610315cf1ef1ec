use crate::domain::market::{PricePoint, PriceSeries};
use crate::error::CoreResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeriesResponse {
    pub symbol: String,
    pub points: Vec<PricePointItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePointItem {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResponse {
    pub asset: String,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxRateResponse {
    pub base: String,
    pub quote: String,
    pub rate: f64,
}

impl PriceSeriesResponse {
    pub fn into_series(self) -> CoreResult<PriceSeries> {
        let points = self
            .points
            .into_iter()
            .map(|p| PricePoint {
                date: p.date,
                price: p.price,
            })
            .collect();
        PriceSeries::new(self.symbol, points)
    }
}
