pub mod fixture;
pub mod provider;
pub mod types;

pub use provider::{HttpJsonDataProvider, MarketDataProvider};
