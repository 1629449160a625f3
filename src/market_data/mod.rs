pub mod cache;
pub mod provider;
pub mod series;

// Re-export the common types for convenient access (e.g. `use crate::market_data::PriceSeries`).
pub use cache::{CacheKey, SeriesCache};
pub use provider::{FetchWindow, MarketDataProvider};
pub use series::{normalize, ColumnName, PriceBar, PriceSeries, RawColumn, RawTable, RawValue};
