// =============================================================================
// Market Data Provider — the data-source seam
// =============================================================================

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};

use crate::market_data::series::RawTable;

/// Minimum calendar span fetched for each symbol.
pub const MIN_LOOKBACK_DAYS: u32 = 180;

/// Calendar-date request window. `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    /// Window that ends "tomorrow" so today's bar is included when the
    /// provider already has it.
    pub fn ending_tomorrow(today: NaiveDate, lookback_days: u32) -> Self {
        let end = today + Days::new(1);
        let start = end - Days::new(u64::from(lookback_days.max(MIN_LOOKBACK_DAYS)));
        Self { start, end }
    }
}

/// Source of daily OHLCV tables.
///
/// `Ok(None)` signals absence (unknown symbol or no trading in range).
/// `Err` is reserved for transport or protocol failures.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch(&self, symbol: &str, window: FetchWindow) -> Result<Option<RawTable>>;
}
