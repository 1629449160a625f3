// =============================================================================
// Scan Orchestrator — fetch → normalize → bands → detect, per symbol
// =============================================================================
//
// Every symbol of the configured universe is run through the pipeline in
// input order. Whatever goes wrong for one symbol (fetch error, malformed
// table, short history, NaN band) is downgraded to a skip: it is logged and
// recorded on the report, and the scan moves on.
//
// With `max_concurrent_fetches > 1` several pipelines are in flight at once,
// but `buffered` yields results in input order, so both partitions still
// follow the order of the symbol list.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::breakout::{detect, AnalyzedSeries, Signal, SkipReason};
use crate::indicators::calculate_bollinger_series;
use crate::market_data::{normalize, CacheKey, FetchWindow, MarketDataProvider, PriceSeries, SeriesCache};
use crate::runtime_config::ScanConfiguration;
use crate::types::SignalKind;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Outcome of one scan run.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub run_id: Uuid,
    pub scanned_at: DateTime<Utc>,
    pub bullish: Vec<Signal>,
    pub bearish: Vec<Signal>,
    /// Symbols with a valid reference candle that stayed inside the bands.
    pub no_breakout: Vec<String>,
    /// Symbols that produced no result, with the reason.
    pub skipped: Vec<(String, SkipReason)>,
}

impl ScanReport {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scanned_at: Utc::now(),
            bullish: Vec::new(),
            bearish: Vec::new(),
            no_breakout: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Signals that can be charted: bullish first, then bearish.
    pub fn selectable(&self) -> impl Iterator<Item = &Signal> {
        self.bullish.iter().chain(self.bearish.iter())
    }

    pub fn signal_count(&self) -> usize {
        self.bullish.len() + self.bearish.len()
    }
}

enum SymbolOutcome {
    Breakout(Signal),
    Inside,
    Skipped(SkipReason),
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Runs scans against one provider and owns the fetch cache.
pub struct Scanner<P> {
    provider: P,
    cache: SeriesCache,
}

impl<P: MarketDataProvider> Scanner<P> {
    pub fn new(provider: P, cache_ttl: Duration) -> Self {
        Self {
            provider,
            cache: SeriesCache::new(cache_ttl),
        }
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    /// Scan `config.symbols` as of `today`.
    pub async fn scan(&self, config: &ScanConfiguration, today: NaiveDate) -> ScanReport {
        let window = FetchWindow::ending_tomorrow(today, config.lookback_days);
        let mut report = ScanReport::new();

        info!(
            run_id = %report.run_id,
            symbols = config.symbols.len(),
            period = config.period,
            std_dev_multiplier = config.std_dev_multiplier,
            window_start = %window.start,
            window_end = %window.end,
            "scan starting"
        );

        let outcomes: Vec<(&String, SymbolOutcome)> = stream::iter(&config.symbols)
            .map(|symbol| async move { (symbol, self.analyze_symbol(symbol, window, config).await) })
            .buffered(config.max_concurrent_fetches.max(1))
            .collect()
            .await;

        for (symbol, outcome) in outcomes {
            match outcome {
                SymbolOutcome::Breakout(signal) => {
                    info!(
                        symbol = %symbol,
                        kind = %signal.kind,
                        close = signal.close,
                        band = signal.reference_band,
                        date = %signal.signal_date,
                        "breakout"
                    );
                    match signal.kind {
                        SignalKind::Bullish => report.bullish.push(signal),
                        SignalKind::Bearish => report.bearish.push(signal),
                    }
                }
                SymbolOutcome::Inside => report.no_breakout.push(symbol.clone()),
                SymbolOutcome::Skipped(reason) => {
                    match &reason {
                        SkipReason::FetchFailed(_) | SkipReason::MalformedSeries(_) => {
                            warn!(symbol = %symbol, reason = %reason, "symbol skipped")
                        }
                        _ => debug!(symbol = %symbol, reason = %reason, "symbol skipped"),
                    }
                    report.skipped.push((symbol.clone(), reason));
                }
            }
        }

        info!(
            run_id = %report.run_id,
            scanned = config.symbols.len(),
            bullish = report.bullish.len(),
            bearish = report.bearish.len(),
            skipped = report.skipped.len(),
            "scan complete"
        );

        report
    }

    async fn analyze_symbol(
        &self,
        symbol: &str,
        window: FetchWindow,
        config: &ScanConfiguration,
    ) -> SymbolOutcome {
        let series = match self.load_series(symbol, window).await {
            Ok(Some(series)) => series,
            Ok(None) => return SymbolOutcome::Skipped(SkipReason::DataAbsent),
            Err(reason) => return SymbolOutcome::Skipped(reason),
        };

        debug!(symbol, bars = series.len(), "series loaded");
        let bands = calculate_bollinger_series(&series.closes(), config.period, config.std_dev_multiplier);
        let analysis = Arc::new(AnalyzedSeries { series, bands });

        match detect(&analysis, config) {
            Ok(Some(signal)) => SymbolOutcome::Breakout(signal),
            Ok(None) => SymbolOutcome::Inside,
            Err(reason) => SymbolOutcome::Skipped(reason),
        }
    }

    /// Cached fetch + normalize. Absence is cached; errors are not.
    async fn load_series(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<Option<Arc<PriceSeries>>, SkipReason> {
        let key = CacheKey {
            symbol: symbol.to_string(),
            window,
        };
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "cache hit");
            return Ok(hit);
        }

        let raw = self
            .provider
            .fetch(symbol, window)
            .await
            .map_err(|e| SkipReason::FetchFailed(format!("{e:#}")))?;

        let series = normalize(symbol, raw)
            .map_err(|e| SkipReason::MalformedSeries(e.to_string()))?
            .filter(|s| !s.is_empty())
            .map(Arc::new);

        self.cache.insert(key, series.clone());
        Ok(series)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
