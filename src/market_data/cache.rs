// =============================================================================
// Series Cache — TTL memo of normalized fetch results
// =============================================================================
//
// Keyed by symbol and fetch window. A confirmed absence is stored like a
// series; fetch errors are never stored. Entries older than the TTL read as
// misses until `evict_expired` drops them.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use crate::market_data::provider::FetchWindow;
use crate::market_data::series::PriceSeries;

// ---------------------------------------------------------------------------
// SeriesCache -- per-symbol memo of normalized fetch results
// ---------------------------------------------------------------------------

/// Cache key: the symbol plus the calendar window it was fetched for.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey {
    pub symbol: String,
    pub window: FetchWindow,
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}..{}", self.symbol, self.window.start, self.window.end)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: Instant,
    /// `None` records a confirmed absence so it is not re-fetched either.
    series: Option<Arc<PriceSeries>>,
}

/// Memo of normalized series keyed by `(symbol, window)`.
///
/// Entries older than `ttl` read as misses. A scanner owns one cache; when
/// the scanner is reused across periodic runs the TTL bounds staleness.
/// Fetch errors are never stored.
pub struct SeriesCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl SeriesCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up a key. The outer `Option` is hit/miss; the inner one is the
    /// cached result (series or absence).
    pub fn get(&self, key: &CacheKey) -> Option<Option<Arc<PriceSeries>>> {
        let map = self.entries.read();
        let entry = map.get(key)?;
        if entry.stored_at.elapsed() > self.ttl {
            debug!(key = %key, "cache entry expired");
            return None;
        }
        Some(entry.series.clone())
    }

    pub fn insert(&self, key: CacheKey, series: Option<Arc<PriceSeries>>) {
        let mut map = self.entries.write();
        map.insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                series,
            },
        );
    }

    /// Drop expired entries.
    pub fn evict_expired(&self) -> usize {
        let mut map = self.entries.write();
        let before = map.len();
        map.retain(|_, e| e.stored_at.elapsed() <= self.ttl);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}
