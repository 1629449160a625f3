// =============================================================================
// Price Series — canonical daily bars and the raw-table normalizer
// =============================================================================
//
// Providers hand back a loosely shaped `RawTable`: a date index plus columns
// whose names are either flat ("Close") or multi-level (("Close", "AAPL")).
// `normalize` turns that into a `PriceSeries`:
//
//   1. absent / empty table            -> Ok(None)  (no data)
//   2. flatten column names to level 0, first occurrence wins
//   3. cast Open/High/Low/Close to f64, drop rows with a missing value
//   4. sort ascending by date, one bar per date (last occurrence wins)
//
// The normalizer is pure. Caching happens one layer up.
// =============================================================================

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

const OHLC_FIELDS: [&str; 4] = ["Open", "High", "Low", "Close"];
const VOLUME_FIELD: &str = "Volume";

// ---------------------------------------------------------------------------
// Canonical types
// ---------------------------------------------------------------------------

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Normalized daily bars for one symbol, ascending by date with no
/// duplicate dates. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Build a series from bars that are already canonical (sorted, unique
    /// dates). Used by tests to construct fixtures directly.
    #[cfg(test)]
    pub fn from_canonical(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        debug_assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    /// Render the series back into a flat raw table.
    #[cfg(test)]
    pub fn to_raw_table(&self) -> RawTable {
        let column = |name: &str, f: fn(&PriceBar) -> f64| RawColumn {
            name: ColumnName::Flat(name.to_string()),
            values: self.bars.iter().map(|b| RawValue::Number(f(b))).collect(),
        };
        RawTable {
            index: self.bars.iter().map(|b| b.date).collect(),
            columns: vec![
                column("Open", |b| b.open),
                column("High", |b| b.high),
                column("Low", |b| b.low),
                column("Close", |b| b.close),
                column("Volume", |b| b.volume),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Raw provider shape
// ---------------------------------------------------------------------------

/// A single untyped cell as delivered by a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

impl RawValue {
    /// Cast to f64. `Ok(None)` means missing (null, NaN, empty text);
    /// `Err` carries text that is not a number.
    fn to_f64(&self) -> Result<Option<f64>, String> {
        match self {
            Self::Number(n) if n.is_nan() => Ok(None),
            Self::Number(n) => Ok(Some(*n)),
            Self::Missing => Ok(None),
            Self::Text(s) => {
                let t = s.trim();
                if t.is_empty() || t.eq_ignore_ascii_case("nan") || t.eq_ignore_ascii_case("null")
                {
                    return Ok(None);
                }
                t.parse::<f64>()
                    .map(|v| if v.is_nan() { None } else { Some(v) })
                    .map_err(|_| s.clone())
            }
        }
    }
}

/// Column header: either a plain field name or a multi-level key such as
/// `["Close", "AAPL"]` from a per-ticker grouped download.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnName {
    Flat(String),
    Nested(Vec<String>),
}

impl ColumnName {
    /// The first-level field name.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Flat(name) => Some(name.as_str()),
            Self::Nested(levels) => levels.first().map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: ColumnName,
    pub values: Vec<RawValue>,
}

/// Date-indexed table as returned by a `MarketDataProvider`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub index: Vec<NaiveDate>,
    pub columns: Vec<RawColumn>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Collapse multi-level headers to their first level. When several
    /// columns flatten to the same field, the first one is kept.
    fn flatten(self) -> HashMap<String, Vec<RawValue>> {
        let mut flat: HashMap<String, Vec<RawValue>> = HashMap::new();
        for column in self.columns {
            let Some(field) = column.name.field() else {
                continue;
            };
            let field = field.trim().to_string();
            flat.entry(field).or_insert(column.values);
        }
        flat
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("required column '{0}' is missing")]
    MissingColumn(&'static str),

    #[error("column '{column}' has {found} values but the index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("column '{column}' row {row}: cannot cast '{value}' to float")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

/// Turn a provider result into a canonical `PriceSeries`.
///
/// Returns `Ok(None)` when the provider returned nothing, an empty table, or
/// a table in which every row has a missing OHLC value.
pub fn normalize(
    symbol: &str,
    raw: Option<RawTable>,
) -> Result<Option<PriceSeries>, NormalizeError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }

    let index = raw.index.clone();
    let rows = index.len();
    let mut flat = raw.flatten();

    let mut ohlc: Vec<Vec<RawValue>> = Vec::with_capacity(OHLC_FIELDS.len());
    for field in OHLC_FIELDS {
        let values = flat.remove(field).ok_or(NormalizeError::MissingColumn(field))?;
        check_len(field, rows, values.len())?;
        ohlc.push(values);
    }
    let volume = flat.remove(VOLUME_FIELD);
    if let Some(v) = &volume {
        check_len(VOLUME_FIELD, rows, v.len())?;
    }

    let mut bars = Vec::with_capacity(rows);
    let mut dropped = 0usize;

    for (row, date) in index.iter().enumerate() {
        let mut prices = [0.0f64; 4];
        let mut complete = true;
        for (slot, (field, values)) in OHLC_FIELDS.iter().zip(&ohlc).enumerate() {
            match cast(field, row, &values[row])? {
                Some(v) => prices[slot] = v,
                None => complete = false,
            }
        }
        if !complete {
            dropped += 1;
            continue;
        }

        let volume = match &volume {
            Some(values) => cast(VOLUME_FIELD, row, &values[row])?.unwrap_or(0.0),
            None => 0.0,
        };

        let [open, high, low, close] = prices;
        bars.push(PriceBar {
            date: *date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    // Stable sort keeps provider order among equal dates, so the dedup
    // below retains the last delivered bar for a date.
    bars.sort_by_key(|b| b.date);
    let before = bars.len();
    let mut unique: Vec<PriceBar> = Vec::with_capacity(before);
    for bar in bars {
        match unique.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => unique.push(bar),
        }
    }
    let duplicates = before - unique.len();

    if dropped > 0 || duplicates > 0 {
        debug!(symbol, dropped, duplicates, kept = unique.len(), "series cleaned");
    }

    if unique.is_empty() {
        return Ok(None);
    }

    Ok(Some(PriceSeries {
        symbol: symbol.to_string(),
        bars: unique,
    }))
}

fn check_len(column: &str, expected: usize, found: usize) -> Result<(), NormalizeError> {
    if expected == found {
        Ok(())
    } else {
        Err(NormalizeError::LengthMismatch {
            column: column.to_string(),
            expected,
            found,
        })
    }
}

fn cast(column: &str, row: usize, value: &RawValue) -> Result<Option<f64>, NormalizeError> {
    value.to_f64().map_err(|value| NormalizeError::NotNumeric {
        column: column.to_string(),
        row,
        value,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
