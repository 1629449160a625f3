// =============================================================================
// Yahoo Finance Chart Client — daily OHLCV over the public v8 endpoint
// =============================================================================
//
// GET /v8/finance/chart/{symbol}?interval=1d&period1=..&period2=..
//
// Bars come back as parallel arrays (timestamp + quote.open/high/...), with
// `null` where the exchange had no print. Those nulls are preserved as
// missing cells; the normalizer decides what to drop.
//
// Timestamps are session opens in UTC. Adding `meta.gmtoffset` gives the
// exchange-local calendar date, which is what a daily bar is keyed by.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::market_data::{ColumnName, FetchWindow, MarketDataProvider, RawColumn, RawTable, RawValue};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";

// -----------------------------------------------------------------------------
// Response shape
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

// -----------------------------------------------------------------------------
// Client
// -----------------------------------------------------------------------------

/// Yahoo Finance daily-bar provider.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        debug!(base_url = DEFAULT_BASE_URL, "YahooClient initialised");

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        }
    }

    /// GET /v8/finance/chart/{symbol} for daily bars in `window`.
    #[instrument(skip(self), name = "yahoo::fetch_daily")]
    pub async fn fetch_daily(&self, symbol: &str, window: FetchWindow) -> Result<Option<RawTable>> {
        let mut url = reqwest::Url::parse(&format!("{}/v8/finance/chart", self.base_url))
            .context("invalid Yahoo base URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Yahoo base URL cannot carry a path"))?
            .push(symbol);

        let period1 = window.start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = window.end.and_time(NaiveTime::MIN).and_utc().timestamp();

        let resp = self
            .client
            .get(url)
            .query(&[
                ("interval", "1d".to_string()),
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("events", "div,splits".to_string()),
            ])
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("failed to read chart response body")?;

        let table = parse_chart_response(status, &body)
            .with_context(|| format!("Yahoo chart for {symbol} returned {status}"))?;

        debug!(
            symbol,
            rows = table.as_ref().map_or(0, |t| t.index.len()),
            "chart fetched"
        );
        Ok(table)
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch(&self, symbol: &str, window: FetchWindow) -> Result<Option<RawTable>> {
        self.fetch_daily(symbol, window).await
    }
}

// -----------------------------------------------------------------------------
// Parsing
// -----------------------------------------------------------------------------

/// Turn a chart response into a flat raw table.
///
/// `Ok(None)` for unknown symbols (404 / "Not Found") and for empty ranges.
fn parse_chart_response(status: StatusCode, body: &str) -> Result<Option<RawTable>> {
    let envelope: ChartEnvelope = match serde_json::from_str(body) {
        Ok(env) => env,
        Err(_) if status == StatusCode::NOT_FOUND => return Ok(None),
        Err(e) => {
            if !status.is_success() {
                anyhow::bail!("HTTP {status}: {}", truncate(body, 200));
            }
            return Err(e).context("failed to parse chart response");
        }
    };

    if let Some(err) = envelope.chart.error {
        if status == StatusCode::NOT_FOUND || err.code.eq_ignore_ascii_case("Not Found") {
            debug!(code = %err.code, description = %err.description, "symbol not found");
            return Ok(None);
        }
        anyhow::bail!("Yahoo API error: {} - {}", err.code, err.description);
    }
    if !status.is_success() {
        anyhow::bail!("HTTP {status}: {}", truncate(body, 200));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(None);
    };
    if result.timestamp.is_empty() {
        return Ok(None);
    }

    let offset = result.meta.gmtoffset;
    let index = result
        .timestamp
        .iter()
        .map(|&ts| {
            DateTime::from_timestamp(ts + offset, 0)
                .map(|dt| dt.date_naive())
                .with_context(|| format!("timestamp {ts} out of range"))
        })
        .collect::<Result<Vec<NaiveDate>>>()?;

    let rows = index.len();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let column = |name: &str, values: Vec<Option<f64>>| RawColumn {
        name: ColumnName::Flat(name.to_string()),
        values: pad(values, rows),
    };

    let mut columns = vec![
        column("Open", quote.open),
        column("High", quote.high),
        column("Low", quote.low),
        column("Close", quote.close),
    ];
    if let Some(adj) = result.indicators.adjclose.into_iter().next() {
        columns.push(column("Adj Close", adj.adjclose));
    }
    columns.push(column("Volume", quote.volume));

    Ok(Some(RawTable { index, columns }))
}

/// Align a value array with the timestamp index. Short arrays are padded
/// with missing cells, long ones truncated.
fn pad(values: Vec<Option<f64>>, rows: usize) -> Vec<RawValue> {
    let mut out: Vec<RawValue> = values
        .into_iter()
        .take(rows)
        .map(|v| v.map_or(RawValue::Missing, RawValue::Number))
        .collect();
    out.resize(rows, RawValue::Missing);
    out
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
