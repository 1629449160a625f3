// =============================================================================
// Presentation — result tables and chart payload
// =============================================================================
//
// Plain text tables for the terminal, and a JSON-serialisable chart payload
// (candles + band overlays + signal marker) for an external renderer.
// =============================================================================

use chrono::NaiveDate;
use serde::Serialize;

use crate::breakout::Signal;
use crate::indicators::BandPoint;
use crate::market_data::PriceBar;
use crate::scanner::ScanReport;
use crate::types::SignalKind;

const DATE_FORMAT: &str = "%d/%m/%Y";
const EMPTY_SECTION: &str = "No signal found.";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Render both result sections, bullish first.
pub fn render_tables(report: &ScanReport) -> String {
    let mut out = String::new();
    out.push_str(&render_section("Bullish breakouts", "Upper", &report.bullish));
    out.push('\n');
    out.push_str(&render_section("Bearish breakouts", "Lower", &report.bearish));
    out
}

fn render_section(title: &str, band_header: &str, signals: &[Signal]) -> String {
    let mut out = format!("{title}\n");
    if signals.is_empty() {
        out.push_str(EMPTY_SECTION);
        out.push('\n');
        return out;
    }

    let header = ["Symbol", "Close", band_header, "Date"].map(str::to_string);
    let rows: Vec<[String; 4]> = signals
        .iter()
        .map(|s| {
            [
                s.symbol.clone(),
                format!("{:.2}", s.close),
                format!("{:.2}", s.reference_band),
                format_date(s.signal_date),
            ]
        })
        .collect();

    let mut widths = header.clone().map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String; 4]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, w))| match i {
                // Numbers right-aligned, text left-aligned.
                1 | 2 => format!("{cell:>w$}"),
                _ => format!("{cell:<w$}"),
            })
            .collect();
        format!("{}\n", padded.join(" | ").trim_end())
    };

    out.push_str(&line(&header));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("{}\n", rule.join("-+-")));
    for row in &rows {
        out.push_str(&line(row));
    }
    out
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

/// Everything a candlestick renderer needs for one signal.
#[derive(Debug, Serialize)]
pub struct ChartPayload<'a> {
    pub title: String,
    pub symbol: &'a str,
    pub kind: SignalKind,
    pub period: usize,
    pub num_std: f64,
    pub signal_date: NaiveDate,
    pub candles: &'a [PriceBar],
    /// Band series aligned with `candles`; `null` where undefined.
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    pub moving_average: Vec<Option<f64>>,
}

pub fn chart_payload(signal: &Signal) -> ChartPayload<'_> {
    let bands = &signal.source.bands;
    let series_of = |f: fn(&BandPoint) -> f64| -> Vec<Option<f64>> {
        bands.points().iter().map(|p| p.as_ref().map(f)).collect()
    };

    ChartPayload {
        title: format!(
            "{} – {} ({})",
            signal.symbol,
            signal.kind.label(),
            format_date(signal.signal_date)
        ),
        symbol: &signal.symbol,
        kind: signal.kind,
        period: bands.period(),
        num_std: bands.num_std(),
        signal_date: signal.signal_date,
        candles: signal.source.series.bars(),
        upper: series_of(|p| p.upper),
        lower: series_of(|p| p.lower),
        moving_average: series_of(|p| p.moving_average),
    }
}

/// Pick the signal to chart for `symbol` (case-insensitive). Bullish signals
/// are searched before bearish ones and the first match wins.
pub fn select_chart<'a>(report: &'a ScanReport, symbol: &str) -> Option<&'a Signal> {
    report
        .selectable()
        .find(|s| s.symbol.eq_ignore_ascii_case(symbol.trim()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
