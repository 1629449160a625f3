// =============================================================================
// Breakout Detector — close outside the bands on the reference candle
// =============================================================================
//
// The reference candle is the second-to-last bar: the most recent *closed*
// session. The last bar is never evaluated because it may be today's
// still-forming bar or a stale repeat.
//
// Decision rule (strict inequalities, evaluated in order):
//   close > upper  -> Bullish
//   close < lower  -> Bearish
//   otherwise      -> no signal
//
// A series shorter than `period + 2` is skipped: that margin guarantees a
// fully defined band on the reference candle with one bar after it.
// =============================================================================

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use crate::indicators::BandSet;
use crate::market_data::PriceSeries;
use crate::runtime_config::ScanConfiguration;
use crate::types::SignalKind;

/// Why a symbol produced no result. Never shown to the user; logged and kept
/// on the scan report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("no data returned")]
    DataAbsent,

    #[error("insufficient history: {bars} bars, need {required}")]
    InsufficientHistory { bars: usize, required: usize },

    #[error("undefined band value on reference candle {date}")]
    UndefinedBandValue { date: NaiveDate },

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("malformed series: {0}")]
    MalformedSeries(String),
}

/// A normalized series together with its aligned bands. Shared by every
/// signal that refers to it so the chart can be drawn later.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedSeries {
    pub series: Arc<PriceSeries>,
    pub bands: BandSet,
}

/// A breakout on the reference candle.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub kind: SignalKind,
    pub close: f64,
    /// Upper band for bullish signals, lower band for bearish ones.
    pub reference_band: f64,
    pub signal_date: NaiveDate,
    pub source: Arc<AnalyzedSeries>,
}

/// Classify the reference candle of `analysis`.
///
/// `Ok(None)` means the close sat inside (or exactly on) the bands.
pub fn detect(
    analysis: &Arc<AnalyzedSeries>,
    config: &ScanConfiguration,
) -> Result<Option<Signal>, SkipReason> {
    let bars = analysis.series.bars();
    let required = config.period + 2;
    if bars.len() < required {
        return Err(SkipReason::InsufficientHistory {
            bars: bars.len(),
            required,
        });
    }

    let idx = bars.len() - 2;
    let candle = &bars[idx];
    let close = candle.close;

    let (upper, lower) = match analysis.bands.get(idx) {
        Some(p) => (p.upper, p.lower),
        None => (f64::NAN, f64::NAN),
    };
    if close.is_nan() || upper.is_nan() || lower.is_nan() {
        return Err(SkipReason::UndefinedBandValue { date: candle.date });
    }

    let (kind, reference_band) = if close > upper {
        (SignalKind::Bullish, upper)
    } else if close < lower {
        (SignalKind::Bearish, lower)
    } else {
        return Ok(None);
    };

    Ok(Some(Signal {
        symbol: analysis.series.symbol().to_string(),
        kind,
        close,
        reference_band,
        signal_date: candle.date,
        source: Arc::clone(analysis),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use crate::indicators::calculate_bollinger_series;
    use crate::market_data::PriceBar;

    fn config(period: usize, mult: f64) -> ScanConfiguration {
        ScanConfiguration {
            period,
            std_dev_multiplier: mult,
            symbols: vec![],
            lookback_days: 180,
            max_concurrent_fetches: 1,
        }
    }

    fn analyze(closes: &[f64], cfg: &ScanConfiguration) -> Arc<AnalyzedSeries> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                date: start + chrono::Days::new(i as u64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 0.0,
            })
            .collect();
        let series = Arc::new(PriceSeries::from_canonical("TEST", bars));
        let bands = calculate_bollinger_series(&series.closes(), cfg.period, cfg.std_dev_multiplier);
        Arc::new(AnalyzedSeries { series, bands })
    }

    #[test]
    fn scenario_a_spike_on_reference_candle_is_bullish() {
        // 20 bars at 100, spike to 130 on bar 20, back to 100 on bar 21.
        // Reference = bar 20, window = bars 1..=20: mean 101.5,
        // σ = sqrt(855/19) ≈ 6.708, upper ≈ 114.92.
        let cfg = config(20, 2.0);
        let mut closes = vec![100.0; 20];
        closes.push(130.0);
        closes.push(100.0);
        let analysis = analyze(&closes, &cfg);

        let signal = detect(&analysis, &cfg).unwrap().expect("bullish breakout");
        assert_eq!(signal.kind, SignalKind::Bullish);
        assert_eq!(signal.close, 130.0);
        let expected_upper = 101.5 + 2.0 * (855.0f64 / 19.0).sqrt();
        assert!((signal.reference_band - expected_upper).abs() < 1e-9);
        assert!(signal.close - signal.reference_band > 15.0);
        assert_eq!(signal.signal_date, analysis.series.bars()[20].date);
        assert_eq!(signal.symbol, "TEST");
    }

    #[test]
    fn scenario_b_drop_on_reference_candle_is_bearish() {
        let cfg = config(20, 2.0);
        let mut closes = vec![100.0; 20];
        closes.push(70.0);
        closes.push(100.0);
        let analysis = analyze(&closes, &cfg);

        let signal = detect(&analysis, &cfg).unwrap().expect("bearish breakout");
        assert_eq!(signal.kind, SignalKind::Bearish);
        let expected_lower = 98.5 - 2.0 * (855.0f64 / 19.0).sqrt();
        assert!((signal.reference_band - expected_lower).abs() < 1e-9);
        assert!(signal.close < signal.reference_band);
    }

    #[test]
    fn scenario_c_flat_series_never_signals() {
        let cfg = config(20, 2.0);
        let analysis = analyze(&vec![100.0; 40], &cfg);
        let p = analysis.bands.get(38).unwrap();
        assert_eq!(p.upper, p.moving_average);
        assert_eq!(p.lower, p.moving_average);
        assert_eq!(detect(&analysis, &cfg), Ok(None));
    }

    #[test]
    fn scenario_d_period_plus_one_bars_is_insufficient() {
        let cfg = config(20, 2.0);
        let mut closes = vec![100.0; 20];
        closes.push(500.0); // would be a massive breakout
        let analysis = analyze(&closes, &cfg);
        assert_eq!(
            detect(&analysis, &cfg),
            Err(SkipReason::InsufficientHistory { bars: 21, required: 22 })
        );
    }

    #[test]
    fn exactly_period_plus_two_is_enough() {
        let cfg = config(10, 2.0);
        let mut closes = vec![50.0; 10];
        closes.push(80.0);
        closes.push(50.0);
        let analysis = analyze(&closes, &cfg);
        assert!(detect(&analysis, &cfg).unwrap().is_some());
    }

    #[test]
    fn last_bar_breakout_is_ignored() {
        let cfg = config(20, 2.0);
        let mut closes = vec![100.0; 30];
        closes.push(200.0);
        let analysis = analyze(&closes, &cfg);
        assert_eq!(detect(&analysis, &cfg), Ok(None));
    }

    #[test]
    fn close_equal_to_band_is_not_a_signal() {
        // Hand-built bands so the close sits exactly on each band.
        let cfg = config(10, 2.0);
        let analysis = analyze(&vec![10.0; 15], &cfg);
        let idx = 13;
        let mut points = analysis.bands.points().to_vec();
        let base = points[idx].unwrap();

        points[idx] = Some(crate::indicators::BandPoint { upper: 10.0, lower: 5.0, ..base });
        let on_upper = Arc::new(AnalyzedSeries {
            series: Arc::clone(&analysis.series),
            bands: BandSet::from_points(10, 2.0, points.clone()),
        });
        assert_eq!(detect(&on_upper, &cfg), Ok(None));

        points[idx] = Some(crate::indicators::BandPoint { upper: 15.0, lower: 10.0, ..base });
        let on_lower = Arc::new(AnalyzedSeries {
            series: Arc::clone(&analysis.series),
            bands: BandSet::from_points(10, 2.0, points),
        });
        assert_eq!(detect(&on_lower, &cfg), Ok(None));
    }

    #[test]
    fn nan_close_on_reference_is_undefined() {
        let cfg = config(10, 2.0);
        let mut closes = vec![10.0; 15];
        closes[13] = f64::NAN;
        let analysis = analyze(&closes, &cfg);
        assert!(matches!(
            detect(&analysis, &cfg),
            Err(SkipReason::UndefinedBandValue { .. })
        ));
    }

    #[test]
    fn short_series_never_signals_regardless_of_shape() {
        let cfg = config(15, 1.0);
        for len in 0..(cfg.period + 2) {
            let closes: Vec<f64> = (0..len).map(|i| if i % 2 == 0 { 1.0 } else { 1_000.0 }).collect();
            let analysis = analyze(&closes, &cfg);
            assert!(matches!(
                detect(&analysis, &cfg),
                Err(SkipReason::InsufficientHistory { .. })
            ));
        }
    }

    #[test]
    fn detection_is_deterministic() {
        let cfg = config(20, 2.0);
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let n = closes.len();
        closes[n - 2] = 120.0;
        let analysis = analyze(&closes, &cfg);
        let first = detect(&analysis, &cfg);
        for _ in 0..10 {
            assert_eq!(detect(&analysis, &cfg), first);
        }
        assert_eq!(first.unwrap().unwrap().kind, SignalKind::Bullish);
    }
}
