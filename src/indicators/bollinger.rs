// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ). σ is the *sample* standard deviation of the
// trailing window (denominator `period - 1`).
//
// The band set is aligned 1:1 with the close series; the first `period - 1`
// points have no value because the window is incomplete.

/// Band values for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPoint {
    pub moving_average: f64,
    pub std_dev: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Per-bar Bollinger values aligned with a price series.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSet {
    period: usize,
    num_std: f64,
    points: Vec<Option<BandPoint>>,
}

impl BandSet {
    pub fn period(&self) -> usize {
        self.period
    }

    pub fn num_std(&self) -> f64 {
        self.num_std
    }

    /// Band values at `index`, `None` where the window is incomplete or
    /// out of range.
    pub fn get(&self, index: usize) -> Option<BandPoint> {
        self.points.get(index).copied().flatten()
    }

    pub fn points(&self) -> &[Option<BandPoint>] {
        &self.points
    }

    #[cfg(test)]
    pub fn from_points(period: usize, num_std: f64, points: Vec<Option<BandPoint>>) -> Self {
        Self {
            period,
            num_std,
            points,
        }
    }
}

/// Sample standard deviation (n - 1 denominator). `None` for fewer than two
/// values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Calculate rolling Bollinger Bands over every bar of `closes`.
///
/// A point is `None` when:
/// - its index is below `period - 1` (incomplete window),
/// - any close in its window is non-finite.
///
/// `period` below 2 yields an all-`None` set since σ is undefined.
pub fn calculate_bollinger_series(closes: &[f64], period: usize, num_std: f64) -> BandSet {
    let mut points = vec![None; closes.len()];

    if period >= 2 && closes.len() >= period {
        for end in (period - 1)..closes.len() {
            let window = &closes[end + 1 - period..=end];
            if window.iter().any(|x| !x.is_finite()) {
                continue;
            }
            let moving_average = window.iter().sum::<f64>() / period as f64;
            let Some(std_dev) = sample_std_dev(window) else {
                continue;
            };
            points[end] = Some(BandPoint {
                moving_average,
                std_dev,
                upper: moving_average + num_std * std_dev,
                lower: moving_average - num_std * std_dev,
            });
        }
    }

    BandSet {
        period,
        num_std,
        points,
    }
}
