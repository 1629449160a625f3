// =============================================================================
// Runtime Configuration — scanner settings from JSON + environment
// =============================================================================
//
// All fields carry `#[serde(default)]` so a partial (or empty) JSON file
// loads. Environment variables override the file. The UI-bound parameters
// (period, σ multiplier) are clamped into range rather than rejected.
//
// `ScannerConfig` is the mutable, loadable shape. A scan never reads it
// directly: it receives an immutable `ScanConfiguration` built once per run.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::market_data::provider::MIN_LOOKBACK_DAYS;
use crate::symbols;
use crate::types::Universe;

pub const PERIOD_MIN: usize = 10;
pub const PERIOD_MAX: usize = 50;
pub const STD_DEV_MIN: f64 = 1.0;
pub const STD_DEV_MAX: f64 = 3.0;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_period() -> usize {
    20
}

fn default_std_dev_multiplier() -> f64 {
    2.0
}

fn default_lookback_days() -> u32 {
    MIN_LOOKBACK_DAYS
}

fn default_max_concurrent_fetches() -> usize {
    1
}

fn default_cache_ttl_secs() -> u64 {
    900
}

// =============================================================================
// ScanConfiguration
// =============================================================================

/// Immutable parameters for one scan run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfiguration {
    /// Bollinger window length, 10..=50.
    pub period: usize,
    /// Band width in standard deviations, 1.0..=3.0.
    pub std_dev_multiplier: f64,
    /// Symbols in scan order. Duplicates are scanned independently.
    pub symbols: Vec<String>,
    pub lookback_days: u32,
    /// 1 = strictly sequential.
    pub max_concurrent_fetches: usize,
}

// =============================================================================
// ScannerConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    // --- Band parameters ------------------------------------------------------

    #[serde(default = "default_period")]
    pub period: usize,

    #[serde(default = "default_std_dev_multiplier")]
    pub std_dev_multiplier: f64,

    // --- Symbols ---------------------------------------------------------------

    /// Built-in list used when neither `symbols` nor `symbols_file` is set.
    #[serde(default)]
    pub universe: Universe,

    /// Explicit symbol list; takes precedence over `symbols_file`.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,

    /// Plain-text symbol list (comma and/or whitespace separated).
    #[serde(default)]
    pub symbols_file: Option<PathBuf>,

    /// When an explicit list parses to nothing, scan the default universe
    /// instead of running an empty scan.
    #[serde(default)]
    pub fallback_to_default_on_empty: bool,

    // --- Fetching --------------------------------------------------------------

    /// Calendar days of history requested per symbol (minimum 180).
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Repeat the scan every N seconds. Unset = single run.
    #[serde(default)]
    pub rescan_interval_secs: Option<u64>,

    // --- Presentation ----------------------------------------------------------

    /// Emit the chart payload for this symbol after the tables.
    #[serde(default)]
    pub chart_symbol: Option<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            std_dev_multiplier: default_std_dev_multiplier(),
            universe: Universe::default(),
            symbols: None,
            symbols_file: None,
            fallback_to_default_on_empty: false,
            lookback_days: default_lookback_days(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            cache_ttl_secs: default_cache_ttl_secs(),
            rescan_interval_secs: None,
            chart_symbol: None,
        }
    }
}

impl ScannerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scanner config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse scanner config from {}", path.display()))?;

        info!(
            path = %path.display(),
            period = config.period,
            std_dev_multiplier = config.std_dev_multiplier,
            universe = %config.universe,
            "scanner config loaded"
        );

        Ok(config)
    }

    /// Apply `SCANNER_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(list) = var("SCANNER_SYMBOLS") {
            self.symbols = Some(symbols::parse_symbol_list(&list));
        }
        if let Some(path) = var("SCANNER_SYMBOLS_FILE") {
            self.symbols_file = Some(PathBuf::from(path));
        }
        if let Some(raw) = var("SCANNER_PERIOD") {
            match raw.trim().parse::<usize>() {
                Ok(p) => self.period = p,
                Err(e) => warn!(value = %raw, error = %e, "ignoring invalid SCANNER_PERIOD"),
            }
        }
        if let Some(raw) = var("SCANNER_STD_DEV") {
            match raw.trim().parse::<f64>() {
                Ok(k) => self.std_dev_multiplier = k,
                Err(e) => warn!(value = %raw, error = %e, "ignoring invalid SCANNER_STD_DEV"),
            }
        }
        if let Some(sym) = var("SCANNER_CHART_SYMBOL") {
            let sym = sym.trim().to_uppercase();
            self.chart_symbol = (!sym.is_empty()).then_some(sym);
        }
    }

    /// Resolve the scan universe: explicit list, then list file, then the
    /// built-in default.
    pub fn resolve_symbols(&self) -> Result<Vec<String>> {
        let explicit = match (&self.symbols, &self.symbols_file) {
            (Some(list), _) => Some(
                list.iter()
                    .flat_map(|s| symbols::parse_symbol_list(s))
                    .collect::<Vec<_>>(),
            ),
            (None, Some(path)) => Some(symbols::load_symbol_file(path)?),
            (None, None) => None,
        };

        match explicit {
            Some(list) if !list.is_empty() => Ok(list),
            Some(_) if self.fallback_to_default_on_empty => {
                warn!(universe = %self.universe, "symbol list is empty, using default universe");
                Ok(symbols::default_universe(self.universe))
            }
            Some(_) => {
                warn!("symbol list is empty, scan will produce no results");
                Ok(Vec::new())
            }
            None => Ok(symbols::default_universe(self.universe)),
        }
    }

    /// Build the immutable per-run configuration, clamping UI-bound values.
    pub fn scan_configuration(&self) -> Result<ScanConfiguration> {
        Ok(ScanConfiguration {
            period: clamp_period(self.period),
            std_dev_multiplier: clamp_std_dev(self.std_dev_multiplier),
            symbols: self.resolve_symbols()?,
            lookback_days: self.lookback_days.max(MIN_LOOKBACK_DAYS),
            max_concurrent_fetches: self.max_concurrent_fetches.max(1),
        })
    }
}

fn clamp_period(period: usize) -> usize {
    let clamped = period.clamp(PERIOD_MIN, PERIOD_MAX);
    if clamped != period {
        warn!(requested = period, used = clamped, "period clamped");
    }
    clamped
}

/// Clamp into 1.0..=3.0 and snap to the 0.1 step.
fn clamp_std_dev(k: f64) -> f64 {
    let base = if k.is_finite() { k } else { default_std_dev_multiplier() };
    let clamped = ((base.clamp(STD_DEV_MIN, STD_DEV_MAX) * 10.0).round()) / 10.0;
    if (clamped - k).abs() > 1e-9 {
        warn!(requested = k, used = clamped, "std_dev_multiplier clamped");
    }
    clamped
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = ScannerConfig::default();
        assert_eq!(cfg.period, 20);
        assert!((cfg.std_dev_multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(cfg.universe, Universe::Equities);
        assert_eq!(cfg.lookback_days, 180);
        assert_eq!(cfg.max_concurrent_fetches, 1);
        assert!(cfg.symbols.is_none());
        assert!(!cfg.fallback_to_default_on_empty);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: ScannerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.period, 20);
        assert_eq!(cfg.cache_ttl_secs, 900);
        assert!(cfg.rescan_interval_secs.is_none());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "period": 30, "universe": "Futures", "symbols": ["es=f", "cl=f"] }"#;
        let cfg: ScannerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.period, 30);
        assert_eq!(cfg.universe, Universe::Futures);
        assert!((cfg.std_dev_multiplier - 2.0).abs() < f64::EPSILON);
        let scan = cfg.scan_configuration().unwrap();
        assert_eq!(scan.symbols, vec!["ES=F", "CL=F"]);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = ScannerConfig {
            period: 5,
            std_dev_multiplier: 3.7,
            lookback_days: 30,
            max_concurrent_fetches: 0,
            ..ScannerConfig::default()
        };
        let scan = cfg.scan_configuration().unwrap();
        assert_eq!(scan.period, 10);
        assert!((scan.std_dev_multiplier - 3.0).abs() < 1e-12);
        assert_eq!(scan.lookback_days, 180);
        assert_eq!(scan.max_concurrent_fetches, 1);

        assert_eq!(clamp_period(99), 50);
        assert!((clamp_std_dev(0.2) - 1.0).abs() < 1e-12);
        assert!((clamp_std_dev(f64::NAN) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn std_dev_snaps_to_tenths() {
        assert!((clamp_std_dev(2.26) - 2.3).abs() < 1e-12);
        assert!((clamp_std_dev(1.5) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn no_list_uses_default_universe() {
        let cfg = ScannerConfig {
            universe: Universe::Futures,
            ..ScannerConfig::default()
        };
        let symbols = cfg.resolve_symbols().unwrap();
        assert_eq!(symbols, symbols::default_universe(Universe::Futures));
    }

    #[test]
    fn empty_list_yields_empty_scan_by_default() {
        let cfg = ScannerConfig {
            symbols: Some(vec![" , ".to_string()]),
            ..ScannerConfig::default()
        };
        assert!(cfg.resolve_symbols().unwrap().is_empty());
    }

    #[test]
    fn empty_list_falls_back_when_enabled() {
        let cfg = ScannerConfig {
            symbols: Some(vec![]),
            fallback_to_default_on_empty: true,
            ..ScannerConfig::default()
        };
        assert_eq!(
            cfg.resolve_symbols().unwrap(),
            symbols::default_universe(Universe::Equities)
        );
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SCANNER_SYMBOLS", "tsla, nvda"),
            ("SCANNER_PERIOD", "25"),
            ("SCANNER_STD_DEV", "not-a-number"),
            ("SCANNER_CHART_SYMBOL", " nvda "),
        ]);
        let mut cfg = ScannerConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.symbols, Some(vec!["TSLA".to_string(), "NVDA".to_string()]));
        assert_eq!(cfg.period, 25);
        assert!((cfg.std_dev_multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(cfg.chart_symbol.as_deref(), Some("NVDA"));
    }

    #[test]
    fn load_reads_json_file() {
        let path = std::env::temp_dir().join(format!("scanner-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{ "std_dev_multiplier": 2.5 }"#).unwrap();
        let cfg = ScannerConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!((cfg.std_dev_multiplier - 2.5).abs() < f64::EPSILON);
        assert!(ScannerConfig::load("/no/such/scanner.json").is_err());
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = ScannerConfig {
            chart_symbol: Some("AAPL".into()),
            ..ScannerConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: ScannerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.period, cfg2.period);
        assert_eq!(cfg.chart_symbol, cfg2.chart_symbol);
        assert_eq!(cfg.universe, cfg2.universe);
    }
}
