// =============================================================================
// Bollinger Breakout Scanner — Main Entry Point
// =============================================================================
//
// Loads the scanner config, runs one scan over the configured universe and
// prints the bullish/bearish tables. With `rescan_interval_secs` set the scan
// repeats until Ctrl+C, reusing the fetch cache between runs.
//
// Tables and chart JSON go to stdout; logs go to stderr.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod breakout;
mod indicators;
mod market_data;
mod presentation;
mod runtime_config;
mod scanner;
mod symbols;
mod types;
mod yahoo;

use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::market_data::MarketDataProvider;
use crate::runtime_config::ScannerConfig;
use crate::scanner::Scanner;
use crate::yahoo::YahooClient;

const DEFAULT_CONFIG_PATH: &str = "scanner_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path =
        std::env::var("SCANNER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = ScannerConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        ScannerConfig::default()
    });
    config.apply_env();

    // ── 2. Scanner ───────────────────────────────────────────────────────
    let client = YahooClient::new();
    info!(client = ?client, "Market data provider ready");
    let scanner = Scanner::new(client, Duration::from_secs(config.cache_ttl_secs));

    let Some(every) = config.rescan_interval_secs.filter(|s| *s > 0) else {
        return run_scan(&scanner, &config).await;
    };

    // ── 3. Periodic rescans ──────────────────────────────────────────────
    info!(interval_secs = every, "Periodic rescan enabled. Press Ctrl+C to stop.");
    let mut interval = tokio::time::interval(Duration::from_secs(every));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                rescan_tick(&scanner, &config).await;
            }
            res = tokio::signal::ctrl_c() => {
                res.context("failed to listen for Ctrl+C")?;
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

/// One periodic iteration. A failed scan is logged and the loop keeps going;
/// returns whether the scan succeeded.
async fn rescan_tick<P: MarketDataProvider>(scanner: &Scanner<P>, config: &ScannerConfig) -> bool {
    let evicted = scanner.cache().evict_expired();
    info!(evicted, cached = scanner.cache().len(), "Cache maintenance");
    match run_scan(scanner, config).await {
        Ok(()) => true,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Scan failed, retrying next interval");
            false
        }
    }
}

/// One full scan: resolve the run configuration, scan, print.
async fn run_scan<P: MarketDataProvider>(
    scanner: &Scanner<P>,
    config: &ScannerConfig,
) -> anyhow::Result<()> {
    let scan_config = config.scan_configuration()?;
    let today = chrono::Local::now().date_naive();

    let report = scanner.scan(&scan_config, today).await;

    println!("{}", presentation::render_tables(&report));
    info!(
        run_id = %report.run_id,
        scanned_at = %report.scanned_at,
        signals = report.signal_count(),
        no_breakout = report.no_breakout.len(),
        "Scan results printed"
    );

    if let Some(symbol) = &config.chart_symbol {
        match presentation::select_chart(&report, symbol) {
            Some(signal) => {
                let payload = presentation::chart_payload(signal);
                let json = serde_json::to_string_pretty(&payload)
                    .context("failed to serialise chart payload")?;
                println!("{json}");
            }
            None => warn!(symbol = %symbol, "No signal to chart for requested symbol"),
        }
    }

    Ok(())
}
