// =============================================================================
// Symbol Lists — parsing and built-in universes
// =============================================================================
//
// A symbol list is plain text: tickers separated by whitespace and/or commas.
// Entries are trimmed and upper-cased; blanks are dropped. Order is preserved
// and duplicates are kept (each occurrence is scanned independently).
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::types::Universe;

const DEFAULT_EQUITIES: &[&str] = &[
    "AAPL", "MSFT", "NVDA", "META", "GOOGL", "AMZN", "TSLA", "NFLX", "AMD", "INTC", "CRM",
    "ORCL", "ADBE", "JPM", "BAC", "GS", "XOM", "CVX", "KO", "PEP", "DIS", "WMT", "COST", "SPY",
    "QQQ", "IWM",
];

const DEFAULT_FUTURES: &[&str] = &[
    "ES=F", "NQ=F", "YM=F", "RTY=F", "CL=F", "NG=F", "GC=F", "SI=F", "HG=F", "ZB=F", "ZN=F",
    "EURUSD=X", "GBPUSD=X", "USDJPY=X", "AUDUSD=X", "USDCHF=X", "^GSPC", "^NDX", "^DJI",
    "^RUT", "^VIX",
];

/// Parse a free-form symbol list.
pub fn parse_symbol_list(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// Read and parse a symbol list file.
pub fn load_symbol_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read symbol list from {}", path.display()))?;
    let symbols = parse_symbol_list(&content);
    info!(path = %path.display(), count = symbols.len(), "symbol list loaded");
    Ok(symbols)
}

/// The fixed default list for a universe.
pub fn default_universe(universe: Universe) -> Vec<String> {
    let list = match universe {
        Universe::Equities => DEFAULT_EQUITIES,
        Universe::Futures => DEFAULT_FUTURES,
    };
    list.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_commas_and_whitespace() {
        let parsed = parse_symbol_list("aapl, msft\nnvda\t,, spy  ");
        assert_eq!(parsed, vec!["AAPL", "MSFT", "NVDA", "SPY"]);
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(parse_symbol_list("  ,\n , ").is_empty());
        assert!(parse_symbol_list("").is_empty());
    }

    #[test]
    fn duplicates_are_kept_in_order() {
        let parsed = parse_symbol_list("spy,QQQ,Spy");
        assert_eq!(parsed, vec!["SPY", "QQQ", "SPY"]);
    }

    #[test]
    fn symbols_with_punctuation_survive() {
        let parsed = parse_symbol_list("es=f ^gspc brk-b");
        assert_eq!(parsed, vec!["ES=F", "^GSPC", "BRK-B"]);
    }

    #[test]
    fn default_universes_are_distinct() {
        let eq = default_universe(Universe::Equities);
        let fut = default_universe(Universe::Futures);
        assert_eq!(eq.len(), 26);
        assert_eq!(eq[0], "AAPL");
        assert_eq!(eq[25], "IWM");
        assert!(fut.contains(&"ES=F".to_string()));
        assert!(!fut.contains(&"AAPL".to_string()));
    }

    #[test]
    fn load_symbol_file_reads_and_parses() {
        let path = std::env::temp_dir().join(format!("symbols-{}.txt", uuid::Uuid::new_v4()));
        std::fs::write(&path, "aapl,msft\n\ntsla\n").unwrap();
        let symbols = load_symbol_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "TSLA"]);
    }

    #[test]
    fn load_symbol_file_missing_is_error() {
        assert!(load_symbol_file("/definitely/not/here.txt").is_err());
    }
}
