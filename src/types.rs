// =============================================================================
// Shared types used across the scanner
// =============================================================================

use serde::{Deserialize, Serialize};

/// Direction of a Bollinger breakout on the reference candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    /// Close strictly above the upper band.
    Bullish,
    /// Close strictly below the lower band.
    Bearish,
}

impl SignalKind {
    /// Label used in chart titles.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bullish => "Bullish breakout",
            Self::Bearish => "Bearish breakout",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
        }
    }
}

/// Built-in symbol universe used when no explicit list is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Universe {
    /// Large-cap US equities and broad ETFs.
    Equities,
    /// Index futures, commodities, FX pairs and cash indices.
    Futures,
}

impl Default for Universe {
    fn default() -> Self {
        Self::Equities
    }
}

impl std::fmt::Display for Universe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equities => write!(f, "Equities"),
            Self::Futures => write!(f, "Futures"),
        }
    }
}
