// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator implementations. Undefined values are
// `Option::None` so callers must handle insufficient-data cases.

pub mod bollinger;

pub use bollinger::{calculate_bollinger_series, BandPoint, BandSet};
