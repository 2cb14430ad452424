//! Utilities module for logging, errors, and number formatting
//!
//! This module provides:
//! - The error type shared by all stages
//! - Structured logging with tracing and the buffered run log
//! - Rounding and duration helpers used in log lines

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{Result, ShadowError};
pub use logging::{init_logging, LogConfig, RunLogger};

/// Round half away from zero to `places` decimals
///
/// Formatting the result with `{}` prints the shortest representation,
/// so `round_decimals(0.5, 4)` renders as `0.5`.
pub fn round_decimals(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Format a duration in a human-readable way
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0).floor();
        let secs = seconds % 60.0;
        format!("{}m {:.0}s", minutes as u32, secs)
    } else {
        let hours = (seconds / 3600.0).floor();
        let minutes = ((seconds % 3600.0) / 60.0).floor();
        format!("{}h {}m", hours as u32, minutes as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_decimals() {
        assert_eq!(round_decimals(0.123456, 4), 0.1235);
        assert_eq!(round_decimals(1.005, 0), 1.0);
        assert_eq!(format!("{}", round_decimals(0.5, 4)), "0.5");
        assert_eq!(format!("{}", round_decimals(12.3456, 2)), "12.35");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.5), "30.5s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m");
    }
}
