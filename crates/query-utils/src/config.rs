//! Engine configuration

use serde::{Deserialize, Serialize};

/// Tunable bounds for parameter validation
///
/// Hosts embedding the engine can deserialize this from their own config
/// files; the defaults match the production rules for A-share queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of stocks a single query may target
    pub max_stocks_per_query: usize,
    /// Smallest accepted result limit
    pub min_limit: i64,
    /// Largest accepted result limit
    pub max_limit: i64,
    /// Maximum span of a date range, in days
    pub max_date_range_days: i64,
    /// Earliest queryable date (ISO format)
    pub earliest_date: String,
    /// Result limit applied when the query names none
    pub default_limit: i64,
    /// Window applied when a K-line query names no range, in days
    pub default_kline_window_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_stocks_per_query: 10,
            min_limit: 1,
            max_limit: 999,
            max_date_range_days: 3650,
            earliest_date: "1990-01-01".to_string(),
            default_limit: 10,
            default_kline_window_days: 90,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let config = EngineConfig::default();
        assert_eq!(config.max_stocks_per_query, 10);
        assert_eq!(config.max_limit, 999);
        assert_eq!(config.earliest_date, "1990-01-01");
    }

    #[test]
    fn test_round_trip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let back: EngineConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.max_date_range_days, config.max_date_range_days);
    }
}
