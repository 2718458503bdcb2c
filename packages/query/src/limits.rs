//! Input limits and orchestrator settings.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_LIMITS_TOML: &str = include_str!("../limits.toml");

/// Default per-query timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from loading [`QueryLimits`].
#[derive(Debug, Error)]
pub enum LimitsError {
    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A range is empty or starts below one.
    #[error("Invalid limits: {0}")]
    Invalid(String),
}

/// Accepted ranges for prediction inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QueryLimits {
    /// Earliest accepted year.
    pub year_min: i32,
    /// Latest accepted year.
    pub year_max: i32,
    /// Most victims accepted.
    pub victims_max: u32,
    /// Most suspects accepted.
    pub suspects_max: u32,
}

impl QueryLimits {
    /// Returns the embedded limits (years 2020-2030, up to 50 victims and
    /// 20 suspects).
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed.
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml_str(DEFAULT_LIMITS_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded query limits: {e}"))
    }

    /// Parses limits from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`LimitsError`] if the TOML is malformed or a range is
    /// empty.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, LimitsError> {
        let limits: Self = toml::de::from_str(toml_str)?;
        if limits.year_min > limits.year_max {
            return Err(LimitsError::Invalid(format!(
                "year_min {} is after year_max {}",
                limits.year_min, limits.year_max
            )));
        }
        if limits.victims_max == 0 || limits.suspects_max == 0 {
            return Err(LimitsError::Invalid(
                "victims_max and suspects_max must be at least 1".to_string(),
            ));
        }
        Ok(limits)
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self::embedded()
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// Input limits.
    pub limits: QueryLimits,
    /// Bound on each backend request.
    pub timeout: Duration,
}

impl QueryConfig {
    /// Creates a configuration.
    #[must_use]
    pub const fn new(limits: QueryLimits, timeout: Duration) -> Self {
        Self { limits, timeout }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self::new(QueryLimits::embedded(), DEFAULT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_limits_parse() {
        let limits = QueryLimits::embedded();
        assert_eq!(limits.year_min, 2020);
        assert_eq!(limits.year_max, 2030);
        assert_eq!(limits.victims_max, 50);
        assert_eq!(limits.suspects_max, 20);
    }

    #[test]
    fn rejects_inverted_year_range() {
        let err = QueryLimits::from_toml_str(
            "year_min = 2030\nyear_max = 2020\nvictims_max = 5\nsuspects_max = 5\n",
        )
        .unwrap_err();
        assert!(matches!(err, LimitsError::Invalid(_)));
    }

    #[test]
    fn rejects_missing_fields() {
        let err = QueryLimits::from_toml_str("year_min = 2020\n").unwrap_err();
        assert!(matches!(err, LimitsError::Toml(_)));
    }
}
