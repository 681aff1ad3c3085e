use std::{convert::TryFrom, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::LoggerError;

/// Wrapper around a `tracing_subscriber::EnvFilter` expression.
///
/// This type is used at the configuration layer:
/// - It stores the raw filter string (e.g. `"info"`, `"drover_core=debug,info"`).
/// - It validates the value using `EnvFilter::try_new` when parsing from config / user input.
/// - It can be converted into an actual `EnvFilter` on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    /// Creates a new `LoggerLevel` from a string-like value.
    ///
    /// This is a convenience wrapper around [`TryFrom<String>`].
    ///
    /// # Examples
    /// ```
    /// use drover_observe::LoggerLevel;
    ///
    /// let lvl = LoggerLevel::new("info").unwrap();
    /// assert_eq!(lvl.as_str(), "info");
    /// ```
    pub fn new(s: impl Into<String>) -> Result<Self, LoggerError> {
        Self::try_from(s.into())
    }

    /// Returns the underlying filter string as `&str`.
    ///
    /// This is exactly what was provided in config
    /// (e.g. `"info"` or `"drover_queue=trace,drover_core=debug,info"`).
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the underlying string into a `tracing_subscriber::EnvFilter`.
    ///
    /// # Examples
    /// ```
    /// use drover_observe::LoggerLevel;
    ///
    /// let lvl = "drover_core=debug,info".parse::<LoggerLevel>().unwrap();
    /// let _ = lvl.to_env_filter();
    /// ```
    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(self.as_str()).expect("LoggerLevel is always valid after construction")
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self::try_from("info".to_string()).expect("default log level must be valid")
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        EnvFilter::try_new(&s).map_err(|e| LoggerError::InvalidLevel(format!("{s}: {e}")))?;
        Ok(Self(s))
    }
}

impl From<LoggerLevel> for String {
    fn from(level: LoggerLevel) -> Self {
        level.0
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_info() {
        assert_eq!(LoggerLevel::default().as_str(), "info");
    }

    #[test]
    fn accepts_valid_filter_expressions() {
        for expr in ["info", "warn", "drover_core=debug,info", "trace"] {
            let lvl: LoggerLevel = expr.parse().expect("valid expression");
            assert_eq!(lvl.as_str(), expr);
        }
    }

    #[test]
    fn rejects_invalid_filter_expressions() {
        for expr in ["drover_core=", "=debug", "drover_core=not_a_level"] {
            assert!(
                expr.parse::<LoggerLevel>().is_err(),
                "expected error for {expr:?}"
            );
        }
    }

    #[test]
    fn serde_roundtrip_preserves_expression() {
        let lvl: LoggerLevel = "drover_core=debug,info".parse().unwrap();
        let json = serde_json::to_string(&lvl).unwrap();
        let back: LoggerLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), lvl.as_str());
    }

    #[test]
    fn serde_rejects_invalid_expression() {
        assert!(serde_json::from_str::<LoggerLevel>(r#""drover_core=""#).is_err());
    }

    #[test]
    fn to_env_filter_succeeds_for_valid_levels() {
        let lvl: LoggerLevel = "debug".parse().unwrap();
        let _ = lvl.to_env_filter();
    }
}
