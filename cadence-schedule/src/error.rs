//! Schedule error types.

use thiserror::Error;

/// Errors raised while building durations and schedules.
///
/// Stepping a schedule never fails; every variant here is a
/// construction-time validation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// A duration literal or value could not be accepted.
    #[error("Invalid duration '{input}': {reason}")]
    InvalidDuration {
        /// The offending input, as written.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A schedule constructor argument was out of range.
    #[error("Invalid schedule parameter '{parameter}': {reason}")]
    InvalidScheduleParameter {
        /// Name of the parameter.
        parameter: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A declarative schedule configuration could not be decoded.
    #[error("Invalid schedule config: {0}")]
    Config(String),
}

impl ScheduleError {
    /// Create an invalid duration error.
    pub fn invalid_duration(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidScheduleParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error came from validating a duration or parameter
    /// (as opposed to decoding a config document).
    pub fn is_construction_error(&self) -> bool {
        match self {
            Self::InvalidDuration { .. } | Self::InvalidScheduleParameter { .. } => true,
            Self::Config(_) => false,
        }
    }
}

impl From<serde_json::Error> for ScheduleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for schedule construction.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ScheduleError::invalid_duration("5 fortnights", "unknown unit 'fortnights'");
        assert_eq!(
            err.to_string(),
            "Invalid duration '5 fortnights': unknown unit 'fortnights'"
        );

        let err = ScheduleError::invalid_parameter("recurs", "must not be negative");
        assert_eq!(
            err.to_string(),
            "Invalid schedule parameter 'recurs': must not be negative"
        );
    }

    #[test]
    fn test_construction_errors() {
        assert!(ScheduleError::invalid_duration("x", "bad").is_construction_error());
        assert!(ScheduleError::invalid_parameter("factor", "bad").is_construction_error());
        assert!(!ScheduleError::config("missing field").is_construction_error());
    }

    #[test]
    fn test_from_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ScheduleError = err.into();
        assert!(matches!(err, ScheduleError::Config(_)));
    }
}
