//! Typed errors for per-record failures.
//!
//! Setup and IO failures are fatal and travel as `anyhow::Error`; the
//! variants here describe a single record and never abort a run.

use thiserror::Error;

/// Why a single record could not be turned into statistics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// A required key or column value is absent.
    #[error("missing required field `{0}`")]
    MissingField(String),
    /// The record is not well-formed JSON/CSV, or a value has the wrong shape.
    #[error("parse error: {0}")]
    Parse(String),
}

impl RecordError {
    pub fn missing(field: &str) -> Self {
        Self::MissingField(field.to_string())
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<csv::Error> for RecordError {
    fn from(err: csv::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_names_field() {
        let err = RecordError::missing("ingredients");
        assert_eq!(err.to_string(), "missing required field `ingredients`");
    }

    #[test]
    fn test_from_serde_json() {
        let err: RecordError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, RecordError::Parse(_)));
    }
}
