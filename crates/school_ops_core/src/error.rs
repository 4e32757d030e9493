//! crates/school_ops_core/src/error.rs
//!
//! Errors raised by the store-touching controller operations.

use crate::ports::PortError;

/// A create/enroll request that cannot be sent to the store. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid value for {field}: '{value}'")]
    InvalidField { field: &'static str, value: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Propagated unchanged from the adapter.
    #[error("Store error: {0}")]
    Store(#[from] PortError),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Rejects a blank required field.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

/// Rejects anything that is not a real `YYYY-MM-DD` date.
pub(crate) fn require_date(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require(field, value)?;
    let value = value.trim();
    let parsed = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d");
    if value.len() != 10 || parsed.is_err() {
        return Err(ValidationError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Rejects anything that is not a zero-padded 24-hour `HH:MM` time.
pub(crate) fn require_time(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require(field, value)?;
    let value = value.trim();
    let parsed = chrono::NaiveTime::parse_from_str(value, "%H:%M");
    if value.len() != 5 || parsed.is_err() {
        return Err(ValidationError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_missing() {
        assert_eq!(
            require("subject_id", "   "),
            Err(ValidationError::MissingField("subject_id"))
        );
        assert!(require("subject_id", "s1").is_ok());
    }

    #[test]
    fn dates_must_be_iso_calendar_days() {
        assert!(require_date("date", "2024-02-29").is_ok());
        assert!(matches!(
            require_date("date", "2023-02-29"),
            Err(ValidationError::InvalidField { .. })
        ));
        assert!(matches!(
            require_date("date", "01/03/2024"),
            Err(ValidationError::InvalidField { .. })
        ));
        assert_eq!(
            require_date("date", ""),
            Err(ValidationError::MissingField("date"))
        );
    }

    #[test]
    fn times_must_be_zero_padded() {
        assert!(require_time("time", "08:30").is_ok());
        assert!(require_time("time", "23:59").is_ok());
        assert!(matches!(
            require_time("time", "8:30"),
            Err(ValidationError::InvalidField { .. })
        ));
        assert!(matches!(
            require_time("time", "24:00"),
            Err(ValidationError::InvalidField { .. })
        ));
    }
}
