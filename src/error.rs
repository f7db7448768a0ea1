//! Unified error handling for the ride-map library.
//!
//! Only `DataLoad` (and `Http` when no HTTP client can be built) is fatal: it
//! ends the bootstrap of a session. `ConstraintViolation` and `EmptyRange` are produced
//! internally and corrected on the spot, they never reach the user.

use std::fmt;

/// Unified error type for ride-map operations.
#[derive(Debug, Clone, PartialEq)]
pub enum RideMapError {
    /// Dataset is missing, unreadable or malformed
    DataLoad { message: String },
    /// A handle was asked to move past its partner or out of the track
    ConstraintViolation { requested: f64, corrected: f64 },
    /// Selection window with start after end
    EmptyRange { start: String, end: String },
    /// Configuration error
    Config { message: String },
    /// HTTP client could not be set up
    Http {
        message: String,
        status_code: Option<u16>,
    },
    /// Generic internal error
    Internal { message: String },
}

impl RideMapError {
    pub fn data_load(message: impl Into<String>) -> Self {
        RideMapError::DataLoad {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        RideMapError::Config {
            message: message.into(),
        }
    }
}

impl fmt::Display for RideMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RideMapError::DataLoad { message } => {
                write!(f, "Failed to load dataset: {}", message)
            }
            RideMapError::ConstraintViolation {
                requested,
                corrected,
            } => {
                write!(
                    f,
                    "Handle position {:.1} violates range constraint, clamped to {:.1}",
                    requested, corrected
                )
            }
            RideMapError::EmptyRange { start, end } => {
                write!(f, "Selection start {} is after end {}", start, end)
            }
            RideMapError::Config { message } => {
                write!(f, "Configuration error: {}", message)
            }
            RideMapError::Http {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            RideMapError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for RideMapError {}

impl From<serde_json::Error> for RideMapError {
    fn from(e: serde_json::Error) -> Self {
        RideMapError::data_load(format!("invalid JSON: {}", e))
    }
}

impl From<csv::Error> for RideMapError {
    fn from(e: csv::Error) -> Self {
        RideMapError::data_load(format!("invalid CSV: {}", e))
    }
}

impl From<std::io::Error> for RideMapError {
    fn from(e: std::io::Error) -> Self {
        RideMapError::data_load(e.to_string())
    }
}

/// Result type alias for ride-map operations.
pub type Result<T> = std::result::Result<T, RideMapError>;

/// Extension trait for converting Option to RideMapError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a data load error naming the missing field.
    fn ok_or_missing_field(self, field: &str, index: usize) -> Result<T>;

    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing_field(self, field: &str, index: usize) -> Result<T> {
        self.ok_or_else(|| {
            RideMapError::data_load(format!("record {} is missing field '{}'", index, field))
        })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| RideMapError::Internal {
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RideMapError::ConstraintViolation {
            requested: 120.0,
            corrected: 80.0,
        };
        assert!(err.to_string().contains("120.0"));
        assert!(err.to_string().contains("80.0"));

        let err = RideMapError::Http {
            message: "not found".to_string(),
            status_code: Some(404),
        };
        assert_eq!(err.to_string(), "HTTP error (404): not found");
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_missing_field("date", 3);
        match result {
            Err(RideMapError::DataLoad { message }) => {
                assert!(message.contains("record 3"));
                assert!(message.contains("'date'"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_json_error_is_data_load() {
        let err: RideMapError = serde_json::from_str::<Vec<u8>>("{").unwrap_err().into();
        assert!(matches!(err, RideMapError::DataLoad { .. }));
    }
}
