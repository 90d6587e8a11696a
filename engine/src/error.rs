//! Error types for the restrecord engine.

use crate::transport::TransportError;
use crate::validation::ValidationErrors;
use thiserror::Error;

/// All possible errors from record operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    // Declaration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    // Response shape errors
    #[error("Not a valid response type")]
    InvalidResponse,

    #[error("Not a valid response, expecting an array")]
    InvalidCollectionResponse,

    // Save gate
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    // Passed through from the HttpClient untouched
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// The validation messages if this is a rejected save.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::InvalidResponse;
        assert_eq!(err.to_string(), "Not a valid response type");

        let err = Error::InvalidCollectionResponse;
        assert_eq!(err.to_string(), "Not a valid response, expecting an array");

        let err = Error::UnknownFilter("shout".into());
        assert_eq!(err.to_string(), "unknown filter: shout");

        let err = Error::Configuration("no url root".into());
        assert_eq!(err.to_string(), "configuration error: no url root");
    }

    #[test]
    fn transport_error_is_transparent() {
        let err: Error = TransportError::new("connection refused").into();
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn validation_errors_accessor() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "is required");
        let err: Error = errors.clone().into();

        assert_eq!(err.validation_errors(), Some(&errors));
        assert_eq!(err.to_string(), "validation failed: name is required");
        assert!(Error::InvalidResponse.validation_errors().is_none());
    }
}
