//! Error types for nxsync
//!
//! This module defines all error types used throughout the crate.
//!
//! A requested resource that is missing on the device is never an error:
//! the matcher reports it as absent and the lifecycle controller creates it.

use thiserror::Error;

/// Result type alias for nxsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for nxsync
#[derive(Error, Debug)]
pub enum Error {
    /// The device, or the library fronting it, failed or rejected a call
    #[error("Device error ({entity}): {message}")]
    Device {
        /// Entity kind the call was addressed to
        entity: String,
        /// Message reported by the device layer
        message: String,
    },

    /// A combined call precondition does not hold; nothing was sent for it
    #[error("Validation failed for {call}: {message}")]
    Validation {
        /// Combined call that was rejected
        call: String,
        /// Which precondition failed
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (ill-typed values, malformed keys)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A property name the entity kind does not declare
    #[error("Unknown property '{property}' for {entity}")]
    UnknownProperty {
        /// Entity kind
        entity: String,
        /// The unrecognized name
        property: String,
    },

    /// Device snapshot persistence errors
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a device error
    pub fn device(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Device {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create a validation error for a combined call
    pub fn validation(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            call: call.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an unknown property error
    pub fn unknown_property(entity: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            entity: entity.into(),
            property: property.into(),
        }
    }

    /// Create a snapshot error
    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    /// Whether this is a combined-call validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether this error came from the device layer
    pub fn is_device(&self) -> bool {
        matches!(self, Self::Device { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = Error::validation("ace_set", "action must be permit or deny");
        assert!(err.is_validation());
        assert!(!err.is_device());
        assert_eq!(
            err.to_string(),
            "Validation failed for ace_set: action must be permit or deny"
        );

        let err = Error::device("cisco_ace", "connection refused");
        assert!(err.is_device());
        assert_eq!(err.to_string(), "Device error (cisco_ace): connection refused");
    }
}
