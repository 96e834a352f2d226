// src/error.rs
//! Error types for the GPS relay

use std::fmt;

pub type Result<T> = std::result::Result<T, GpsError>;

#[derive(Debug)]
pub enum GpsError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Connection(String),
    /// Requested representation type is not one of the published names.
    UnknownType(String),
    /// Unsubscribe request carried no subscription id.
    MissingId,
    /// No live subscription matches the given id.
    BadId(i32),
    /// Subscription identifier space is exhausted.
    OutOfMemory,
    Other(String),
}

impl GpsError {
    /// Stable machine-readable failure code, as reported to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            GpsError::UnknownType(_) => "unknown-type",
            GpsError::MissingId => "missing-id",
            GpsError::BadId(_) => "bad-id",
            GpsError::OutOfMemory => "out-of-memory",
            _ => "failed",
        }
    }
}

impl fmt::Display for GpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpsError::Io(e) => write!(f, "IO error: {}", e),
            GpsError::Serial(e) => write!(f, "Serial error: {}", e),
            GpsError::Json(e) => write!(f, "JSON error: {}", e),
            GpsError::Connection(msg) => write!(f, "Connection error: {}", msg),
            GpsError::UnknownType(name) => write!(f, "unknown position type: {}", name),
            GpsError::MissingId => write!(f, "no subscription id given"),
            GpsError::BadId(id) => write!(f, "no subscription with id {}", id),
            GpsError::OutOfMemory => write!(f, "out of subscription identifiers"),
            GpsError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for GpsError {}

impl From<std::io::Error> for GpsError {
    fn from(error: std::io::Error) -> Self {
        GpsError::Io(error)
    }
}

impl From<tokio_serial::Error> for GpsError {
    fn from(error: tokio_serial::Error) -> Self {
        GpsError::Serial(error)
    }
}

impl From<serde_json::Error> for GpsError {
    fn from(error: serde_json::Error) -> Self {
        GpsError::Json(error)
    }
}

impl From<anyhow::Error> for GpsError {
    fn from(error: anyhow::Error) -> Self {
        GpsError::Other(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_codes() {
        assert_eq!(GpsError::UnknownType("DMS".to_string()).code(), "unknown-type");
        assert_eq!(GpsError::MissingId.code(), "missing-id");
        assert_eq!(GpsError::BadId(7).code(), "bad-id");
        assert_eq!(GpsError::OutOfMemory.code(), "out-of-memory");
        assert_eq!(GpsError::Connection("refused".to_string()).code(), "failed");
    }

    #[test]
    fn test_display_carries_detail() {
        let err = GpsError::BadId(42);
        assert!(err.to_string().contains("42"));
        let err = GpsError::UnknownType("DMS.mps".to_string());
        assert!(err.to_string().contains("DMS.mps"));
    }
}
