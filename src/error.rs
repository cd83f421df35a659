//! Error types for the proximity search core.
use crate::types::TagId;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, GeotagError>;

/// Errors produced by geohash handling, query planning, and store access.
#[derive(Error, Debug)]
pub enum GeotagError {
    /// Latitude or longitude is non-finite or outside its valid range.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Search radius is negative or non-finite.
    #[error("Invalid radius: {0} meters (must be finite and non-negative)")]
    InvalidRadius(f64),

    /// Geohash precision outside the supported range.
    #[error("Invalid geohash precision: {0} (must be between 1 and 22)")]
    InvalidPrecision(usize),

    /// Input string is not a well-formed base-32 geohash.
    #[error("Malformed geohash: {0}")]
    MalformedGeohash(String),

    /// The backing store failed or the scan budget expired.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Update target does not exist in the store.
    #[error("Tag not found: {0}")]
    TagNotFound(TagId),

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GeotagError {
    /// Whether retrying the same call may succeed.
    ///
    /// Store-side failures (including scan timeouts) are transient; every
    /// validation error is permanent for the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GeotagError::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GeotagError::StoreUnavailable("scan failed".into()).is_retryable());
        assert!(!GeotagError::InvalidRadius(-1.0).is_retryable());
        assert!(!GeotagError::InvalidCoordinate("latitude 91".into()).is_retryable());
        assert!(!GeotagError::MalformedGeohash("a!".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = GeotagError::InvalidPrecision(40);
        assert!(err.to_string().contains("between 1 and 22"));

        let err = GeotagError::TagNotFound(TagId::from("missing"));
        assert!(err.to_string().contains("missing"));
    }
}
