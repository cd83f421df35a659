//! Validation for geographic query inputs.

use crate::error::{GeotagError, Result};
use geo::Point;

/// Validates a point has valid longitude and latitude.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use geotag::validation::validate_point;
/// use geo::Point;
///
/// // Valid point
/// let nyc = Point::new(-74.0060, 40.7128);
/// assert!(validate_point(&nyc).is_ok());
///
/// // Invalid longitude
/// let invalid = Point::new(200.0, 40.0);
/// assert!(validate_point(&invalid).is_err());
///
/// // Invalid latitude
/// let invalid = Point::new(-74.0, 95.0);
/// assert!(validate_point(&invalid).is_err());
/// ```
pub fn validate_point(point: &Point) -> Result<()> {
    let (x, y) = (point.x(), point.y());

    if !x.is_finite() {
        return Err(GeotagError::InvalidCoordinate(format!(
            "Longitude must be finite, got: {}",
            x
        )));
    }

    if !y.is_finite() {
        return Err(GeotagError::InvalidCoordinate(format!(
            "Latitude must be finite, got: {}",
            y
        )));
    }

    if !(-180.0..=180.0).contains(&x) {
        return Err(GeotagError::InvalidCoordinate(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(GeotagError::InvalidCoordinate(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

/// Validates a search radius in meters.
///
/// Negative and non-finite radii are rejected. Zero is accepted; it yields
/// the degenerate query that matches only records at distance zero.
///
/// # Examples
///
/// ```
/// use geotag::validation::validate_radius;
///
/// assert!(validate_radius(500.0).is_ok());
/// assert!(validate_radius(0.0).is_ok());
/// assert!(validate_radius(-1.0).is_err());
/// assert!(validate_radius(f64::NAN).is_err());
/// ```
pub fn validate_radius(radius_meters: f64) -> Result<()> {
    if !radius_meters.is_finite() || radius_meters < 0.0 {
        return Err(GeotagError::InvalidRadius(radius_meters));
    }

    Ok(())
}
