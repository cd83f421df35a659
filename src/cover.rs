//! Circle-to-key-range decomposition.
//!
//! A proximity query cannot scan by distance directly; it scans contiguous
//! runs of geohash keys. This module picks the coarsest useful cell
//! precision for a radius and enumerates the cells a circle can touch,
//! emitting one inclusive key range per cell. Over-coverage is acceptable
//! (extra cells only cost empty scans); under-coverage never is.

use crate::error::Result;
use crate::geohash::{cell_height_deg, cell_width_deg, encode};
use crate::validation::{validate_point, validate_radius};
use geo::Point;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Meridional meters per degree of latitude.
const METERS_PER_DEGREE_LATITUDE: f64 = 110_574.0;

/// WGS84 equatorial radius in meters.
const EARTH_EQ_RADIUS_METERS: f64 = 6_378_137.0;

/// WGS84 first eccentricity squared.
const ECCENTRICITY_SQUARED: f64 = 0.006_694_478_197_99;

/// Below this many meters per longitude degree the parallel has collapsed
/// into the pole and one cell row spans every longitude.
const EPSILON: f64 = 1e-12;

/// An inclusive range of stored geohash keys.
///
/// `start` is the bare cell prefix, the least key carrying that prefix.
/// `end` pads the prefix with `z` up to the stored precision, the greatest
/// key the cell can contain. Ranges never straddle the antimeridian; cells
/// on either side of it produce separate ranges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyRange {
    pub start: String,
    pub end: String,
}

impl KeyRange {
    /// Build the range covering every key written at `stored_precision`
    /// inside the cell named by `prefix`.
    pub fn for_cell(prefix: &str, stored_precision: usize) -> Self {
        let mut end = String::with_capacity(stored_precision.max(prefix.len()));
        end.push_str(prefix);
        while end.len() < stored_precision {
            end.push('z');
        }

        Self {
            start: prefix.to_string(),
            end,
        }
    }

    /// Whether a stored key sorts inside this range.
    pub fn contains_key(&self, key: &str) -> bool {
        key >= self.start.as_str() && key <= self.end.as_str()
    }
}

/// Meters spanned by one degree of longitude at `latitude`, on the WGS84
/// ellipsoid. Shrinks toward the poles and reaches zero there.
fn meters_per_longitude_degree(latitude: f64) -> f64 {
    let radians = latitude.to_radians();
    let num = radians.cos() * EARTH_EQ_RADIUS_METERS * std::f64::consts::PI / 180.0;
    num / (1.0 - ECCENTRICITY_SQUARED * radians.sin() * radians.sin()).sqrt()
}

/// Degrees of longitude spanned by `distance` meters at `latitude`,
/// saturating at a full wrap near the poles.
fn meters_to_longitude_degrees(distance: f64, latitude: f64) -> f64 {
    let per_degree = meters_per_longitude_degree(latitude);
    if per_degree < EPSILON {
        if distance > 0.0 { 360.0 } else { 0.0 }
    } else {
        (distance / per_degree).min(360.0)
    }
}

/// Normalize a longitude into [-180, 180], wrapping across the antimeridian.
fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        return longitude;
    }
    let adjusted = longitude + 180.0;
    if adjusted > 0.0 {
        (adjusted % 360.0) - 180.0
    } else {
        360.0 - (-adjusted % 360.0) - 180.0
    }
}

/// Pick the longest cell precision whose cells are at least `radius_meters`
/// on every side, evaluated at the extreme latitudes the circle reaches.
///
/// Longitude cell width varies with latitude, so the check uses the
/// northern and southern edges of the circle where cells are narrowest.
/// Floors at 1: near the poles even the coarsest cells are narrower than
/// most radii, and the caller compensates with a wider neighbor grid.
pub fn precision_for_radius(center: &Point, radius_meters: f64, max_precision: usize) -> usize {
    if radius_meters <= 0.0 {
        return max_precision;
    }

    let lat_delta = radius_meters / METERS_PER_DEGREE_LATITUDE;
    let lat_north = (center.y() + lat_delta).min(90.0);
    let lat_south = (center.y() - lat_delta).max(-90.0);

    for precision in (1..=max_precision).rev() {
        let height_meters = cell_height_deg(precision) * METERS_PER_DEGREE_LATITUDE;
        let width_north = cell_width_deg(precision) * meters_per_longitude_degree(lat_north);
        let width_south = cell_width_deg(precision) * meters_per_longitude_degree(lat_south);

        if height_meters >= radius_meters
            && width_north >= radius_meters
            && width_south >= radius_meters
        {
            return precision;
        }
    }

    1
}

/// Decompose a circle into the key ranges a scan must cover.
///
/// The common case is the center cell and its eight neighbors (nine
/// ranges). When the precision floors out near the poles or under a very
/// large radius, the grid widens by whole cell steps until it spans the
/// circle, capped at full longitude wrap and full latitude coverage.
/// Sample points past a pole are dropped; sample points past the
/// antimeridian wrap to the far side, so coverage is seamless there.
///
/// The chosen precision never exceeds `stored_precision`: a range prefix
/// longer than the stored keys could not match any of them.
///
/// A zero radius degenerates to the single range of the center cell.
///
/// # Examples
///
/// ```rust
/// use geotag::cover::cover_circle;
/// use geo::point;
///
/// let ranges = cover_circle(&point!(x: 13.4050, y: 52.5200), 500.0, 10).unwrap();
/// assert_eq!(ranges.len(), 9);
/// assert!(ranges.iter().all(|r| r.start <= r.end));
/// ```
pub fn cover_circle(
    center: &Point,
    radius_meters: f64,
    stored_precision: usize,
) -> Result<SmallVec<[KeyRange; 9]>> {
    validate_point(center)?;
    validate_radius(radius_meters)?;

    if radius_meters == 0.0 {
        let cell = encode(center, stored_precision)?;
        let mut ranges = SmallVec::new();
        ranges.push(KeyRange::for_cell(&cell, stored_precision));
        return Ok(ranges);
    }

    let precision = precision_for_radius(center, radius_meters, stored_precision);
    let cell_w = cell_width_deg(precision);
    let cell_h = cell_height_deg(precision);

    let lat_delta = radius_meters / METERS_PER_DEGREE_LATITUDE;
    let lat_north = (center.y() + lat_delta).min(90.0);
    let lat_south = (center.y() - lat_delta).max(-90.0);
    let lng_delta = meters_to_longitude_degrees(radius_meters, lat_north)
        .max(meters_to_longitude_degrees(radius_meters, lat_south));

    // Whole-cell steps to reach the circle's extent on each axis, capped at
    // full coverage of the sphere.
    let max_rows = (180.0 / cell_h).ceil() as i64;
    let max_cols = (360.0 / cell_w).ceil() as i64;
    let rows = ((lat_delta / cell_h).ceil() as i64).clamp(1, max_rows);
    let cols = ((lng_delta / cell_w).ceil() as i64).clamp(1, max_cols);

    let mut cells: FxHashSet<String> = FxHashSet::default();
    for row in -rows..=rows {
        let lat = center.y() + row as f64 * cell_h;
        if !(-90.0..=90.0).contains(&lat) {
            continue;
        }
        for col in -cols..=cols {
            let lng = wrap_longitude(center.x() + col as f64 * cell_w);
            let sample = Point::new(lng, lat);
            cells.insert(encode(&sample, precision)?);
        }
    }

    let mut ordered: Vec<String> = cells.into_iter().collect();
    ordered.sort_unstable();

    Ok(ordered
        .into_iter()
        .map(|cell| KeyRange::for_cell(&cell, stored_precision))
        .collect())
}
