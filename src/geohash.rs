//! Base-32 geohash encoding and decoding.
//!
//! The codec is the foundation of the index contract: stored keys, range
//! bounds, and cell geometry all come from the same binary subdivision, so
//! the crate implements it directly instead of delegating to an external
//! encoder. Encoding interleaves longitude and latitude bits starting with
//! longitude, five bits per character.

use crate::error::{GeotagError, Result};
use crate::validation::validate_point;
use geo::{Point, Rect, coord};
use once_cell::sync::Lazy;

/// Geohash alphabet. Note the gaps: `a`, `i`, `l`, and `o` are not used.
pub const BASE32: &str = "0123456789bcdefghjkmnpqrstuvwxyz";

/// Longest supported geohash. 22 characters carry 110 bits, more than the
/// 2x52 significant bits a pair of `f64` coordinates can provide.
pub const MAX_PRECISION: usize = 22;

const BITS_PER_CHAR: usize = 5;

/// Reverse lookup from ASCII byte to base-32 digit value (-1 = invalid).
static DECODE_MAP: Lazy<[i8; 128]> = Lazy::new(|| {
    let mut map = [-1i8; 128];
    for (value, byte) in BASE32.bytes().enumerate() {
        map[byte as usize] = value as i8;
    }
    map
});

/// The rectangular region a geohash string denotes.
///
/// A geohash names a cell, not a point. Bounds are inclusive on all edges,
/// so a coordinate on a shared edge is contained by both adjacent cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    bounds: Rect,
}

impl Cell {
    pub fn bounds(&self) -> &Rect {
        &self.bounds
    }

    /// Midpoint of the cell.
    pub fn center(&self) -> Point {
        Point::from(self.bounds.center())
    }

    /// Longitude span in degrees.
    pub fn width_deg(&self) -> f64 {
        self.bounds.width()
    }

    /// Latitude span in degrees.
    pub fn height_deg(&self) -> f64 {
        self.bounds.height()
    }

    /// Whether the point lies inside the cell (edges inclusive).
    pub fn contains(&self, point: &Point) -> bool {
        let (min, max) = (self.bounds.min(), self.bounds.max());
        point.x() >= min.x && point.x() <= max.x && point.y() >= min.y && point.y() <= max.y
    }
}

/// Encode a point as a geohash of the given precision.
///
/// Subdivision is strict: a coordinate exactly on a cell midpoint goes to
/// the lower half. This matches the convention the stored keys were written
/// with, so encoding the same point always reproduces the same key.
///
/// # Arguments
///
/// * `point` - Position with `x` = longitude, `y` = latitude
/// * `precision` - Number of base-32 characters (1-22)
///
/// # Examples
///
/// ```rust
/// use geotag::geohash::encode;
/// use geo::point;
///
/// let hash = encode(&point!(x: -5.603, y: 42.605), 5).unwrap();
/// assert_eq!(hash, "ezs42");
///
/// // Longer hashes refine the same cell
/// let longer = encode(&point!(x: -5.603, y: 42.605), 9).unwrap();
/// assert!(longer.starts_with("ezs42"));
/// ```
pub fn encode(point: &Point, precision: usize) -> Result<String> {
    validate_point(point)?;
    check_precision(precision)?;

    let alphabet = BASE32.as_bytes();
    let mut hash = String::with_capacity(precision);
    let (mut lng_lo, mut lng_hi) = (-180.0_f64, 180.0_f64);
    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let mut even_bit = true;
    let mut char_bits = 0usize;
    let mut bit_count = 0usize;

    while hash.len() < precision {
        char_bits <<= 1;
        if even_bit {
            let mid = (lng_lo + lng_hi) / 2.0;
            if point.x() > mid {
                char_bits |= 1;
                lng_lo = mid;
            } else {
                lng_hi = mid;
            }
        } else {
            let mid = (lat_lo + lat_hi) / 2.0;
            if point.y() > mid {
                char_bits |= 1;
                lat_lo = mid;
            } else {
                lat_hi = mid;
            }
        }
        even_bit = !even_bit;

        bit_count += 1;
        if bit_count == BITS_PER_CHAR {
            hash.push(alphabet[char_bits] as char);
            char_bits = 0;
            bit_count = 0;
        }
    }

    Ok(hash)
}

/// Decode a geohash into its cell.
///
/// # Examples
///
/// ```rust
/// use geotag::geohash::{decode, encode};
/// use geo::point;
///
/// let point = point!(x: 13.4050, y: 52.5200);
/// let cell = decode(&encode(&point, 8).unwrap()).unwrap();
/// assert!(cell.contains(&point));
/// ```
pub fn decode(hash: &str) -> Result<Cell> {
    validate_key(hash)?;

    let (mut lng_lo, mut lng_hi) = (-180.0_f64, 180.0_f64);
    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let mut even_bit = true;

    for byte in hash.bytes() {
        let value = DECODE_MAP[byte as usize];
        for shift in (0..BITS_PER_CHAR).rev() {
            let bit = (value >> shift) & 1;
            if even_bit {
                let mid = (lng_lo + lng_hi) / 2.0;
                if bit == 1 {
                    lng_lo = mid;
                } else {
                    lng_hi = mid;
                }
            } else {
                let mid = (lat_lo + lat_hi) / 2.0;
                if bit == 1 {
                    lat_lo = mid;
                } else {
                    lat_hi = mid;
                }
            }
            even_bit = !even_bit;
        }
    }

    Ok(Cell {
        bounds: Rect::new(
            coord! { x: lng_lo, y: lat_lo },
            coord! { x: lng_hi, y: lat_hi },
        ),
    })
}

/// Check that a string is a well-formed geohash key.
///
/// Used by the query path to isolate corrupt stored keys before decoding.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(GeotagError::MalformedGeohash(
            "empty geohash string".to_string(),
        ));
    }

    if key.len() > MAX_PRECISION {
        return Err(GeotagError::MalformedGeohash(format!(
            "length {} exceeds maximum precision {}: {:?}",
            key.len(),
            MAX_PRECISION,
            key
        )));
    }

    for ch in key.chars() {
        if !ch.is_ascii() || DECODE_MAP[ch as usize] < 0 {
            return Err(GeotagError::MalformedGeohash(format!(
                "invalid character {:?} in {:?}",
                ch, key
            )));
        }
    }

    Ok(())
}

/// Longitude span in degrees of a cell at the given precision.
///
/// Longitude receives the extra bit at odd precisions because interleaving
/// starts with it.
pub fn cell_width_deg(precision: usize) -> f64 {
    let lng_bits = (BITS_PER_CHAR * precision).div_ceil(2);
    360.0 / (1u64 << lng_bits) as f64
}

/// Latitude span in degrees of a cell at the given precision.
pub fn cell_height_deg(precision: usize) -> f64 {
    let lat_bits = (BITS_PER_CHAR * precision) / 2;
    180.0 / (1u64 << lat_bits) as f64
}

fn check_precision(precision: usize) -> Result<()> {
    if precision < 1 || precision > MAX_PRECISION {
        return Err(GeotagError::InvalidPrecision(precision));
    }
    Ok(())
}
