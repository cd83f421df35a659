//! Core record, option, and configuration types.
//!
//! Everything here is serializable so records can pass through external
//! stores unchanged and configuration can be loaded from JSON.
use bytes::Bytes;
use geo::Point;
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Unique identifier of a stored tag.
///
/// Opaque to the engine; ids key deduplication and point lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    /// Mint a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TagId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TagId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Who can see a tag in proximity results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible to every caller.
    Public,
    /// Visible only when the query opts in to private records.
    #[default]
    Private,
}

impl Visibility {
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

/// A geotagged record as stored in and returned from the index.
///
/// The raw `point` is authoritative for distance decisions; `geohash` is the
/// index key derived from it at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: TagId,
    /// Identifier of the writer, used by ownership filtering.
    pub owner_id: String,
    /// Position with `x` = longitude, `y` = latitude.
    pub point: Point,
    /// Base-32 cell key encoded from `point` at the configured precision.
    pub geohash: String,
    pub title: Option<String>,
    pub visibility: Visibility,
    pub created_at: SystemTime,
    /// Opaque application fields carried through the index untouched.
    #[serde(default)]
    pub payload: Bytes,
}

impl TagRecord {
    /// Assemble a record from a draft at write time.
    pub fn from_draft(id: TagId, geohash: String, draft: TagDraft) -> Self {
        Self {
            id,
            owner_id: draft.owner_id,
            point: draft.point,
            geohash,
            title: draft.title,
            visibility: draft.visibility,
            created_at: SystemTime::now(),
            payload: draft.payload,
        }
    }
}

/// Write-path input: everything the caller provides for a new or updated tag.
///
/// # Example
///
/// ```rust
/// use geotag::{TagDraft, Visibility};
/// use geo::point;
///
/// let draft = TagDraft::new("user-7", point!(x: 13.4050, y: 52.5200))
///     .with_title("Alexanderplatz")
///     .with_visibility(Visibility::Public);
/// assert!(draft.title.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TagDraft {
    pub owner_id: String,
    pub point: Point,
    pub title: Option<String>,
    pub visibility: Visibility,
    pub payload: Bytes,
}

impl TagDraft {
    /// Create a draft with the default visibility (`Private`) and no title.
    pub fn new(owner_id: impl Into<String>, point: Point) -> Self {
        Self {
            owner_id: owner_id.into(),
            point,
            title: None,
            visibility: Visibility::default(),
            payload: Bytes::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }
}

/// Filtering options for proximity queries.
#[derive(Debug, Clone)]
pub struct NearbyOptions {
    /// Drop non-public records. Defaults to `true`.
    pub only_public: bool,
    /// Drop records written by this owner.
    pub exclude_owner: Option<String>,
}

impl Default for NearbyOptions {
    fn default() -> Self {
        Self {
            only_public: true,
            exclude_owner: None,
        }
    }
}

impl NearbyOptions {
    /// Include private records in the result set.
    pub fn include_private(mut self) -> Self {
        self.only_public = false;
        self
    }

    pub fn exclude_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.exclude_owner = Some(owner_id.into());
        self
    }
}

/// Engine configuration.
///
/// Designed to be loadable from JSON while keeping complexity minimal.
///
/// # Example
///
/// ```rust
/// use geotag::Config;
///
/// let config = Config::default();
/// assert_eq!(config.geohash_precision, 10);
///
/// let json = r#"{
///     "geohash_precision": 8,
///     "scan_timeout_seconds": 2.5
/// }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.geohash_precision, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Precision of stored geohash keys (1-12, default: 10).
    /// Higher values = finer index cells but longer keys.
    #[serde(default = "Config::default_geohash_precision")]
    pub geohash_precision: usize,

    /// Budget in seconds for the whole range fan-out of a single query
    /// (None means no timeout).
    #[serde(default)]
    pub scan_timeout_seconds: Option<f64>,
}

impl Config {
    const fn default_geohash_precision() -> usize {
        10
    }

    pub fn with_geohash_precision(precision: usize) -> Self {
        assert!(
            (1..=12).contains(&precision),
            "Geohash precision must be between 1 and 12"
        );

        Self {
            geohash_precision: precision,
            scan_timeout_seconds: None,
        }
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout_seconds = Some(timeout.as_secs_f64());
        self
    }

    /// Get the scan budget as a Duration.
    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_seconds.and_then(|secs| {
            if secs.is_finite() && secs > 0.0 && secs <= u64::MAX as f64 {
                Some(Duration::from_secs_f64(secs))
            } else {
                None
            }
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.geohash_precision < 1 || self.geohash_precision > 12 {
            return Err("Geohash precision must be between 1 and 12".to_string());
        }

        if let Some(secs) = self.scan_timeout_seconds {
            if !secs.is_finite() {
                return Err("Scan timeout must be finite (not NaN or infinity)".to_string());
            }
            if secs <= 0.0 {
                return Err("Scan timeout must be positive".to_string());
            }
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geohash_precision: Self::default_geohash_precision(),
            scan_timeout_seconds: None,
        }
    }
}
