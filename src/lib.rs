//! Geohash-based proximity search core over an ordered key-value store.
//!
//! ```rust
//! use geotag::{MemoryStore, NearbyOptions, TagDraft, TagIndex, Visibility};
//! use geo::point;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), geotag::GeotagError> {
//! let index = TagIndex::new(Arc::new(MemoryStore::new()));
//!
//! let draft = TagDraft::new("alice", point!(x: -74.0060, y: 40.7128))
//!     .with_title("Downtown")
//!     .with_visibility(Visibility::Public);
//! index.save_tag(draft).await?;
//!
//! let center = point!(x: -74.0050, y: 40.7130);
//! let nearby = index
//!     .find_nearby(&center, 1000.0, &NearbyOptions::default())
//!     .await?;
//! assert_eq!(nearby.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod cover;
pub mod error;
pub mod geohash;
pub mod query;
pub mod storage;
pub mod types;
pub mod validation;

pub use error::{GeotagError, Result};
pub use query::TagIndex;

pub use geo::{Point, Rect};

pub use cover::{KeyRange, cover_circle, precision_for_radius};

pub use geohash::{BASE32, Cell, MAX_PRECISION, decode, encode};

pub use types::{Config, NearbyOptions, TagDraft, TagId, TagRecord, Visibility};

pub use storage::{MemoryStore, StoreStats, TagStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{GeotagError, Result, TagIndex};

    pub use geo::{Point, Rect};

    pub use crate::{Config, NearbyOptions, TagDraft, TagId, TagRecord, Visibility};

    pub use crate::{MemoryStore, TagStore};

    pub use std::time::Duration;
}
