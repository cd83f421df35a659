//! Proximity query and write engine.
//!
//! `TagIndex` turns a radius query into a set of geohash range scans,
//! fans them out against the store concurrently, and reduces the returned
//! candidates to exact matches. Writes derive the stored key from the
//! coordinate so reads and writes always agree on cell placement.

use crate::cover::{KeyRange, cover_circle};
use crate::error::{GeotagError, Result};
use crate::geohash::{MAX_PRECISION, encode, validate_key};
use crate::storage::TagStore;
use crate::types::{Config, NearbyOptions, TagDraft, TagId, TagRecord};
use crate::validation::{validate_point, validate_radius};
use futures::future::try_join_all;
use geo::{Distance, Haversine, Point};
use rustc_hash::FxHashMap;
use std::future::Future;
use std::sync::Arc;

/// Store-agnostic proximity search engine.
///
/// The engine plans key ranges, scans them through a shared [`TagStore`],
/// and filters candidates down to the records actually inside the circle.
/// It keeps no record state of its own, so one cheaply cloned instance can
/// serve many tasks.
///
/// Range scans of one query run concurrently and fail together: the first
/// scan error abandons the remaining scans and the query returns that
/// error. Results are complete or the call is an error, never a silent
/// partial set.
///
/// # Examples
///
/// ```rust
/// use geotag::{Config, MemoryStore, NearbyOptions, TagDraft, TagIndex, Visibility};
/// use geo::point;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), geotag::GeotagError> {
/// let index = TagIndex::new(Arc::new(MemoryStore::new()));
///
/// let draft = TagDraft::new("alice", point!(x: 13.4050, y: 52.5200))
///     .with_title("Alexanderplatz")
///     .with_visibility(Visibility::Public);
/// index.save_tag(draft).await?;
///
/// let center = point!(x: 13.4060, y: 52.5205);
/// let nearby = index
///     .find_nearby(&center, 500.0, &NearbyOptions::default())
///     .await?;
/// assert_eq!(nearby.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TagIndex<S: TagStore> {
    store: Arc<S>,
    config: Config,
}

impl<S: TagStore> Clone for TagIndex<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: TagStore> TagIndex<S> {
    /// Create an engine over `store` with the default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            config: Config::default(),
        }
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(store: Arc<S>, config: Config) -> Result<Self> {
        config.validate().map_err(GeotagError::InvalidConfig)?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Find every visible tag within `radius_meters` of `center`.
    ///
    /// Distance is great-circle (haversine) over the record's raw
    /// coordinate; the stored geohash only routes the scan. The boundary
    /// is inclusive: a record at exactly `radius_meters` matches. Records
    /// with corrupt coordinates or keys are logged and skipped rather than
    /// failing the batch. Result order is unspecified; each id appears at
    /// most once.
    ///
    /// A negative or non-finite radius is an error. A zero radius is the
    /// degenerate query matching only records at distance zero.
    pub async fn find_nearby(
        &self,
        center: &Point,
        radius_meters: f64,
        options: &NearbyOptions,
    ) -> Result<Vec<TagRecord>> {
        validate_point(center)?;
        validate_radius(radius_meters)?;

        let ranges = cover_circle(center, radius_meters, self.config.geohash_precision)?;
        log::debug!(
            "Proximity query at ({:.5}, {:.5}) radius {:.1} m over {} ranges",
            center.x(),
            center.y(),
            radius_meters,
            ranges.len()
        );

        let candidates = self.scan_ranges(&ranges).await?;

        let mut unique: FxHashMap<TagId, TagRecord> = FxHashMap::default();
        for record in candidates {
            if !candidate_is_sound(&record) {
                continue;
            }
            if Haversine.distance(*center, record.point) <= radius_meters {
                // Overlapping ranges can surface an id twice; last seen wins
                unique.insert(record.id.clone(), record);
            }
        }

        let mut results: Vec<TagRecord> = unique.into_values().collect();
        results.retain(|record| passes_filters(record, options));
        Ok(results)
    }

    /// Every record in the store, deduplicated by id.
    ///
    /// Corrupt records are skipped the same way `find_nearby` skips them.
    /// No visibility filtering is applied.
    pub async fn all_tags(&self) -> Result<Vec<TagRecord>> {
        let end = "z".repeat(MAX_PRECISION);
        let records = self
            .with_scan_budget(self.store.scan_geohash_range("", &end))
            .await?;

        let mut unique: FxHashMap<TagId, TagRecord> = FxHashMap::default();
        for record in records {
            if !candidate_is_sound(&record) {
                continue;
            }
            unique.insert(record.id.clone(), record);
        }
        Ok(unique.into_values().collect())
    }

    /// Store a new tag, deriving its geohash key from the draft's point.
    ///
    /// Returns the freshly minted id. Validation happens before anything
    /// reaches the store.
    pub async fn save_tag(&self, draft: TagDraft) -> Result<TagId> {
        let geohash = encode(&draft.point, self.config.geohash_precision)?;
        let id = TagId::generate();
        let record = TagRecord::from_draft(id.clone(), geohash, draft);
        self.store.insert(record).await?;
        Ok(id)
    }

    /// Replace an existing tag.
    ///
    /// The geohash is re-derived from the new point, which is the only way
    /// a record moves between cells. The original creation time is kept.
    pub async fn update_tag(&self, id: &TagId, draft: TagDraft) -> Result<()> {
        let geohash = encode(&draft.point, self.config.geohash_precision)?;
        let existing = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| GeotagError::TagNotFound(id.clone()))?;

        let mut record = TagRecord::from_draft(id.clone(), geohash, draft);
        record.created_at = existing.created_at;
        self.store.update(id, record).await
    }

    /// Fan out one scan per range and join them.
    ///
    /// `try_join_all` polls every scan concurrently and short-circuits on
    /// the first error, dropping the in-flight scans with it. Dropping the
    /// returned future cancels the whole fan-out as a unit.
    async fn scan_ranges(&self, ranges: &[KeyRange]) -> Result<Vec<TagRecord>> {
        let scans = ranges
            .iter()
            .map(|range| self.store.scan_geohash_range(&range.start, &range.end));

        let batches = self.with_scan_budget(try_join_all(scans)).await?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// Apply the configured scan budget to a store interaction.
    ///
    /// The budget covers the entire fan-out of one query, never a single
    /// scan. Expiry is a retryable store failure. Without a configured
    /// budget no timer is involved at all.
    async fn with_scan_budget<F, T>(&self, scan: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.config.scan_timeout() {
            Some(budget) => match tokio::time::timeout(budget, scan).await {
                Ok(result) => result,
                Err(_) => Err(GeotagError::StoreUnavailable(format!(
                    "range scan exceeded {:.3}s budget",
                    budget.as_secs_f64()
                ))),
            },
            None => scan.await,
        }
    }
}

/// Per-record soundness gate for scan results.
///
/// A corrupt record is an isolated data problem, not a query failure:
/// log it and move on so one bad row cannot poison the batch.
fn candidate_is_sound(record: &TagRecord) -> bool {
    if let Err(err) = validate_point(&record.point) {
        log::warn!(
            "Skipping tag {} with corrupt coordinates: {}",
            record.id,
            err
        );
        return false;
    }

    if let Err(err) = validate_key(&record.geohash) {
        log::warn!("Skipping tag {} with corrupt geohash: {}", record.id, err);
        return false;
    }

    true
}

/// Visibility and ownership predicate, applied after the distance filter.
fn passes_filters(record: &TagRecord, options: &NearbyOptions) -> bool {
    if options.only_public && !record.visibility.is_public() {
        return false;
    }

    if let Some(excluded) = &options.exclude_owner
        && record.owner_id == *excluded
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::Visibility;
    use geo::point;

    fn engine() -> TagIndex<MemoryStore> {
        TagIndex::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_save_derives_key_at_configured_precision() {
        let index = engine();
        let point = point!(x: 13.4050, y: 52.5200);
        let id = index.save_tag(TagDraft::new("alice", point)).await.unwrap();

        let stored = index.store().get(&id).await.unwrap().unwrap();
        assert_eq!(stored.geohash, encode(&point, 10).unwrap());
        assert_eq!(stored.geohash.len(), 10);
        assert_eq!(stored.visibility, Visibility::Private);
    }

    #[tokio::test]
    async fn test_save_respects_custom_precision() {
        let config = Config::with_geohash_precision(6);
        let index = TagIndex::with_config(Arc::new(MemoryStore::new()), config).unwrap();

        let point = point!(x: -0.1278, y: 51.5074);
        let id = index.save_tag(TagDraft::new("bob", point)).await.unwrap();

        let stored = index.store().get(&id).await.unwrap().unwrap();
        assert_eq!(stored.geohash.len(), 6);
    }

    #[tokio::test]
    async fn test_save_rejects_bad_point_before_store() {
        let index = engine();
        let err = index
            .save_tag(TagDraft::new("alice", point!(x: 200.0, y: 0.0)))
            .await
            .unwrap_err();
        assert!(matches!(err, GeotagError::InvalidCoordinate(_)));
        assert!(index.store().is_empty());
    }

    #[tokio::test]
    async fn test_update_reencodes_and_keeps_created_at() {
        let index = engine();
        let id = index
            .save_tag(TagDraft::new("alice", point!(x: 13.4050, y: 52.5200)))
            .await
            .unwrap();
        let original = index.store().get(&id).await.unwrap().unwrap();

        let moved = point!(x: -74.0060, y: 40.7128);
        index
            .update_tag(&id, TagDraft::new("alice", moved).with_title("moved"))
            .await
            .unwrap();

        let updated = index.store().get(&id).await.unwrap().unwrap();
        assert_eq!(updated.geohash, encode(&moved, 10).unwrap());
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.title.as_deref(), Some("moved"));
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let index = engine();
        let err = index
            .update_tag(
                &TagId::from("ghost"),
                TagDraft::new("alice", point!(x: 0.0, y: 0.0)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GeotagError::TagNotFound(_)));
    }

    #[tokio::test]
    async fn test_find_nearby_validates_inputs() {
        let index = engine();
        let opts = NearbyOptions::default();

        let err = index
            .find_nearby(&point!(x: 181.0, y: 0.0), 100.0, &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, GeotagError::InvalidCoordinate(_)));

        let err = index
            .find_nearby(&point!(x: 0.0, y: 0.0), -1.0, &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, GeotagError::InvalidRadius(_)));

        let err = index
            .find_nearby(&point!(x: 0.0, y: 0.0), f64::NAN, &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, GeotagError::InvalidRadius(_)));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = Config {
            geohash_precision: 40,
            scan_timeout_seconds: None,
        };
        let err = TagIndex::with_config(Arc::new(MemoryStore::new()), config).unwrap_err();
        assert!(matches!(err, GeotagError::InvalidConfig(_)));
    }

    #[test]
    fn test_passes_filters_matrix() {
        let public = TagRecord::from_draft(
            TagId::from("p"),
            "u33dbczk3h".into(),
            TagDraft::new("alice", point!(x: 0.0, y: 0.0)).with_visibility(Visibility::Public),
        );
        let private = TagRecord::from_draft(
            TagId::from("q"),
            "u33dbczk3h".into(),
            TagDraft::new("bob", point!(x: 0.0, y: 0.0)),
        );

        let default = NearbyOptions::default();
        assert!(passes_filters(&public, &default));
        assert!(!passes_filters(&private, &default));

        let with_private = NearbyOptions::default().include_private();
        assert!(passes_filters(&private, &with_private));

        let not_alice = NearbyOptions::default().exclude_owner("alice");
        assert!(!passes_filters(&public, &not_alice));

        let not_carol = NearbyOptions::default()
            .include_private()
            .exclude_owner("carol");
        assert!(passes_filters(&public, &not_carol));
        assert!(passes_filters(&private, &not_carol));
    }

    #[test]
    fn test_corrupt_records_are_unsound() {
        let mut bad_point = TagRecord::from_draft(
            TagId::from("bad"),
            "u33dbczk3h".into(),
            TagDraft::new("alice", point!(x: 0.0, y: 0.0)),
        );
        bad_point.point = point!(x: 400.0, y: 0.0);
        assert!(!candidate_is_sound(&bad_point));

        let mut bad_key = TagRecord::from_draft(
            TagId::from("bad2"),
            "u33dbczk3h".into(),
            TagDraft::new("alice", point!(x: 0.0, y: 0.0)),
        );
        bad_key.geohash = "not a hash!".into();
        assert!(!candidate_is_sound(&bad_key));

        let good = TagRecord::from_draft(
            TagId::from("good"),
            "u33dbczk3h".into(),
            TagDraft::new("alice", point!(x: 13.4, y: 52.5)),
        );
        assert!(candidate_is_sound(&good));
    }
}
