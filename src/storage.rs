//! Store boundary for tag records.
//!
//! The engine never owns the data; it plans key ranges and asks an ordered
//! store for the records inside them. This module defines that boundary and
//! ships an in-memory reference implementation used by tests and small
//! deployments.

use crate::error::{GeotagError, Result};
use crate::types::{TagId, TagRecord};
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// An ordered key-value store holding tag records indexed by geohash.
///
/// Implementations must return scan results in lexicographic key order and
/// treat both range bounds as inclusive. Scans of disjoint ranges are
/// issued concurrently, so all methods take `&self`.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// All records whose stored geohash sorts inside `[start, end]`.
    async fn scan_geohash_range(&self, start: &str, end: &str) -> Result<Vec<TagRecord>>;

    /// Point lookup by id.
    async fn get(&self, id: &TagId) -> Result<Option<TagRecord>>;

    /// Insert a record, replacing any previous record with the same id.
    async fn insert(&self, record: TagRecord) -> Result<()>;

    /// Replace the record stored under `id`.
    ///
    /// Fails with [`GeotagError::TagNotFound`] when the id is unknown.
    async fn update(&self, id: &TagId, record: TagRecord) -> Result<()>;
}

/// Store statistics.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Number of records currently stored.
    pub tag_count: usize,
    /// Number of write operations performed.
    pub operations_count: u64,
}

#[derive(Debug, Default)]
struct MemoryInner {
    /// Ordered by (geohash, id) so range scans walk keys lexicographically.
    records: BTreeMap<(String, TagId), TagRecord>,
    /// Reverse lookup from id to its current geohash key.
    id_to_cell: FxHashMap<TagId, String>,
    stats: StoreStats,
}

impl MemoryInner {
    fn remove_existing(&mut self, id: &TagId) -> Option<TagRecord> {
        let cell = self.id_to_cell.remove(id)?;
        self.records.remove(&(cell, id.clone()))
    }

    fn put(&mut self, record: TagRecord) {
        self.remove_existing(&record.id);
        self.id_to_cell
            .insert(record.id.clone(), record.geohash.clone());
        self.records
            .insert((record.geohash.clone(), record.id.clone()), record);
        self.stats.operations_count += 1;
        self.stats.tag_count = self.records.len();
    }
}

/// In-memory [`TagStore`] backed by an ordered map.
///
/// Behaves like the external stores the engine targets: records sort by
/// their geohash key and range scans are inclusive on both ends.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.read().stats.clone()
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn scan_geohash_range(&self, start: &str, end: &str) -> Result<Vec<TagRecord>> {
        let inner = self.inner.read();
        let lower = (start.to_string(), TagId::from(""));

        Ok(inner
            .records
            .range(lower..)
            .take_while(|((cell, _), _)| cell.as_str() <= end)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn get(&self, id: &TagId) -> Result<Option<TagRecord>> {
        let inner = self.inner.read();
        let Some(cell) = inner.id_to_cell.get(id) else {
            return Ok(None);
        };
        Ok(inner.records.get(&(cell.clone(), id.clone())).cloned())
    }

    async fn insert(&self, record: TagRecord) -> Result<()> {
        self.inner.write().put(record);
        Ok(())
    }

    async fn update(&self, id: &TagId, record: TagRecord) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.id_to_cell.contains_key(id) {
            return Err(GeotagError::TagNotFound(id.clone()));
        }
        inner.put(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TagDraft, Visibility};
    use geo::point;

    fn record(id: &str, cell: &str) -> TagRecord {
        let draft =
            TagDraft::new("owner", point!(x: 0.0, y: 0.0)).with_visibility(Visibility::Public);
        TagRecord::from_draft(TagId::from(id), cell.to_string(), draft)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        store.insert(record("a", "u33dbczk3h")).await.unwrap();

        let found = store.get(&TagId::from("a")).await.unwrap().unwrap();
        assert_eq!(found.geohash, "u33dbczk3h");
        assert!(store.get(&TagId::from("missing")).await.unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_replaces_same_id() {
        let store = MemoryStore::new();
        store.insert(record("a", "u33dbczk3h")).await.unwrap();
        store.insert(record("a", "9q8yyk8ytp")).await.unwrap();

        assert_eq!(store.len(), 1);
        let found = store.get(&TagId::from("a")).await.unwrap().unwrap();
        assert_eq!(found.geohash, "9q8yyk8ytp");

        // The old cell no longer yields the record
        let old = store.scan_geohash_range("u", "uzzzzzzzzz").await.unwrap();
        assert!(old.is_empty());
        let new = store.scan_geohash_range("9", "9zzzzzzzzz").await.unwrap();
        assert_eq!(new.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_range_is_inclusive() {
        let store = MemoryStore::new();
        store.insert(record("lo", "u33d000000")).await.unwrap();
        store.insert(record("mid", "u33dbczk3h")).await.unwrap();
        store.insert(record("hi", "u33dzzzzzz")).await.unwrap();
        store.insert(record("out", "u33e000000")).await.unwrap();

        let hits = store
            .scan_geohash_range("u33d000000", "u33dzzzzzz")
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);

        // Bare prefix as the start bound still picks up the least key
        let hits = store
            .scan_geohash_range("u33d", "u33dzzzzzz")
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn test_scan_returns_key_order() {
        let store = MemoryStore::new();
        store.insert(record("c", "u33dc00000")).await.unwrap();
        store.insert(record("a", "u33d000000")).await.unwrap();
        store.insert(record("b", "u33db00000")).await.unwrap();

        let hits = store
            .scan_geohash_range("u33d", "u33dzzzzzz")
            .await
            .unwrap();
        let cells: Vec<&str> = hits.iter().map(|r| r.geohash.as_str()).collect();
        assert_eq!(cells, vec!["u33d000000", "u33db00000", "u33dc00000"]);
    }

    #[tokio::test]
    async fn test_update_missing_id_errors() {
        let store = MemoryStore::new();
        let err = store
            .update(&TagId::from("ghost"), record("ghost", "u33dbczk3h"))
            .await
            .unwrap_err();
        assert!(matches!(err, GeotagError::TagNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_moves_record_between_cells() {
        let store = MemoryStore::new();
        store.insert(record("a", "u33dbczk3h")).await.unwrap();
        store
            .update(&TagId::from("a"), record("a", "ezs42czk3h"))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let hits = store.scan_geohash_range("e", "ezzzzzzzzz").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, TagId::from("a"));
    }

    #[tokio::test]
    async fn test_stats_track_writes() {
        let store = MemoryStore::new();
        store.insert(record("a", "u33d000000")).await.unwrap();
        store.insert(record("b", "u33db00000")).await.unwrap();
        store.insert(record("a", "u33dc00000")).await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.tag_count, 2);
        assert_eq!(stats.operations_count, 3);
    }
}
