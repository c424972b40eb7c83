//! In-memory [`VectorStore`] used by tests and dry runs.
//!
//! Mirrors the contract of the REST backend closely enough to exercise
//! the full pipeline: collections are keyed by name, points by id, and
//! an upsert with a known id overwrites.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{Distance, VectorStore};
use crate::models::Point;

#[derive(Default)]
struct Collection {
    dims: usize,
    points: HashMap<Uuid, Point>,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
    create_calls: Mutex<u64>,
    upsert_calls: Mutex<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_collection` calls seen, for lifecycle assertions.
    pub fn create_calls(&self) -> u64 {
        *self.create_calls.lock().unwrap()
    }

    /// Number of `upsert_points` calls seen, for batch-shape assertions.
    pub fn upsert_calls(&self) -> u64 {
        *self.upsert_calls.lock().unwrap()
    }

    /// Snapshot of one point's payload content, if present.
    pub fn point_content(&self, collection: &str, id: &Uuid) -> Option<String> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|c| c.points.get(id))
            .map(|p| p.payload.content.clone())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.lock().unwrap().contains_key(name))
    }

    async fn create_collection(&self, name: &str, dims: usize, _distance: Distance) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(name) {
            bail!("Collection '{}' already exists", name);
        }
        collections.insert(
            name.to_string(),
            Collection {
                dims,
                points: HashMap::new(),
            },
        );
        *self.create_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.lock().unwrap().remove(name);
        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: &[Point]) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| anyhow::anyhow!("Collection '{}' does not exist", collection))?;

        for point in points {
            if point.vector.len() != coll.dims {
                bail!(
                    "Vector size {} does not match collection dims {}",
                    point.vector.len(),
                    coll.dims
                );
            }
            coll.points.insert(point.id, point.clone());
        }

        *self.upsert_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn count_points(&self, collection: &str) -> Result<u64> {
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.points.len() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointPayload;

    fn point(id_seed: u8, content: &str) -> Point {
        Point {
            id: Uuid::from_bytes([id_seed; 16]),
            vector: vec![0.0, 1.0],
            payload: PointPayload {
                item_path: "p".to_string(),
                chunk_id: "c".to_string(),
                content: content.to_string(),
                area: "a".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let store = MemoryStore::new();
        store
            .create_collection("kb", 2, Distance::Cosine)
            .await
            .unwrap();

        store.upsert_points("kb", &[point(1, "old")]).await.unwrap();
        store.upsert_points("kb", &[point(1, "new")]).await.unwrap();

        assert_eq!(store.count_points("kb").await.unwrap(), 1);
        assert_eq!(
            store.point_content("kb", &Uuid::from_bytes([1; 16])),
            Some("new".to_string())
        );
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dims() {
        let store = MemoryStore::new();
        store
            .create_collection("kb", 3, Distance::Cosine)
            .await
            .unwrap();
        assert!(store.upsert_points("kb", &[point(1, "x")]).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_into_missing_collection_fails() {
        let store = MemoryStore::new();
        assert!(store.upsert_points("kb", &[point(1, "x")]).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = MemoryStore::new();
        store.delete_collection("nope").await.unwrap();
    }
}
