//! Vector store abstraction.
//!
//! The [`VectorStore`] trait covers the collection lifecycle and point
//! upserts the sync pipeline needs, enabling pluggable backends (Qdrant
//! over REST, in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod qdrant;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Point;

pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

/// Distance metric used when a collection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

impl Distance {
    /// Wire name understood by the store API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
            Distance::Dot => "Dot",
            Distance::Euclid => "Euclid",
        }
    }
}

/// Abstract collection-oriented vector store.
///
/// `upsert_points` must be idempotent with respect to point ids: writing
/// the same id twice overwrites the point rather than duplicating it.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check whether a collection exists.
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Create a collection with the given vector size and metric.
    async fn create_collection(&self, name: &str, dims: usize, distance: Distance) -> Result<()>;

    /// Delete a collection. Deleting a missing collection is not an error.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Write a batch of points, waiting until the write is durable.
    async fn upsert_points(&self, collection: &str, points: &[Point]) -> Result<()>;

    /// Number of points currently in the collection.
    async fn count_points(&self, collection: &str) -> Result<u64>;
}

/// Make sure `name` exists with the right geometry before indexing.
///
/// With `recreate` the collection is dropped first, so a dimension change
/// (new embedding model) never collides with old vectors.
pub async fn ensure_collection(
    store: &dyn VectorStore,
    name: &str,
    dims: usize,
    recreate: bool,
) -> Result<()> {
    if recreate && store.collection_exists(name).await? {
        println!("Deleting collection '{}' for recreation", name);
        store.delete_collection(name).await?;
    }

    if !store.collection_exists(name).await? {
        println!("Creating collection '{}' (dims={})", name, dims);
        store.create_collection(name, dims, Distance::Cosine).await?;
    }

    Ok(())
}
