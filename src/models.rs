//! Core data models used throughout ragdex.
//!
//! These types represent the items, chunks, and points that flow through
//! the ingestion pipeline: connector → dedup → chunker → embedding → store.

use serde::Serialize;
use uuid::Uuid;

/// Raw item produced by a connector.
///
/// `source_id` is the natural id assigned by the origin (page id, relative
/// file path, prompt id) and is unique within one source. A `body` of
/// `None` marks a lazy item whose text must be resolved later through
/// [`Connector::fetch_body`](crate::traits::Connector::fetch_body).
#[derive(Debug, Clone)]
pub struct SourceItem {
    /// Source label of the producing connector (e.g. `"wiki:handbook"`).
    pub source: String,
    /// Natural id, unique within the source.
    pub source_id: String,
    /// Human-readable location (relative file path, page link).
    pub path: String,
    /// Coarse grouping label carried into the point payload.
    pub area: String,
    /// Inline text content, or `None` for a lazy handle.
    pub body: Option<String>,
}

/// A bounded slice of one item's text.
///
/// Joining all chunks of an item with `\n` in `chunk_index` order
/// reconstructs the original text exactly.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub source_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub item_path: String,
    pub area: String,
}

impl Chunk {
    /// Chunk identifier stored in the point payload.
    pub fn chunk_id(&self) -> String {
        format!("{}_chunk_{}", self.source_id, self.chunk_index)
    }
}

/// Payload stored alongside each vector in the collection.
#[derive(Debug, Clone, Serialize)]
pub struct PointPayload {
    pub item_path: String,
    pub chunk_id: String,
    pub content: String,
    pub area: String,
}

/// The unit sent to the vector store.
///
/// The id is content-addressed (derived from `source_id` and chunk index,
/// see [`crate::chunk::point_id`]) so repeated runs over unchanged input
/// overwrite points instead of duplicating them.
#[derive(Debug, Clone, Serialize)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// Counters accumulated over one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Items returned by all connector scans, before dedup.
    pub items_fetched: u64,
    /// Distinct items after merging by natural id.
    pub items_unique: u64,
    /// Items dropped because their body fetch or embedding failed.
    pub items_skipped: u64,
    /// Chunks turned into points.
    pub chunks_indexed: u64,
    /// Points acknowledged by the store.
    pub points_upserted: u64,
    /// Successful upsert calls.
    pub batches_flushed: u64,
    /// Upsert calls that failed and were skipped.
    pub batches_failed: u64,
}
