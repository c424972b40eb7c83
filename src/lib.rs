//! ragdex: content ingestion into a vector store.
//!
//! Scans heterogeneous sources (a paginated wiki space, a source
//! repository, a static prompt catalogue), splits each item into
//! bounded line-based chunks, embeds the chunks, and batch-upserts the
//! resulting points into a Qdrant collection. Point ids are
//! content-addressed, so re-running the sync over unchanged input
//! rewrites the same points instead of growing the collection.

pub mod chunk;
pub mod config;
pub mod connector_prompts;
pub mod connector_repo;
pub mod connector_wiki;
pub mod embedding;
pub mod ingest;
pub mod models;
pub mod sources;
pub mod store;
pub mod traits;
