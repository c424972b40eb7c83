//! Line-window text chunker.
//!
//! Splits an item's text into windows of at most `max_lines` lines,
//! rejoined with `\n`. Boundaries fall only on line breaks, so joining
//! the windows back with `\n` reproduces the input exactly — the
//! property the pipeline relies on for lossless re-indexing.
//!
//! Also derives the content-addressed point id: a UUID built from the
//! SHA-256 of `source_id` and chunk index, stable across runs so a
//! re-index overwrites points instead of duplicating them.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Chunk, SourceItem};

/// Split text into consecutive windows of at most `max_lines` lines.
///
/// Texts of `max_lines` lines or fewer (including the empty string) come
/// back as a single element; the final window may be shorter than
/// `max_lines`. Never returns an empty vector.
pub fn split_lines(text: &str, max_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = text.split('\n').collect();

    if lines.len() <= max_lines {
        return vec![text.to_string()];
    }

    lines
        .chunks(max_lines)
        .map(|window| window.join("\n"))
        .collect()
}

/// Chunk a resolved item body into [`Chunk`]s with contiguous indices.
pub fn chunk_item(item: &SourceItem, body: &str, max_lines: usize) -> Vec<Chunk> {
    split_lines(body, max_lines)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk {
            source_id: item.source_id.clone(),
            chunk_index,
            text,
            item_path: item.path.clone(),
            area: item.area.clone(),
        })
        .collect()
}

/// Derive the content-addressed point id for a chunk.
///
/// The id depends only on the item's natural id and the chunk position,
/// never on run order or process lifetime, which is what makes repeated
/// upserts idempotent.
pub fn point_id(source_id: &str, chunk_index: usize) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b":");
    hasher.update(chunk_index.to_string().as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}
