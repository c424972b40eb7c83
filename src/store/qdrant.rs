//! Qdrant REST backend for [`VectorStore`].
//!
//! Talks to the plain HTTP API so no client crate or gRPC channel is
//! needed:
//!
//! - `GET    /collections/{name}/exists`
//! - `PUT    /collections/{name}` with the vector geometry
//! - `DELETE /collections/{name}`
//! - `PUT    /collections/{name}/points?wait=true`
//! - `POST   /collections/{name}/points/count`
//!
//! Upserts pass `wait=true` so a successful response means the points
//! are durable, which is what the per-batch accounting in the pipeline
//! relies on.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{Distance, VectorStore};
use crate::config::StoreConfig;
use crate::models::Point;

pub struct QdrantStore {
    base_url: String,
    client: reqwest::Client,
}

impl QdrantStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Fail on non-2xx, carrying the response body in the error.
async fn check_status(resp: reqwest::Response, what: &str) -> Result<Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("{} failed with HTTP {}: {}", what, status, body.trim());
    }
    resp.json().await.with_context(|| format!("{}: invalid JSON response", what))
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let url = self.url(&format!("/collections/{}/exists", name));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Existence check for collection '{}'", name))?;

        let json = check_status(resp, "Collection existence check").await?;
        Ok(json
            .pointer("/result/exists")
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn create_collection(&self, name: &str, dims: usize, distance: Distance) -> Result<()> {
        let url = self.url(&format!("/collections/{}", name));
        let body = serde_json::json!({
            "vectors": {
                "size": dims,
                "distance": distance.as_str(),
            }
        });

        let resp = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Create collection '{}'", name))?;

        check_status(resp, "Collection creation").await?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let url = self.url(&format!("/collections/{}", name));
        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("Delete collection '{}'", name))?;

        // 404 means already gone, which is the state we wanted.
        if resp.status().as_u16() == 404 {
            return Ok(());
        }
        check_status(resp, "Collection deletion").await?;
        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let url = self.url(&format!("/collections/{}/points?wait=true", collection));
        let body = serde_json::json!({ "points": points });

        let resp = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Upsert of {} points", points.len()))?;

        check_status(resp, "Point upsert").await?;
        Ok(())
    }

    async fn count_points(&self, collection: &str) -> Result<u64> {
        let url = self.url(&format!("/collections/{}/points/count", collection));
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "exact": true }))
            .send()
            .await
            .with_context(|| format!("Point count for collection '{}'", collection))?;

        let json = check_status(resp, "Point count").await?;
        json.pointer("/result/count")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow::anyhow!("Point count: missing result.count"))
    }
}
