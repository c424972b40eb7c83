//! The indexing pipeline: scan, dedup, chunk, embed, batch upsert.
//!
//! [`IndexingPipeline`] takes its collaborators (registry, embedding
//! provider, vector store) by reference so tests can run the full flow
//! against the in-memory store and the mock provider. [`run_sync`] is
//! the CLI-facing wrapper that wires real collaborators from config.
//!
//! Failure policy: everything scoped to one item, one page, or one
//! batch is warned about and skipped; only collection setup and
//! configuration-class errors abort the run.

use anyhow::{bail, Result};

use crate::chunk::{chunk_item, point_id};
use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider, MockProvider};
use crate::models::{Point, PointPayload, SourceItem, SyncReport};
use crate::store::{ensure_collection, MemoryStore, QdrantStore, VectorStore};
use crate::traits::{Connector, ConnectorRegistry};

/// Options for one sync run, resolved from CLI flags.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Connector selection: `"all"`, a type, or `"type:name"`.
    pub connector_spec: String,
    /// Drop and recreate the collection before indexing.
    pub recreate: bool,
    /// Cap on distinct items processed, applied after dedup.
    pub limit: Option<usize>,
}

pub struct IndexingPipeline<'a> {
    config: &'a Config,
    registry: &'a ConnectorRegistry,
    provider: &'a dyn EmbeddingProvider,
    store: &'a dyn VectorStore,
}

impl<'a> IndexingPipeline<'a> {
    pub fn new(
        config: &'a Config,
        registry: &'a ConnectorRegistry,
        provider: &'a dyn EmbeddingProvider,
        store: &'a dyn VectorStore,
    ) -> Self {
        Self {
            config,
            registry,
            provider,
            store,
        }
    }

    pub async fn run(&self, options: &SyncOptions) -> Result<SyncReport> {
        let collection = &self.config.collection.name;

        ensure_collection(
            self.store,
            collection,
            self.provider.dims(),
            options.recreate,
        )
        .await?;

        let selected = self.registry.select(&options.connector_spec);
        if selected.is_empty() {
            bail!(
                "No connectors match '{}'. Configured: {}",
                options.connector_spec,
                self.registry
                    .connectors()
                    .iter()
                    .map(|c| c.source_label())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let mut report = SyncReport::default();

        // Scan phase. A connector whose whole scan fails is skipped so
        // the remaining sources still get indexed.
        let mut scanned: Vec<(SourceItem, &dyn Connector)> = Vec::new();
        for connector in &selected {
            println!("Scanning {}...", connector.source_label());
            match connector.scan().await {
                Ok(items) => {
                    println!("  {} items", items.len());
                    report.items_fetched += items.len() as u64;
                    scanned.extend(items.into_iter().map(|i| (i, *connector)));
                }
                Err(e) => {
                    eprintln!("Warning: scan of {} failed: {}", connector.source_label(), e);
                }
            }
        }

        // Dedup by natural id, first occurrence wins, order preserved.
        let mut seen = std::collections::HashSet::new();
        let mut unique: Vec<(SourceItem, &dyn Connector)> = Vec::new();
        for (item, connector) in scanned {
            if seen.insert(item.source_id.clone()) {
                unique.push((item, connector));
            }
        }
        report.items_unique = unique.len() as u64;
        println!(
            "Fetched {} items, {} unique",
            report.items_fetched, report.items_unique
        );

        if let Some(limit) = options.limit {
            unique.truncate(limit);
        }

        let batch_size = self.config.indexing.batch_size;
        let max_lines = self.config.chunking.max_lines;
        let mut pending: Vec<Point> = Vec::new();

        for (item, connector) in &unique {
            let body = match resolve_body(item, *connector).await {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("Warning: skipping item '{}': {}", item.source_id, e);
                    report.items_skipped += 1;
                    continue;
                }
            };

            let chunks = chunk_item(item, &body, max_lines);
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

            let vectors = match self.provider.embed(&texts).await {
                Ok(v) if v.len() == chunks.len() => v,
                Ok(v) => {
                    eprintln!(
                        "Warning: skipping item '{}': got {} vectors for {} chunks",
                        item.source_id,
                        v.len(),
                        chunks.len()
                    );
                    report.items_skipped += 1;
                    continue;
                }
                Err(e) => {
                    eprintln!(
                        "Warning: skipping item '{}': embedding failed: {}",
                        item.source_id, e
                    );
                    report.items_skipped += 1;
                    continue;
                }
            };

            for (chunk, vector) in chunks.into_iter().zip(vectors) {
                pending.push(Point {
                    id: point_id(&chunk.source_id, chunk.chunk_index),
                    vector,
                    payload: PointPayload {
                        item_path: chunk.item_path.clone(),
                        chunk_id: chunk.chunk_id(),
                        content: chunk.text,
                        area: chunk.area,
                    },
                });
                report.chunks_indexed += 1;
            }

            // Flush full batches as soon as they form so every upsert
            // except the last carries exactly batch_size points.
            while pending.len() >= batch_size {
                let batch: Vec<Point> = pending.drain(..batch_size).collect();
                self.flush(collection, &batch, &mut report).await;
            }
        }

        if !pending.is_empty() {
            self.flush(collection, &pending, &mut report).await;
        }

        println!(
            "Indexed {} chunks into '{}': {} points upserted, {} batches ({} failed), {} items skipped",
            report.chunks_indexed,
            collection,
            report.points_upserted,
            report.batches_flushed + report.batches_failed,
            report.batches_failed,
            report.items_skipped,
        );

        Ok(report)
    }

    async fn flush(&self, collection: &str, batch: &[Point], report: &mut SyncReport) {
        match self.store.upsert_points(collection, batch).await {
            Ok(()) => {
                report.batches_flushed += 1;
                report.points_upserted += batch.len() as u64;
            }
            Err(e) => {
                eprintln!("Warning: upsert of {} points failed: {}", batch.len(), e);
                report.batches_failed += 1;
            }
        }
    }
}

async fn resolve_body(item: &SourceItem, connector: &dyn Connector) -> Result<String> {
    match &item.body {
        Some(body) => Ok(body.clone()),
        None => connector.fetch_body(item).await,
    }
}

/// CLI entry point: wire real collaborators from config and run.
///
/// With `dry_run` the pipeline targets the in-memory store and a mock
/// provider, so no network or model resource is touched.
pub async fn run_sync(
    config: &Config,
    connector_spec: &str,
    dry_run: bool,
    recreate: bool,
    limit: Option<usize>,
) -> Result<SyncReport> {
    if !config.enabled {
        println!("Indexing is disabled in config; nothing to do");
        return Ok(SyncReport::default());
    }

    let registry = ConnectorRegistry::from_config(config);
    if registry.is_empty() {
        bail!("No connectors configured");
    }

    let options = SyncOptions {
        connector_spec: connector_spec.to_string(),
        recreate: recreate || config.collection.recreate,
        limit,
    };

    if dry_run {
        println!("Dry run: using in-memory store and mock embeddings");
        let provider = MockProvider::new(config.embedding.dims.unwrap_or(8));
        let store = MemoryStore::new();
        let pipeline = IndexingPipeline::new(config, &registry, &provider, &store);
        return pipeline.run(&options).await;
    }

    if !config.embedding.is_enabled() {
        bail!("embedding.provider is disabled; enable a provider or use --dry-run");
    }

    let provider = create_provider(&config.embedding)?;
    println!(
        "Embedding with {} ({} dims)",
        provider.model_name(),
        provider.dims()
    );
    let store = QdrantStore::new(&config.store)?;

    let pipeline = IndexingPipeline::new(config, &registry, provider.as_ref(), &store);
    pipeline.run(&options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::point_id;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticConnector {
        name: &'static str,
        items: Vec<SourceItem>,
        body_fetches: AtomicUsize,
    }

    impl StaticConnector {
        fn new(name: &'static str, items: Vec<SourceItem>) -> Self {
            Self {
                name,
                items,
                body_fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Connector for StaticConnector {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "static"
        }
        fn connector_type(&self) -> &str {
            "static"
        }
        async fn scan(&self) -> Result<Vec<SourceItem>> {
            Ok(self.items.clone())
        }
        async fn fetch_body(&self, item: &SourceItem) -> Result<String> {
            self.body_fetches.fetch_add(1, Ordering::SeqCst);
            item.body
                .clone()
                .ok_or_else(|| anyhow::anyhow!("body unavailable for '{}'", item.source_id))
        }
    }

    fn item(id: &str, body: Option<&str>) -> SourceItem {
        SourceItem {
            source: "static:test".to_string(),
            source_id: id.to_string(),
            path: format!("docs/{}", id),
            area: "docs".to_string(),
            body: body.map(str::to_string),
        }
    }

    fn config(batch_size: usize, max_lines: usize) -> Config {
        let raw = format!(
            r#"
[collection]
name = "kb"

[chunking]
max_lines = {max_lines}

[indexing]
batch_size = {batch_size}

[store]
url = "http://localhost:6333"

[embedding]
provider = "mock"
dims = 4
"#
        );
        toml::from_str(&raw).unwrap()
    }

    fn registry_of(connectors: Vec<Box<dyn Connector>>) -> ConnectorRegistry {
        let mut r = ConnectorRegistry::new();
        for c in connectors {
            r.register(c);
        }
        r
    }

    fn options() -> SyncOptions {
        SyncOptions {
            connector_spec: "all".to_string(),
            recreate: false,
            limit: None,
        }
    }

    async fn run(
        config: &Config,
        registry: &ConnectorRegistry,
        store: &MemoryStore,
        opts: &SyncOptions,
    ) -> SyncReport {
        let provider = MockProvider::new(4);
        IndexingPipeline::new(config, registry, &provider, store)
            .run(opts)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dedup_across_connectors() {
        let config = config(64, 100);
        let registry = registry_of(vec![
            Box::new(StaticConnector::new(
                "a",
                vec![item("p1", Some("one")), item("p2", Some("two"))],
            )),
            Box::new(StaticConnector::new(
                "b",
                vec![item("p2", Some("other copy")), item("p3", Some("three"))],
            )),
        ]);
        let store = MemoryStore::new();

        let report = run(&config, &registry, &store, &options()).await;

        assert_eq!(report.items_fetched, 4);
        assert_eq!(report.items_unique, 3);
        assert_eq!(report.chunks_indexed, 3);
        assert_eq!(store.count_points("kb").await.unwrap(), 3);
        // First-seen record wins for the duplicated id.
        assert_eq!(
            store.point_content("kb", &point_id("p2", 0)),
            Some("two".to_string())
        );
    }

    #[tokio::test]
    async fn test_batch_flush_shape() {
        // 10 one-chunk items at batch 4 -> upserts of 4, 4, 2.
        let items: Vec<SourceItem> = (0..10)
            .map(|i| item(&format!("f{}", i), Some("line")))
            .collect();
        let config = config(4, 100);
        let registry = registry_of(vec![Box::new(StaticConnector::new("a", items))]);
        let store = MemoryStore::new();

        let report = run(&config, &registry, &store, &options()).await;

        assert_eq!(report.points_upserted, 10);
        assert_eq!(report.batches_flushed, 3);
        assert_eq!(store.upsert_calls(), 3);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let items = vec![item("p1", Some("a\nb\nc")), item("p2", Some("d"))];
        let config = config(64, 2);
        let registry = registry_of(vec![Box::new(StaticConnector::new("a", items))]);
        let store = MemoryStore::new();

        let first = run(&config, &registry, &store, &options()).await;
        let count_after_first = store.count_points("kb").await.unwrap();
        let second = run(&config, &registry, &store, &options()).await;

        assert_eq!(first.chunks_indexed, 3);
        assert_eq!(second.chunks_indexed, 3);
        assert_eq!(store.count_points("kb").await.unwrap(), count_after_first);
    }

    #[tokio::test]
    async fn test_lazy_item_failure_skips_and_continues() {
        let items = vec![item("bad", None), item("good", Some("text"))];
        let config = config(64, 100);
        let registry = registry_of(vec![Box::new(StaticConnector::new("a", items))]);
        let store = MemoryStore::new();

        let report = run(&config, &registry, &store, &options()).await;

        assert_eq!(report.items_skipped, 1);
        assert_eq!(report.points_upserted, 1);
        assert_eq!(store.count_points("kb").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_limit_truncates_after_dedup() {
        let items: Vec<SourceItem> = (0..5)
            .map(|i| item(&format!("f{}", i), Some("x")))
            .collect();
        let config = config(64, 100);
        let registry = registry_of(vec![Box::new(StaticConnector::new("a", items))]);
        let store = MemoryStore::new();

        let opts = SyncOptions {
            limit: Some(2),
            ..options()
        };
        let report = run(&config, &registry, &store, &opts).await;

        assert_eq!(report.items_unique, 5);
        assert_eq!(report.chunks_indexed, 2);
    }

    #[tokio::test]
    async fn test_recreate_resets_collection() {
        let config = config(64, 100);
        let registry = registry_of(vec![Box::new(StaticConnector::new(
            "a",
            vec![item("p1", Some("x"))],
        ))]);
        let store = MemoryStore::new();

        run(&config, &registry, &store, &options()).await;
        let opts = SyncOptions {
            recreate: true,
            ..options()
        };
        run(&config, &registry, &store, &opts).await;

        assert_eq!(store.create_calls(), 2);
        assert_eq!(store.count_points("kb").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_no_matching_connector_is_an_error() {
        let config = config(64, 100);
        let registry = registry_of(vec![Box::new(StaticConnector::new("a", vec![]))]);
        let store = MemoryStore::new();
        let provider = MockProvider::new(4);

        let opts = SyncOptions {
            connector_spec: "wiki".to_string(),
            ..options()
        };
        let result = IndexingPipeline::new(&config, &registry, &provider, &store)
            .run(&opts)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_body_still_indexed() {
        let config = config(64, 100);
        let registry = registry_of(vec![Box::new(StaticConnector::new(
            "a",
            vec![item("empty", Some(""))],
        ))]);
        let store = MemoryStore::new();

        let report = run(&config, &registry, &store, &options()).await;

        assert_eq!(report.chunks_indexed, 1);
        assert_eq!(
            store.point_content("kb", &point_id("empty", 0)),
            Some(String::new())
        );
    }
}
