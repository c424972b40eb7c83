//! The connector abstraction and registry.
//!
//! A [`Connector`] scans one origin (paginated wiki API, repository tree,
//! static catalogue) and yields [`SourceItem`]s for the ingestion
//! pipeline. Connectors may yield lazy items whose text is resolved
//! later through [`Connector::fetch_body`].

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::models::SourceItem;

/// A data source that produces items for indexing.
///
/// `scan` returns everything the source currently holds; it is
/// restartable per call but not resumable across process runs. Page-level
/// transport failures inside a scan are handled fail-open by the
/// connector itself (log, stop paging, return what was fetched);
/// configuration-class failures (unreachable root, unresolvable space)
/// surface as errors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Instance name (e.g. `"handbook"`, `"platform"`).
    fn name(&self) -> &str;

    /// One-line description shown by `ragdex sources`.
    fn description(&self) -> &str;

    /// Connector type identifier (`"wiki"`, `"repo"`, `"prompts"`).
    fn connector_type(&self) -> &str;

    /// Source label tagging every item: `"{type}:{name}"`.
    fn source_label(&self) -> String {
        format!("{}:{}", self.connector_type(), self.name())
    }

    /// Scan the source and return all items to index.
    async fn scan(&self) -> Result<Vec<SourceItem>>;

    /// Resolve the text of a lazy item.
    ///
    /// The default covers connectors that always inline their bodies.
    async fn fetch_body(&self, item: &SourceItem) -> Result<String> {
        item.body
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no inline body for item '{}'", item.source_id))
    }
}

/// Registry of connectors resolved from the config file.
pub struct ConnectorRegistry {
    connectors: Vec<Box<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self {
            connectors: Vec::new(),
        }
    }

    /// Build a registry holding every connector configured in `config`.
    pub fn from_config(config: &Config) -> Self {
        use crate::connector_prompts::PromptsConnector;
        use crate::connector_repo::RepoConnector;
        use crate::connector_wiki::WikiConnector;

        let mut registry = Self::new();

        if let Some(cfg) = &config.connectors.wiki {
            registry.register(Box::new(WikiConnector::new("docs".to_string(), cfg.clone())));
        }
        if let Some(cfg) = &config.connectors.repo {
            registry.register(Box::new(RepoConnector::new(
                cfg.project.clone(),
                cfg.clone(),
                config.collection.recreate,
            )));
        }
        if config.connectors.prompts.is_some() {
            registry.register(Box::new(PromptsConnector::new()));
        }

        registry
    }

    pub fn register(&mut self, connector: Box<dyn Connector>) {
        self.connectors.push(connector);
    }

    pub fn connectors(&self) -> &[Box<dyn Connector>] {
        &self.connectors
    }

    /// Select connectors by spec: `"all"`, a type (`"wiki"`), or a
    /// specific instance (`"wiki:docs"`).
    pub fn select(&self, spec: &str) -> Vec<&dyn Connector> {
        self.connectors
            .iter()
            .filter(|c| {
                spec == "all"
                    || c.connector_type() == spec
                    || c.source_label() == spec
            })
            .map(|c| c.as_ref())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
