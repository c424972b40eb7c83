//! TOML configuration loading and validation.
//!
//! [`load_config`] reads the file, applies serde defaults, and rejects
//! values the pipeline cannot run with (zero chunk or batch sizes,
//! empty collection or store URL, providers missing their model/dims,
//! connectors with empty filter lists). Secrets never live in the
//! config file; they come from environment variables (`WIKI_TOKEN`,
//! `REPO_TOKEN`, `OPENAI_API_KEY`).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Kill switch: when false, `sync` reports and exits successfully
    /// before any network or model resource is touched.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub collection: CollectionConfig,
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub connectors: ConnectorsConfig,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollectionConfig {
    /// Destination collection name in the vector store.
    pub name: String,
    /// Delete and recreate the collection at the start of the run.
    #[serde(default)]
    pub recreate: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum number of lines per chunk.
    pub max_lines: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    /// Number of points per upsert call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Base URL of the vector store REST API (e.g. `http://localhost:6333`).
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// One of `openai`, `ollama`, `mock`, or `disabled`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConnectorsConfig {
    pub wiki: Option<WikiConnectorConfig>,
    pub repo: Option<RepoConnectorConfig>,
    pub prompts: Option<PromptsConnectorConfig>,
}

/// Paginated wiki/document-service connector (Confluence v2 API shape).
///
/// The API token is read from the `WIKI_TOKEN` environment variable, not
/// from the config file.
#[derive(Debug, Deserialize, Clone)]
pub struct WikiConnectorConfig {
    /// Service base URL, e.g. `https://yoursite.atlassian.net`.
    pub base_url: String,
    /// Space name to index (substring match against the space list).
    pub space: String,
    #[serde(default = "default_space_type")]
    pub space_type: String,
    /// Account used for basic auth together with `WIKI_TOKEN`.
    pub user: String,
    /// Page labels to fetch; each label is one filter pass.
    pub labels: Vec<String>,
    /// Optional cap on items fetched per label (0 or absent = unlimited).
    #[serde(default)]
    pub max_items: Option<usize>,
    /// Page size requested from the pages endpoint.
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

fn default_space_type() -> String {
    "global".to_string()
}
fn default_page_limit() -> usize {
    50
}

/// Source-repository connector: optional clone followed by a tree walk.
#[derive(Debug, Deserialize, Clone)]
pub struct RepoConnectorConfig {
    /// Local tree to walk. When `url` is set this is the clone target.
    pub root: PathBuf,
    /// Remote to clone when `root` is absent or empty. A token from the
    /// `REPO_TOKEN` environment variable is spliced into the URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Grouping label carried into every point payload.
    pub project: String,
    /// File extensions to index (without the leading dot).
    pub extensions: Vec<String>,
    /// Path substrings that exclude a file when present anywhere in its path.
    #[serde(default)]
    pub ignore_paths: Vec<String>,
}

/// Static starter-prompt catalogue; presence of the table enables it.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptsConnectorConfig {}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_lines == 0 {
        anyhow::bail!("chunking.max_lines must be > 0");
    }

    if config.indexing.batch_size == 0 {
        anyhow::bail!("indexing.batch_size must be > 0");
    }

    if config.collection.name.trim().is_empty() {
        anyhow::bail!("collection.name must not be empty");
    }

    if config.store.url.trim().is_empty() {
        anyhow::bail!("store.url must not be empty");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "mock" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or mock.",
            other
        ),
    }

    if config.embedding.is_enabled() && config.embedding.provider != "mock" {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    if let Some(wiki) = &config.connectors.wiki {
        if wiki.labels.iter().all(|l| l.trim().is_empty()) {
            anyhow::bail!("connectors.wiki.labels must contain at least one label");
        }
        if wiki.page_limit == 0 {
            anyhow::bail!("connectors.wiki.page_limit must be > 0");
        }
    }

    if let Some(repo) = &config.connectors.repo {
        if repo.extensions.is_empty() {
            anyhow::bail!("connectors.repo.extensions must not be empty");
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    const VALID: &str = r#"
[collection]
name = "knowledge"

[chunking]
max_lines = 2000

[store]
url = "http://localhost:6333"

[embedding]
provider = "mock"

[connectors.prompts]
"#;

    #[test]
    fn test_valid_config_loads() {
        let f = write_config(VALID);
        let cfg = load_config(f.path()).unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.collection.name, "knowledge");
        assert_eq!(cfg.chunking.max_lines, 2000);
        assert_eq!(cfg.indexing.batch_size, 64);
        assert!(!cfg.collection.recreate);
        assert!(cfg.connectors.prompts.is_some());
        assert!(cfg.connectors.wiki.is_none());
    }

    #[test]
    fn test_zero_max_lines_rejected() {
        let f = write_config(&VALID.replace("max_lines = 2000", "max_lines = 0"));
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("max_lines"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let f = write_config(&VALID.replace("provider = \"mock\"", "provider = \"bert\""));
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_openai_requires_model_and_dims() {
        let f = write_config(&VALID.replace("provider = \"mock\"", "provider = \"openai\""));
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("embedding.model"));
    }

    #[test]
    fn test_wiki_requires_labels() {
        let body = format!(
            "{}\n[connectors.wiki]\nbase_url = \"https://x.example.com\"\nspace = \"Docs\"\nuser = \"bot@example.com\"\nlabels = []\n",
            VALID
        );
        let f = write_config(&body);
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("labels"));
    }

    #[test]
    fn test_disabled_flag_parses() {
        let f = write_config(&format!("enabled = false\n{}", VALID));
        let cfg = load_config(f.path()).unwrap();
        assert!(!cfg.enabled);
    }
}
