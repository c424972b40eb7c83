//! Source-repository connector.
//!
//! Workflow:
//! 1. If a remote `url` is configured and the local root has no checkout
//!    yet, clone it (splicing a token from `REPO_TOKEN` into the URL).
//! 2. Walk the tree under `root`.
//! 3. Keep files whose extension is listed and whose path contains none
//!    of the ignore substrings.
//!
//! Items are inline: the file body is read during the walk, with
//! non-UTF-8 files skipped.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use walkdir::WalkDir;

use crate::config::RepoConnectorConfig;
use crate::models::SourceItem;
use crate::traits::Connector;

pub struct RepoConnector {
    name: String,
    config: RepoConnectorConfig,
    refresh: bool,
}

impl RepoConnector {
    /// `refresh` forces a fresh clone even when a checkout already exists,
    /// paired with collection recreation so store and tree move together.
    pub fn new(name: String, config: RepoConnectorConfig, refresh: bool) -> Self {
        Self {
            name,
            config,
            refresh,
        }
    }

    /// Make sure a tree exists at `root`, cloning the remote if needed.
    fn ensure_tree(&self) -> Result<()> {
        let root = &self.config.root;
        let has_checkout = root.join(".git").exists();

        if has_checkout && !self.refresh {
            return Ok(());
        }

        let url = match &self.config.url {
            Some(u) => u,
            None => {
                if root.exists() {
                    return Ok(());
                }
                bail!(
                    "Repo connector root does not exist and no url is configured: {}",
                    root.display()
                );
            }
        };

        if root.exists() {
            std::fs::remove_dir_all(root)
                .with_context(|| format!("Failed to remove stale checkout: {}", root.display()))?;
        }

        git_clone(&clone_url(url), root)
    }
}

#[async_trait]
impl Connector for RepoConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Walk a source repository tree"
    }

    fn connector_type(&self) -> &str {
        "repo"
    }

    async fn scan(&self) -> Result<Vec<SourceItem>> {
        self.ensure_tree()?;

        let root = &self.config.root;
        if !root.exists() {
            bail!("Repo connector root does not exist: {}", root.display());
        }

        let source = self.source_label();
        let mut items = Vec::new();
        let mut skipped_binary = 0usize;

        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().replace('\\', "/");

            if !has_listed_extension(path, &self.config.extensions) {
                continue;
            }
            if is_ignored(&rel_str, &self.config.ignore_paths) {
                continue;
            }

            let body = match std::fs::read_to_string(path) {
                Ok(b) => b,
                Err(_) => {
                    skipped_binary += 1;
                    continue;
                }
            };

            items.push(SourceItem {
                source: source.clone(),
                source_id: rel_str.clone(),
                path: rel_str,
                area: self.config.project.clone(),
                body: Some(body),
            });
        }

        if skipped_binary > 0 {
            println!("  skipped {} unreadable files", skipped_binary);
        }

        // Sort for deterministic ordering
        items.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Ok(items)
    }
}

fn has_listed_extension(path: &Path, extensions: &[String]) -> bool {
    let ext = match path.extension() {
        Some(e) => e.to_string_lossy().to_ascii_lowercase(),
        None => return false,
    };
    extensions.iter().any(|e| e.trim_start_matches('.') == ext)
}

fn is_ignored(relative_path: &str, ignore_paths: &[String]) -> bool {
    ignore_paths
        .iter()
        .any(|frag| !frag.is_empty() && relative_path.contains(frag.as_str()))
}

/// Splice the `REPO_TOKEN` credential into an https remote URL.
///
/// Without a token the URL passes through unchanged, which is fine for
/// public remotes.
fn clone_url(url: &str) -> String {
    match std::env::var("REPO_TOKEN") {
        Ok(token) if !token.is_empty() => {
            if let Some(rest) = url.strip_prefix("https://") {
                format!("https://{}@{}", token, rest)
            } else {
                url.to_string()
            }
        }
        _ => url.to_string(),
    }
}

fn git_clone(url: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create clone directory: {}", parent.display()))?;
    }

    let output = Command::new("git")
        .args(["clone", "--depth", "1"])
        .arg(url)
        .arg(dest)
        .output()
        .with_context(|| "Failed to execute 'git clone'. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git clone failed: {}", stderr.trim());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config(root: &Path) -> RepoConnectorConfig {
        RepoConnectorConfig {
            root: root.to_path_buf(),
            url: None,
            project: "platform".to_string(),
            extensions: vec!["rs".to_string(), ".md".to_string()],
            ignore_paths: vec!["target/".to_string(), "generated".to_string()],
        }
    }

    #[test]
    fn test_extension_filter() {
        let exts = vec!["rs".to_string(), ".md".to_string()];
        assert!(has_listed_extension(Path::new("src/main.rs"), &exts));
        assert!(has_listed_extension(Path::new("README.MD"), &exts));
        assert!(!has_listed_extension(Path::new("build.gradle"), &exts));
        assert!(!has_listed_extension(Path::new("Makefile"), &exts));
    }

    #[test]
    fn test_ignore_substring_filter() {
        let ignores = vec!["target/".to_string(), "generated".to_string()];
        assert!(is_ignored("target/debug/foo.rs", &ignores));
        assert!(is_ignored("src/generated_types.rs", &ignores));
        assert!(!is_ignored("src/main.rs", &ignores));
    }

    #[tokio::test]
    async fn test_scan_walks_filtered_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("target/debug")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "pub fn x() {}\n").unwrap();
        fs::write(dir.path().join("README.md"), "# Readme\n").unwrap();
        fs::write(dir.path().join("target/debug/out.rs"), "ignored").unwrap();
        fs::write(dir.path().join("notes.txt"), "not indexed").unwrap();

        let connector = RepoConnector::new("platform".to_string(), config(dir.path()), false);
        let items = connector.scan().await.unwrap();

        let ids: Vec<&str> = items.iter().map(|i| i.source_id.as_str()).collect();
        assert_eq!(ids, vec!["README.md", "src/lib.rs"]);
        assert_eq!(items[0].area, "platform");
        assert_eq!(items[0].source, "repo:platform");
        assert!(items[1].body.as_deref().unwrap().contains("pub fn x"));
    }

    #[tokio::test]
    async fn test_scan_missing_root_without_url_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let connector = RepoConnector::new("platform".to_string(), config(&missing), false);
        assert!(connector.scan().await.is_err());
    }

    #[test]
    fn test_clone_url_token_splice() {
        // Serialize env mutation within this test only.
        std::env::set_var("REPO_TOKEN", "tok123");
        assert_eq!(
            clone_url("https://git.example.com/org/repo.git"),
            "https://tok123@git.example.com/org/repo.git"
        );
        std::env::remove_var("REPO_TOKEN");
        assert_eq!(
            clone_url("https://git.example.com/org/repo.git"),
            "https://git.example.com/org/repo.git"
        );
    }
}
