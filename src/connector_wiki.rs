//! Paginated wiki connector (Confluence v2 API shape).
//!
//! Scans a document space label by label:
//!
//! 1. Resolve the space id by name via the paginated `/spaces` endpoint.
//! 2. Fetch the space's label map (`label name -> label id`).
//! 3. For each configured label, page through the label's pages endpoint,
//!    honoring an optional item cap.
//!
//! Pagination follows the `next` continuation link (`_links.next` or
//! `paging.next` depending on the endpoint); an absent link means the
//! sequence is exhausted. Any transport failure or non-2xx response is
//! treated as "no more data" for that sequence — the scan keeps whatever
//! it already fetched and the run continues with partial data.
//!
//! Items are lazy: the page body is fetched one page at a time during
//! indexing (`?body-format=storage`) and stripped from HTML to text.
//!
//! # Environment Variables
//!
//! - `WIKI_TOKEN` — API token used for basic auth together with the
//!   configured `user`; required.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::WikiConnectorConfig;
use crate::models::SourceItem;
use crate::traits::Connector;

/// Page size used for the space and label listing endpoints.
const LISTING_PAGE_LIMIT: usize = 250;

pub struct WikiConnector {
    name: String,
    config: WikiConnectorConfig,
}

impl WikiConnector {
    pub fn new(name: String, config: WikiConnectorConfig) -> Self {
        Self { name, config }
    }

    fn client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")
    }

    fn auth_header(&self) -> Result<String> {
        let token = std::env::var("WIKI_TOKEN")
            .context("WIKI_TOKEN environment variable not set")?;
        Ok(basic_auth(&self.config.user, &token))
    }
}

#[async_trait]
impl Connector for WikiConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Fetch labeled pages from a wiki space"
    }

    fn connector_type(&self) -> &str {
        "wiki"
    }

    async fn scan(&self) -> Result<Vec<SourceItem>> {
        let client = self.client()?;
        let auth = self.auth_header()?;

        let space_id = resolve_space_id(
            &client,
            &auth,
            &self.config.base_url,
            &self.config.space,
            &self.config.space_type,
        )
        .await?;
        println!("  space '{}' resolved to id {}", self.config.space, space_id);

        let labels = space_labels(&client, &auth, &self.config.base_url, &space_id).await;
        println!("  labels in space: {}", labels.len());

        if labels.is_empty() {
            bail!(
                "No labels found in space '{}'; nothing would be indexed",
                self.config.space
            );
        }

        // A misspelled label is warned about and skipped, but if every
        // configured label is unknown there is nothing to fetch and the
        // run is misconfigured.
        let mut selected: Vec<(&str, &str)> = Vec::new();
        for label_name in &self.config.labels {
            match labels.get(label_name.as_str()) {
                Some(id) => selected.push((label_name.as_str(), id.as_str())),
                None => {
                    eprintln!(
                        "Warning: label '{}' not found in space '{}', skipping",
                        label_name, self.config.space
                    );
                }
            }
        }
        if selected.is_empty() {
            bail!(
                "None of the configured labels exist in space '{}': {}",
                self.config.space,
                self.config.labels.join(", ")
            );
        }

        let max_items = self.config.max_items.filter(|&n| n > 0);
        let mut items = Vec::new();

        for (label_name, label_id) in selected {
            let pages = fetch_pages_by_label(
                &client,
                &auth,
                &self.config.base_url,
                label_id,
                &space_id,
                self.config.page_limit,
                max_items,
            )
            .await;
            println!("  label '{}': {} pages", label_name, pages.len());

            for page in pages {
                if let Some(item) = page_to_item(&self.source_label(), &page) {
                    items.push(item);
                }
            }
        }

        Ok(items)
    }

    /// Fetch and convert one page's storage-format body.
    async fn fetch_body(&self, item: &SourceItem) -> Result<String> {
        let client = self.client()?;
        let auth = self.auth_header()?;

        let url = format!(
            "{}/wiki/api/v2/pages/{}?body-format=storage",
            self.config.base_url, item.source_id
        );

        let resp = client
            .get(&url)
            .header("Authorization", &auth)
            .send()
            .await
            .with_context(|| format!("Body fetch failed for page {}", item.source_id))?;

        if !resp.status().is_success() {
            bail!(
                "Body fetch for page {} returned HTTP {}",
                item.source_id,
                resp.status()
            );
        }

        let data: Value = resp.json().await?;
        let html = data
            .pointer("/body/storage/value")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        Ok(html_to_text(html))
    }
}

/// Build a basic-auth header value from user and token.
pub fn basic_auth(user: &str, token: &str) -> String {
    let credentials = format!("{}:{}", user, token);
    format!("Basic {}", BASE64_STANDARD.encode(credentials))
}

/// One authenticated GET returning parsed JSON, or `None` on any failure.
///
/// This is the fail-open primitive under all listing calls: a transport
/// error or non-2xx status is logged and reported as "no data".
async fn api_get(client: &reqwest::Client, auth: &str, url: &str) -> Option<Value> {
    let resp = match client.get(url).header("Authorization", auth).send().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Warning: request to {} failed: {}", url, e);
            return None;
        }
    };

    if !resp.status().is_success() {
        eprintln!("Warning: {} returned HTTP {}", url, resp.status());
        return None;
    }

    match resp.json::<Value>().await {
        Ok(v) => Some(v),
        Err(e) => {
            eprintln!("Warning: invalid JSON from {}: {}", url, e);
            None
        }
    }
}

/// Extract the continuation link from a paginated response.
///
/// Endpoints differ in where they put it (`_links.next` vs `paging.next`)
/// but agree on the semantics: absent means exhausted. Relative links are
/// joined to the base URL.
pub fn next_url(base_url: &str, data: &Value) -> Option<String> {
    let next = data
        .pointer("/_links/next")
        .or_else(|| data.pointer("/paging/next"))
        .and_then(|v| v.as_str())?;

    if next.starts_with("http://") || next.starts_with("https://") {
        Some(next.to_string())
    } else {
        Some(format!("{}{}", base_url, next))
    }
}

/// Walk the paginated space list and return the id of the first space
/// whose name contains `space_name`.
async fn resolve_space_id(
    client: &reqwest::Client,
    auth: &str,
    base_url: &str,
    space_name: &str,
    space_type: &str,
) -> Result<String> {
    let mut url = format!(
        "{}/wiki/api/v2/spaces?limit={}&status=current&type={}&sort=name",
        base_url, LISTING_PAGE_LIMIT, space_type
    );

    loop {
        let data = match api_get(client, auth, &url).await {
            Some(d) => d,
            None => bail!("Could not retrieve the space list from {}", base_url),
        };

        for space in data["results"].as_array().into_iter().flatten() {
            let name = space["name"].as_str().unwrap_or_default();
            if name.contains(space_name) {
                if let Some(id) = json_id(&space["id"]) {
                    return Ok(id);
                }
            }
        }

        match next_url(base_url, &data) {
            Some(next) => url = next,
            None => bail!("Space '{}' not found", space_name),
        }
    }
}

/// Fetch the space's label map: `label name -> label id`. Fail-open.
async fn space_labels(
    client: &reqwest::Client,
    auth: &str,
    base_url: &str,
    space_id: &str,
) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    let mut url = format!(
        "{}/wiki/api/v2/spaces/{}/content/labels?limit={}",
        base_url, space_id, LISTING_PAGE_LIMIT
    );

    loop {
        let data = match api_get(client, auth, &url).await {
            Some(d) => d,
            None => break,
        };

        for label in data["results"].as_array().into_iter().flatten() {
            let name = label["name"].as_str().unwrap_or_default();
            if let (false, Some(id)) = (name.is_empty(), json_id(&label["id"])) {
                labels.insert(name.to_string(), id);
            }
        }

        match next_url(base_url, &data) {
            Some(next) => url = next,
            None => break,
        }
    }

    labels
}

/// Page through all pages carrying one label, up to `max_items`. Fail-open.
///
/// The cap may truncate mid-page: the last page of results is consumed
/// only as far as the cap allows.
async fn fetch_pages_by_label(
    client: &reqwest::Client,
    auth: &str,
    base_url: &str,
    label_id: &str,
    space_id: &str,
    page_limit: usize,
    max_items: Option<usize>,
) -> Vec<Value> {
    let mut pages = Vec::new();
    let mut url = format!(
        "{}/wiki/api/v2/labels/{}/pages?spaceId={}&limit={}",
        base_url, label_id, space_id, page_limit
    );

    loop {
        let data = match api_get(client, auth, &url).await {
            Some(d) => d,
            None => break,
        };

        for page in data["results"].as_array().into_iter().flatten() {
            pages.push(page.clone());
            if let Some(cap) = max_items {
                if pages.len() >= cap {
                    println!("  reached max_items={} for label id {}", cap, label_id);
                    return pages;
                }
            }
        }

        match next_url(base_url, &data) {
            Some(next) => url = next,
            None => break,
        }
    }

    pages
}

/// Convert one page listing entry into a lazy [`SourceItem`].
fn page_to_item(source_label: &str, page: &Value) -> Option<SourceItem> {
    let id = json_id(&page["id"])?;
    let title = page["title"].as_str().unwrap_or_default().to_string();
    let webui = page
        .pointer("/_links/webui")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Some(SourceItem {
        source: source_label.to_string(),
        source_id: id,
        path: webui,
        area: title,
        body: None,
    })
}

/// Ids arrive as either JSON strings or numbers depending on endpoint.
fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Strip storage-format markup, producing newline-separated text.
///
/// The storage format is XHTML-shaped, so an XML event pass is enough:
/// text nodes are kept (entities unescaped), comments and tag structure
/// are dropped, and block-level elements become line breaks so headings
/// and paragraphs stay on separate lines. Anything fancier is out of
/// scope: text extraction quality is the embedding model's problem,
/// not ours.
pub fn html_to_text(html: &str) -> String {
    use quick_xml::events::Event;

    // The one HTML entity the storage format emits that XML leaves
    // undefined.
    let html = html.replace("&nbsp;", " ");

    let mut reader = quick_xml::Reader::from_str(&html);
    reader.config_mut().check_end_names = false;

    let mut out = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => {
                out.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) if is_block_tag(e.local_name().as_ref()) => {
                push_line_break(&mut out);
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"br" => {
                push_line_break(&mut out);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            // Keep whatever was extracted before the malformed spot.
            Err(_) => break,
        }
    }

    out.trim().to_string()
}

fn is_block_tag(name: &[u8]) -> bool {
    matches!(
        name,
        b"p" | b"br" | b"div" | b"li" | b"tr" | b"h1" | b"h2" | b"h3" | b"h4" | b"h5" | b"h6"
    )
}

fn push_line_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_auth_encodes_credentials() {
        let header = basic_auth("bot@example.com", "s3cret");
        assert!(header.starts_with("Basic "));
        let decoded = BASE64_STANDARD
            .decode(header.trim_start_matches("Basic "))
            .unwrap();
        assert_eq!(decoded, b"bot@example.com:s3cret");
    }

    #[test]
    fn test_next_url_from_links() {
        let data = json!({"_links": {"next": "/wiki/api/v2/spaces?cursor=abc"}});
        assert_eq!(
            next_url("https://x.example.com", &data).as_deref(),
            Some("https://x.example.com/wiki/api/v2/spaces?cursor=abc")
        );
    }

    #[test]
    fn test_next_url_from_paging() {
        let data = json!({"paging": {"next": "/wiki/api/v2/labels/1/pages?cursor=p2"}});
        assert_eq!(
            next_url("https://x.example.com", &data).as_deref(),
            Some("https://x.example.com/wiki/api/v2/labels/1/pages?cursor=p2")
        );
    }

    #[test]
    fn test_next_url_absolute_passthrough() {
        let data = json!({"_links": {"next": "https://other.example.com/page2"}});
        assert_eq!(
            next_url("https://x.example.com", &data).as_deref(),
            Some("https://other.example.com/page2")
        );
    }

    #[test]
    fn test_next_url_absent_means_done() {
        assert_eq!(next_url("https://x.example.com", &json!({})), None);
        assert_eq!(
            next_url("https://x.example.com", &json!({"_links": {}})),
            None
        );
    }

    #[test]
    fn test_page_to_item_lazy() {
        let page = json!({
            "id": "12345",
            "title": "Deploy Runbook",
            "_links": {"webui": "/spaces/ENG/pages/12345"}
        });
        let item = page_to_item("wiki:docs", &page).unwrap();
        assert_eq!(item.source_id, "12345");
        assert_eq!(item.area, "Deploy Runbook");
        assert_eq!(item.path, "/spaces/ENG/pages/12345");
        assert!(item.body.is_none());
    }

    #[test]
    fn test_page_to_item_numeric_id() {
        let page = json!({"id": 987, "title": "T"});
        assert_eq!(page_to_item("wiki:docs", &page).unwrap().source_id, "987");
    }

    #[test]
    fn test_html_to_text_blocks_and_entities() {
        let html = "<h1>Title</h1><p>First &amp; second.</p><p>Next line</p>";
        assert_eq!(html_to_text(html), "Title\nFirst & second.\nNext line");
    }

    #[test]
    fn test_html_to_text_inline_tags_keep_line() {
        let html = "Some <strong>bold</strong> and <em>italic</em> text";
        assert_eq!(html_to_text(html), "Some bold and italic text");
    }

    #[test]
    fn test_html_to_text_plain_passthrough() {
        assert_eq!(html_to_text("no markup here"), "no markup here");
    }

    #[test]
    fn test_html_to_text_angle_bracket_in_attribute() {
        let html = r#"<p data-note="a>b">text</p>"#;
        assert_eq!(html_to_text(html), "text");
    }

    #[test]
    fn test_html_to_text_drops_comments() {
        let html = "<p>visible</p><!-- hidden > note -->";
        assert_eq!(html_to_text(html), "visible");
    }

    #[test]
    fn test_html_to_text_nbsp_and_nested_blocks() {
        let html = "<div><p>a&nbsp;b</p><ul><li>one</li><li>two</li></ul></div>";
        assert_eq!(html_to_text(html), "a b\none\ntwo");
    }
}
