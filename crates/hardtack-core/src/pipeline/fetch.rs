//! Raw content acquisition

use crate::error::{HardtackError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;

const PIPELINE_TOOL: &str = "run_processing_pipeline";

/// Directory of saved pages that tool calls may import from
#[derive(Debug, Clone)]
pub struct ImportDir {
    root: PathBuf,
}

impl ImportDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a requested location to a saved page inside the directory
    ///
    /// Relative locations start at the root. The canonical path (symlinks
    /// and `..` resolved) must be an existing `.html`/`.htm` file under the
    /// canonical root.
    pub fn resolve(&self, location: &str) -> Result<PathBuf> {
        let rejected = || {
            HardtackError::invalid_argument(
                PIPELINE_TOOL,
                "url",
                "an .html file inside the import directory",
            )
        };

        let requested = Path::new(location);
        if !is_saved_page(requested) {
            return Err(rejected());
        }
        let root = self.root.canonicalize().map_err(|e| {
            tracing::debug!("Import directory {} unusable: {}", self.root.display(), e);
            rejected()
        })?;
        let resolved = root.join(requested).canonicalize().map_err(|_| rejected())?;
        if !resolved.starts_with(&root) || !resolved.is_file() || !is_saved_page(&resolved) {
            tracing::warn!("Refusing to import {} from outside {}", location, root.display());
            return Err(rejected());
        }
        Ok(resolved)
    }
}

fn is_saved_page(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}

/// Where a recipe comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    /// Local saved HTML page
    File(PathBuf),
}

impl Source {
    /// Build a source from the `source_type` / `url` pair of a tool call
    ///
    /// File sources are only accepted through `imports`, and only for saved
    /// pages inside that directory. Without one, tool calls may name URLs only.
    pub fn from_parts(
        source_type: &str,
        location: &str,
        imports: Option<&ImportDir>,
    ) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(HardtackError::invalid_argument(
                PIPELINE_TOOL,
                "url",
                "a non-empty URL or file path",
            ));
        }
        match source_type.trim().to_lowercase().as_str() {
            "url" => {
                if !(location.starts_with("http://") || location.starts_with("https://")) {
                    return Err(HardtackError::invalid_argument(
                        PIPELINE_TOOL,
                        "url",
                        "an http(s) URL",
                    ));
                }
                Ok(Self::Url(location.to_string()))
            }
            "file" | "html" => match imports {
                Some(imports) => Ok(Self::File(imports.resolve(location)?)),
                None => Err(HardtackError::invalid_argument(
                    PIPELINE_TOOL,
                    "source_type",
                    "'url' (no import directory is configured)",
                )),
            },
            _ => Err(HardtackError::invalid_argument(
                PIPELINE_TOOL,
                "source_type",
                "one of 'url' or 'file'",
            )),
        }
    }

    /// String identifying the source, used for ids and `source_url`
    pub fn location(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Fetches raw page content
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<String>;
}

/// Fetcher for web pages and local HTML files
pub struct HttpFetcher {
    client: Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(concat!("hardtack/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_url(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HardtackError::ExternalError(format!(
                        "Request timeout fetching {}: Server took too long to respond.",
                        url
                    ))
                } else if e.is_connect() {
                    HardtackError::ExternalError(format!(
                        "Connection error fetching {}: Cannot reach server.",
                        url
                    ))
                } else {
                    HardtackError::ExternalError(format!("Failed to fetch URL {}: {}", url, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_msg = match status {
                StatusCode::NOT_FOUND => format!("Page not found (404): {}", url),
                StatusCode::FORBIDDEN => format!(
                    "Access forbidden (403): {}. Try saving the page and adding the file.",
                    url
                ),
                StatusCode::TOO_MANY_REQUESTS => {
                    format!("Rate limit exceeded (429): {}. Try again later.", url)
                }
                s if s.is_server_error() => format!("Server error ({}): {}", s.as_u16(), url),
                _ => format!(
                    "HTTP error {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown error")
                ),
            };
            return Err(HardtackError::ExternalError(error_msg));
        }

        response.text().await.map_err(|e| {
            HardtackError::ExternalError(format!(
                "Failed to read response body from {}: {}",
                url, e
            ))
        })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, source: &Source) -> Result<String> {
        match source {
            Source::Url(url) => {
                tracing::info!("Fetching {}", url);
                self.fetch_url(url).await
            }
            Source::File(path) => {
                tracing::info!("Reading {}", path.display());
                tokio::fs::read_to_string(path).await.map_err(|e| {
                    HardtackError::ExternalError(format!(
                        "Failed to read {}: {}",
                        path.display(),
                        e
                    ))
                })
            }
        }
    }
}
