//! Dataset fetchers.
//!
//! A [`DatasetFetcher`] resolves a dataset path relative to some root and
//! returns its raw bytes. `Ok(None)` means the dataset does not exist,
//! which callers treat differently from a failed read.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use suburb_explorer_source::{SourceError, retry};

/// Errors raised while fetching a dataset.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Reading a local file failed for a reason other than absence.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The remote request failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The dataset path does not form a valid URL under the base.
    #[error("Invalid dataset path {path:?}: {message}")]
    Path {
        /// Requested path.
        path: String,
        /// Parser message.
        message: String,
    },
}

/// Source of raw dataset bytes.
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    /// Human-readable location of `path`, used in log lines and warnings.
    fn locate(&self, path: &str) -> String;

    /// Fetches the dataset at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the dataset exists but cannot be read.
    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, FetchError>;
}

/// Reads datasets from a local directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    /// Creates a fetcher rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DatasetFetcher for FsFetcher {
    fn locate(&self, path: &str) -> String {
        self.root.join(path).display().to_string()
    }

    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, FetchError> {
        let full = self.root.join(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FetchError::Io { path: full, source }),
        }
    }
}

/// Downloads datasets from a base URL. HTTP 404 means "not found".
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base: reqwest::Url,
}

impl HttpFetcher {
    /// Creates a fetcher under `base`, which should end with `/`.
    #[must_use]
    pub const fn new(client: reqwest::Client, base: reqwest::Url) -> Self {
        Self { client, base }
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, FetchError> {
        self.base.join(path).map_err(|e| FetchError::Path {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl DatasetFetcher for HttpFetcher {
    fn locate(&self, path: &str) -> String {
        self.url(path)
            .map_or_else(|_| format!("{}{path}", self.base), |url| url.to_string())
    }

    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, FetchError> {
        let url = self.url(path)?;
        let response = match retry::send(&|| self.client.get(url.clone())).await {
            Ok(response) => response,
            Err(SourceError::Status { status, .. }) if status == reqwest::StatusCode::NOT_FOUND => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let bytes = response.bytes().await.map_err(SourceError::from)?;
        Ok(Some(bytes.to_vec()))
    }
}

/// Serves datasets from memory.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    files: BTreeMap<String, Vec<u8>>,
}

impl StaticFetcher {
    /// Creates an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dataset.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    /// Adds or replaces a dataset.
    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }
}

#[async_trait]
impl DatasetFetcher for StaticFetcher {
    fn locate(&self, path: &str) -> String {
        format!("memory:{path}")
    }

    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, FetchError> {
        Ok(self.files.get(path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_fetcher_maps_absence_to_none() {
        let tmp = std::env::temp_dir().join("suburb_explorer_fs_fetcher_test");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(tmp.join("arcgis_layers")).unwrap();
        std::fs::write(tmp.join("arcgis_layers/index.json"), b"{}").unwrap();

        let fetcher = FsFetcher::new(&tmp);
        assert_eq!(
            fetcher.fetch("arcgis_layers/index.json").await.unwrap(),
            Some(b"{}".to_vec())
        );
        assert_eq!(fetcher.fetch("missing.geojson").await.unwrap(), None);
        assert!(fetcher.locate("x.geojson").ends_with("x.geojson"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn static_fetcher_serves_inserted_files() {
        let fetcher = StaticFetcher::new().with_file("a.geojson", "{}");
        assert_eq!(fetcher.fetch("a.geojson").await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(fetcher.fetch("b.geojson").await.unwrap(), None);
    }

    #[test]
    fn http_fetcher_joins_under_base() {
        let base = reqwest::Url::parse("https://data.example.com/explorer/").unwrap();
        let fetcher = HttpFetcher::new(reqwest::Client::new(), base);
        assert_eq!(
            fetcher.locate("arcgis_layers/index.json"),
            "https://data.example.com/explorer/arcgis_layers/index.json"
        );
    }
}
