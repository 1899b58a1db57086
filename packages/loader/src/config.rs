//! Explorer configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) gives
//! the standard `assets/` layout:
//!
//! ```toml
//! data_root = "https://example.com/explorer-data/"
//!
//! [datasets]
//! regions = "sa1_2021.geojson"
//!
//! [http]
//! timeout_secs = 60
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use suburb_explorer_source::nominatim::DEFAULT_NOMINATIM_URL;

/// Errors raised while reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`ExplorerConfig`].
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    /// `data_root` looks like a URL but does not parse as one.
    #[error("Invalid data root URL {url:?}: {message}")]
    DataRoot {
        /// The configured root.
        url: String,
        /// Parser message.
        message: String,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Directory or `http(s)://` base URL the dataset paths are relative
    /// to.
    pub data_root: String,
    /// Dataset locations under [`Self::data_root`].
    pub datasets: DatasetPaths,
    /// HTTP client settings.
    pub http: HttpConfig,
    /// Nominatim search endpoint for address lookups.
    pub nominatim_url: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            data_root: "assets".to_string(),
            datasets: DatasetPaths::default(),
            http: HttpConfig::default(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
        }
    }
}

/// Relative locations of the datasets one load cycle reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetPaths {
    /// SA1 polygons. The only dataset whose absence fails the load.
    pub regions: String,
    /// School points.
    pub schools: String,
    /// School catchment polygons.
    pub catchments: String,
    /// Transit lines.
    pub transit: String,
    /// Overlay manifest (`{"layers": [...]}`). Overlay files are resolved
    /// relative to the data root, not to the manifest.
    pub manifest: String,
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self {
            regions: "sa1_2021.geojson".to_string(),
            schools: "schools_2019.geojson".to_string(),
            catchments: "school_catchments.geojson".to_string(),
            transit: "transit_services.geojson".to_string(),
            manifest: "arcgis_layers/index.json".to_string(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Where the datasets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataRoot {
    /// A local directory.
    Dir(PathBuf),
    /// A base URL. Always ends with `/` so relative paths join under it.
    Url(reqwest::Url),
}

impl ExplorerConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid TOML or has
    /// fields of the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Interprets [`Self::data_root`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DataRoot`] if the root starts with
    /// `http://` or `https://` but is not a valid URL.
    pub fn data_root(&self) -> Result<DataRoot, ConfigError> {
        let root = self.data_root.trim();
        let lower = root.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Ok(DataRoot::Dir(PathBuf::from(root)));
        }

        let with_slash = if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{root}/")
        };
        reqwest::Url::parse(&with_slash)
            .map(DataRoot::Url)
            .map_err(|e| ConfigError::DataRoot {
                url: root.to_string(),
                message: e.to_string(),
            })
    }

    /// Builds the HTTP client used for remote datasets and live queries.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the TLS backend cannot be initialised.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .user_agent(suburb_explorer_source::USER_AGENT)
            .timeout(std::time::Duration::from_secs(self.http.timeout_secs))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ExplorerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ExplorerConfig::default());
        assert_eq!(config.datasets.regions, "sa1_2021.geojson");
        assert_eq!(config.datasets.manifest, "arcgis_layers/index.json");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.data_root().unwrap(), DataRoot::Dir(PathBuf::from("assets")));
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config = ExplorerConfig::from_toml_str(
            r#"
            data_root = "https://data.example.com/explorer"

            [datasets]
            schools = "schools_2024.geojson"
            "#,
        )
        .unwrap();

        assert_eq!(config.datasets.schools, "schools_2024.geojson");
        assert_eq!(config.datasets.transit, "transit_services.geojson");
        match config.data_root().unwrap() {
            DataRoot::Url(url) => assert_eq!(url.as_str(), "https://data.example.com/explorer/"),
            DataRoot::Dir(dir) => panic!("expected URL root, got {}", dir.display()),
        }
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = ExplorerConfig::from_toml_str("[http]\ntimeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn malformed_url_root_is_rejected() {
        let config = ExplorerConfig {
            data_root: "https://".to_string(),
            ..ExplorerConfig::default()
        };
        assert!(matches!(config.data_root(), Err(ConfigError::DataRoot { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ExplorerConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
