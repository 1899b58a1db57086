#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Load orchestration for the suburb explorer.
//!
//! A [`Loader`] fetches the five datasets of a load cycle concurrently,
//! waits for every one of them to settle and assembles an immutable
//! [`Snapshot`]. Only the region dataset is required. Every load takes a
//! [`CancellationToken`]; a cancelled load returns
//! [`LoadError::Cancelled`] and publishes nothing.
//!
//! [`Session`] holds the current snapshot for a consumer and cancels any
//! outstanding work when it is reloaded or dropped. Overlays are loaded
//! lazily through [`OverlayLoader`].

pub mod config;
pub mod fetch;
pub mod manifest;
pub mod overlay;
pub mod snapshot;

use std::sync::Arc;

pub use config::{ConfigError, DataRoot, DatasetPaths, ExplorerConfig};
pub use fetch::{DatasetFetcher, FetchError, FsFetcher, HttpFetcher, StaticFetcher};
pub use overlay::{OverlayError, OverlayLoader, OverlayMap, Settled};
pub use snapshot::{DatasetRead, RawDatasets, Snapshot};
pub use tokio_util::sync::CancellationToken;

/// Errors that fail a whole load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The region dataset does not exist.
    #[error("SA1 data not found: {location}")]
    PrimaryMissing {
        /// Where it was looked for.
        location: String,
    },

    /// The region dataset exists but could not be read.
    #[error("Failed to read SA1 data from {location}: {source}")]
    PrimaryUnavailable {
        /// Where it was read from.
        location: String,
        /// Underlying error.
        #[source]
        source: FetchError,
    },

    /// The region dataset is not a `GeoJSON` `FeatureCollection`.
    #[error("Failed to parse SA1 data from {location}: {source}")]
    PrimaryInvalid {
        /// Where it was read from.
        location: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The load was cancelled before it could publish.
    #[error("Load cancelled")]
    Cancelled,

    /// The configuration could not be turned into a loader.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Loads snapshots from one dataset source.
#[derive(Clone)]
pub struct Loader {
    fetcher: Arc<dyn DatasetFetcher>,
    paths: DatasetPaths,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader").field("paths", &self.paths).finish_non_exhaustive()
    }
}

impl Loader {
    /// Creates a loader reading `paths` through `fetcher`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn DatasetFetcher>, paths: DatasetPaths) -> Self {
        Self { fetcher, paths }
    }

    /// Creates a loader for the configured data root: a [`FsFetcher`] for
    /// a directory, an [`HttpFetcher`] for a URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the data root or HTTP client is invalid.
    pub fn from_config(config: &ExplorerConfig) -> Result<Self, ConfigError> {
        let fetcher: Arc<dyn DatasetFetcher> = match config.data_root()? {
            DataRoot::Dir(dir) => Arc::new(FsFetcher::new(dir)),
            DataRoot::Url(url) => Arc::new(HttpFetcher::new(config.http_client()?, url)),
        };
        Ok(Self::new(fetcher, config.datasets.clone()))
    }

    /// The fetcher datasets and overlays are read through.
    #[must_use]
    pub const fn fetcher(&self) -> &Arc<dyn DatasetFetcher> {
        &self.fetcher
    }

    /// The dataset locations.
    #[must_use]
    pub const fn paths(&self) -> &DatasetPaths {
        &self.paths
    }

    /// Runs one load cycle.
    ///
    /// All five fetches run concurrently and are each allowed to settle;
    /// a failed secondary dataset becomes a warning in the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Cancelled`] if `cancel` fires before the
    /// snapshot is ready, or a `Primary*` variant if the region dataset is
    /// unusable.
    pub async fn load(&self, cancel: &CancellationToken) -> Result<Snapshot, LoadError> {
        log::info!("Loading datasets...");

        let fetches = async {
            let (regions, schools, catchments, transit, manifest) = tokio::join!(
                self.read(&self.paths.regions),
                self.read(&self.paths.schools),
                self.read(&self.paths.catchments),
                self.read(&self.paths.transit),
                self.read(&self.paths.manifest),
            );
            RawDatasets {
                regions,
                schools,
                catchments,
                transit,
                manifest,
            }
        };

        let raw = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                log::info!("Load cancelled while fetching");
                return Err(LoadError::Cancelled);
            }
            raw = fetches => raw,
        };

        let snapshot = Snapshot::assemble(raw)?;

        if cancel.is_cancelled() {
            log::info!("Load cancelled before publishing");
            return Err(LoadError::Cancelled);
        }

        log::info!(
            "Loaded {} regions, {} schools, {} catchment layers, {} transit layers, {} overlays ({} warnings)",
            snapshot.regions.len(),
            snapshot.schools.len(),
            snapshot.catchments.len(),
            snapshot.transit.len(),
            snapshot.manifest.layers.len(),
            snapshot.warnings.len(),
        );
        Ok(snapshot)
    }

    async fn read(&self, path: &str) -> DatasetRead {
        let location = self.fetcher.locate(path);
        let result = self.fetcher.fetch(path).await;
        match &result {
            Ok(Some(bytes)) => log::debug!("Fetched {location} ({} bytes)", bytes.len()),
            Ok(None) => log::debug!("{location} not found"),
            Err(e) => log::debug!("Fetching {location} failed: {e}"),
        }
        DatasetRead { location, result }
    }
}

/// A consumer's view of the explorer data: the current snapshot and its
/// overlays.
///
/// Each reload runs under a fresh [`CancellationToken`] and cancels the
/// previous one first, so a slow earlier load can never publish over a
/// newer one. Overlay fetches of a snapshot are cancelled once a newer
/// snapshot replaces it. Dropping the session cancels everything it
/// started.
#[derive(Debug)]
pub struct Session {
    loader: Loader,
    root: CancellationToken,
    load: CancellationToken,
    snapshot: Option<Arc<Snapshot>>,
    overlays: Option<OverlayLoader>,
}

impl Session {
    /// Creates a session with nothing loaded yet.
    #[must_use]
    pub fn new(loader: Loader) -> Self {
        let root = CancellationToken::new();
        let load = root.child_token();
        Self {
            loader,
            root,
            load,
            snapshot: None,
            overlays: None,
        }
    }

    /// The loader this session uses.
    #[must_use]
    pub const fn loader(&self) -> &Loader {
        &self.loader
    }

    /// The current snapshot, if a load has completed.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    /// Overlays for the current snapshot.
    #[must_use]
    pub const fn overlays(&self) -> Option<&OverlayLoader> {
        self.overlays.as_ref()
    }

    /// Mutable access to the current snapshot's overlays.
    pub const fn overlays_mut(&mut self) -> Option<&mut OverlayLoader> {
        self.overlays.as_mut()
    }

    /// A handle that cancels all of the session's work when fired, e.g.
    /// from a shutdown signal handler.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Cancels any outstanding load and loads a new snapshot. On success
    /// the snapshot replaces the previous one and the overlay map starts
    /// empty; on failure the previous snapshot and its overlays are kept.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the load fails or is cancelled.
    pub async fn reload(&mut self) -> Result<Arc<Snapshot>, LoadError> {
        self.load.cancel();
        self.load = self.root.child_token();
        let token = self.load.clone();

        let snapshot = Arc::new(self.loader.load(&token).await?);
        if token.is_cancelled() {
            return Err(LoadError::Cancelled);
        }

        if let Some(previous) = self.overlays.take() {
            previous.cancel();
        }
        self.overlays = Some(OverlayLoader::new(
            Arc::clone(self.loader.fetcher()),
            snapshot.manifest.clone(),
            self.root.child_token(),
        ));
        self.snapshot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
