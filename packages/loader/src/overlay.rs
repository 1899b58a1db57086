//! Lazy overlay layers.
//!
//! Overlays listed in the manifest are fetched only when requested, each
//! in its own task. Settled results are merged by the owner of the
//! [`OverlayLoader`] into a fresh `Arc` map, so readers holding the
//! previous map never observe a change.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use suburb_explorer_layer_models::{Collection, Manifest};
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::fetch::{DatasetFetcher, FetchError};

/// Loaded overlays by display name.
pub type OverlayMap = BTreeMap<String, Arc<Collection>>;

/// Errors raised for a single overlay.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// The name is not in the manifest.
    #[error("Unknown overlay layer {name:?}")]
    UnknownLayer {
        /// Requested name.
        name: String,
    },

    /// The manifest entry points at a missing file.
    #[error("Overlay {name:?} not found at {location}")]
    NotFound {
        /// Overlay name.
        name: String,
        /// Where it was looked for.
        location: String,
    },

    /// The file could not be fetched.
    #[error("Failed to load overlay {name:?}: {source}")]
    Fetch {
        /// Overlay name.
        name: String,
        /// Underlying error.
        #[source]
        source: FetchError,
    },

    /// The file is not a `GeoJSON` `FeatureCollection`.
    #[error("Overlay {name:?} is not valid GeoJSON: {source}")]
    Parse {
        /// Overlay name.
        name: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The overlay task panicked or was aborted.
    #[error("Overlay {name:?} task failed: {message}")]
    Task {
        /// Overlay name.
        name: String,
        /// Join error message.
        message: String,
    },
}

/// One settled overlay request.
#[derive(Debug)]
pub struct Settled {
    /// Overlay name.
    pub name: String,
    /// The merged layer, or why it could not be loaded.
    pub result: Result<Arc<Collection>, OverlayError>,
}

/// Fetches manifest overlays on demand.
pub struct OverlayLoader {
    fetcher: Arc<dyn DatasetFetcher>,
    manifest: Manifest,
    cancel: CancellationToken,
    layers: Arc<OverlayMap>,
    in_flight: BTreeSet<String>,
    task_names: HashMap<Id, String>,
    tasks: JoinSet<(String, Option<Result<Collection, OverlayError>>)>,
}

impl std::fmt::Debug for OverlayLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayLoader")
            .field("manifest", &self.manifest)
            .field("loaded", &self.layers.keys().collect::<Vec<_>>())
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl OverlayLoader {
    /// Creates a loader for the overlays listed in `manifest`. Cancelling
    /// `cancel` stops every outstanding fetch and discards its result.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn DatasetFetcher>,
        manifest: Manifest,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            manifest,
            cancel,
            layers: Arc::new(OverlayMap::new()),
            in_flight: BTreeSet::new(),
            task_names: HashMap::new(),
            tasks: JoinSet::new(),
        }
    }

    /// The manifest this loader resolves names against.
    #[must_use]
    pub const fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The current overlay map.
    #[must_use]
    pub fn layers(&self) -> Arc<OverlayMap> {
        Arc::clone(&self.layers)
    }

    /// A loaded overlay by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Collection>> {
        self.layers.get(name).cloned()
    }

    /// Whether `name` is currently being fetched.
    #[must_use]
    pub fn is_loading(&self, name: &str) -> bool {
        self.in_flight.contains(name)
    }

    /// Number of fetches not yet settled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Starts fetching `name` unless it is already loaded or in flight.
    ///
    /// Returns whether a fetch was started. Must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::UnknownLayer`] if the manifest has no such
    /// layer.
    pub fn request(&mut self, name: &str) -> Result<bool, OverlayError> {
        if self.layers.contains_key(name) || self.in_flight.contains(name) {
            log::debug!("Overlay {name:?} already loaded or loading");
            return Ok(false);
        }

        let layer = self
            .manifest
            .find(name)
            .ok_or_else(|| OverlayError::UnknownLayer {
                name: name.to_string(),
            })?;

        let fetcher = Arc::clone(&self.fetcher);
        let cancel = self.cancel.clone();
        let name = layer.name.clone();
        let file = layer.file.clone();

        log::info!("Loading overlay {name:?} from {}", fetcher.locate(&file));
        let task_name = name.clone();
        let handle = self.tasks.spawn(async move {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = fetch_overlay(fetcher.as_ref(), &task_name, &file) => Some(result),
            };
            (task_name, result)
        });

        self.task_names.insert(handle.id(), name.clone());
        self.in_flight.insert(name);
        Ok(true)
    }

    /// Cancels every outstanding fetch. Their results are discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Adds a layer that did not come from the manifest, such as a live
    /// `ArcGIS` query or an uploaded KML file. Replaces any layer of the
    /// same name.
    pub fn insert(&mut self, name: impl Into<String>, collection: Collection) -> Arc<Collection> {
        let layer = Arc::new(collection);
        self.merge(name.into(), Arc::clone(&layer));
        layer
    }

    /// Waits for the next fetch to settle and merges it.
    ///
    /// Returns `None` when nothing is in flight. Cancelled fetches are
    /// dropped without being reported.
    pub async fn next_settled(&mut self) -> Option<Settled> {
        loop {
            let joined = self.tasks.join_next_with_id().await?;

            let (name, outcome) = match joined {
                Ok((id, (name, outcome))) => {
                    self.task_names.remove(&id);
                    (name, outcome)
                }
                Err(e) => {
                    let name = self.task_names.remove(&e.id()).unwrap_or_default();
                    let message = e.to_string();
                    (name.clone(), Some(Err(OverlayError::Task { name, message })))
                }
            };
            self.in_flight.remove(&name);

            let Some(result) = outcome.filter(|_| !self.cancel.is_cancelled()) else {
                log::debug!("Overlay {name:?} discarded after cancellation");
                continue;
            };

            let result = result.map(|collection| {
                log::info!("Overlay {name:?} loaded with {} features", collection.len());
                let layer = Arc::new(collection);
                self.merge(name.clone(), Arc::clone(&layer));
                layer
            });
            if let Err(e) = &result {
                log::warn!("{e}");
            }

            return Some(Settled { name, result });
        }
    }

    /// Waits for every outstanding fetch and returns them in settle order.
    pub async fn settle_all(&mut self) -> Vec<Settled> {
        let mut settled = Vec::new();
        while let Some(next) = self.next_settled().await {
            settled.push(next);
        }
        settled
    }

    fn merge(&mut self, name: String, layer: Arc<Collection>) {
        let mut next = OverlayMap::clone(&self.layers);
        next.insert(name, layer);
        self.layers = Arc::new(next);
    }
}

async fn fetch_overlay(
    fetcher: &dyn DatasetFetcher,
    name: &str,
    file: &str,
) -> Result<Collection, OverlayError> {
    let bytes = fetcher
        .fetch(file)
        .await
        .map_err(|source| OverlayError::Fetch {
            name: name.to_string(),
            source,
        })?
        .ok_or_else(|| OverlayError::NotFound {
            name: name.to_string(),
            location: fetcher.locate(file),
        })?;

    serde_json::from_slice(&bytes).map_err(|source| OverlayError::Parse {
        name: name.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use async_trait::async_trait;
    use suburb_explorer_layer_models::ManifestLayer;

    const LAYER: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","geometry":{"type":"Point","coordinates":[115.8,-31.9]},"properties":{"name":"a"}}
    ]}"#;

    fn manifest(names: &[&str]) -> Manifest {
        Manifest {
            layers: names
                .iter()
                .map(|name| ManifestLayer {
                    name: (*name).to_string(),
                    file: format!("arcgis_layers/{name}.geojson"),
                })
                .collect(),
        }
    }

    fn loader(fetcher: impl DatasetFetcher + 'static, names: &[&str]) -> OverlayLoader {
        OverlayLoader::new(Arc::new(fetcher), manifest(names), CancellationToken::new())
    }

    #[tokio::test]
    async fn loads_requested_overlay() {
        let fetcher = StaticFetcher::new().with_file("arcgis_layers/flood.geojson", LAYER);
        let mut overlays = loader(fetcher, &["flood"]);

        let before = overlays.layers();
        assert!(overlays.request("flood").unwrap());
        assert!(overlays.is_loading("flood"));

        let settled = overlays.settle_all().await;
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].name, "flood");
        assert_eq!(settled[0].result.as_ref().unwrap().len(), 1);

        assert!(before.is_empty());
        assert_eq!(overlays.layers().keys().collect::<Vec<_>>(), vec!["flood"]);
        assert_eq!(overlays.pending(), 0);
    }

    #[tokio::test]
    async fn duplicate_requests_are_ignored() {
        let fetcher = StaticFetcher::new().with_file("arcgis_layers/flood.geojson", LAYER);
        let mut overlays = loader(fetcher, &["flood"]);

        assert!(overlays.request("flood").unwrap());
        assert!(!overlays.request("flood").unwrap());
        assert_eq!(overlays.settle_all().await.len(), 1);

        assert!(!overlays.request("flood").unwrap());
        assert!(overlays.next_settled().await.is_none());
    }

    #[tokio::test]
    async fn unknown_and_missing_layers_are_errors() {
        let mut overlays = loader(StaticFetcher::new(), &["flood"]);

        assert!(matches!(
            overlays.request("bushfire"),
            Err(OverlayError::UnknownLayer { .. })
        ));

        overlays.request("flood").unwrap();
        let settled = overlays.next_settled().await.unwrap();
        assert!(matches!(settled.result, Err(OverlayError::NotFound { .. })));
        assert!(overlays.get("flood").is_none());
    }

    #[tokio::test]
    async fn invalid_geojson_is_a_parse_error() {
        let fetcher = StaticFetcher::new().with_file("arcgis_layers/flood.geojson", "[1, 2]");
        let mut overlays = loader(fetcher, &["flood"]);

        overlays.request("flood").unwrap();
        let settled = overlays.next_settled().await.unwrap();
        assert!(matches!(settled.result, Err(OverlayError::Parse { .. })));
    }

    struct NeverFetcher;

    #[async_trait]
    impl DatasetFetcher for NeverFetcher {
        fn locate(&self, path: &str) -> String {
            path.to_string()
        }

        async fn fetch(&self, _path: &str) -> Result<Option<Vec<u8>>, FetchError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancelled_fetches_publish_nothing() {
        let cancel = CancellationToken::new();
        let mut overlays =
            OverlayLoader::new(Arc::new(NeverFetcher), manifest(&["flood"]), cancel.clone());

        overlays.request("flood").unwrap();
        cancel.cancel();

        assert!(overlays.next_settled().await.is_none());
        assert!(overlays.layers().is_empty());
        assert_eq!(overlays.pending(), 0);
    }

    #[test]
    fn inserted_layers_join_the_map() {
        let mut overlays = loader(StaticFetcher::new(), &[]);
        let before = overlays.layers();
        overlays.insert("Live query", Collection::new());

        assert!(before.is_empty());
        assert!(overlays.get("Live query").is_some());
    }

    #[tokio::test]
    async fn inserted_layer_sits_beside_manifest_layers() {
        let fetcher = StaticFetcher::new().with_file("arcgis_layers/flood.geojson", LAYER);
        let mut overlays = loader(fetcher, &["flood"]);
        overlays.request("flood").unwrap();
        overlays.settle_all().await;

        let uploaded: Collection = overlays.get("flood").unwrap().iter().cloned().collect();
        let inserted = overlays.insert("bus_routes", uploaded);

        assert_eq!(
            overlays.layers().keys().collect::<Vec<_>>(),
            vec!["bus_routes", "flood"]
        );
        assert!(Arc::ptr_eq(&overlays.get("bus_routes").unwrap(), &inserted));
        assert!(overlays.manifest().find("bus_routes").is_none());
        assert!(!overlays.request("flood").unwrap());

        let replaced = overlays.insert("bus_routes", Collection::new());
        assert!(replaced.is_empty());
        assert!(overlays.get("bus_routes").unwrap().is_empty());
    }
}
