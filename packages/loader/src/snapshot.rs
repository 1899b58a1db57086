//! Snapshot assembly.
//!
//! Runs once every fetch of a load cycle has settled. Only the region
//! dataset can fail the load; every other dataset degrades to a
//! [`DatasetWarning`] and an empty layer.

use std::collections::BTreeMap;

use serde::Serialize;
use suburb_explorer_layer_models::{
    CatchmentLevel, CatchmentSummary, Collection, Dataset, DatasetWarning, Manifest, Metadata,
    SchoolSummary, TransitGroup,
};
use suburb_explorer_metadata::build_metadata;
use suburb_explorer_schools::{ensure_stages, summarize};
use suburb_explorer_source::catchment::{group_catchments, summarize_catchments};
use suburb_explorer_source::transit::group_transit;

use crate::LoadError;
use crate::fetch::FetchError;

/// Everything one load cycle produced. Immutable once built; shared as
/// `Arc<Snapshot>`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// SA1 polygons.
    pub regions: Collection,
    /// Metadata derived from [`Self::regions`].
    pub metadata: Metadata,
    /// Schools, each carrying a `stage`.
    pub schools: Collection,
    /// Histograms over [`Self::schools`], absent when no school dataset
    /// loaded.
    pub school_summary: Option<SchoolSummary>,
    /// Non-empty catchment layers.
    pub catchments: BTreeMap<CatchmentLevel, Collection>,
    /// Catchment counts, absent when the dataset is missing or empty.
    pub catchment_summary: Option<CatchmentSummary>,
    /// Non-empty transit layers, or the whole feed under `all`.
    pub transit: BTreeMap<TransitGroup, Collection>,
    /// Overlays available for lazy loading.
    pub manifest: Manifest,
    /// Degraded datasets, in dataset order.
    pub warnings: Vec<DatasetWarning>,
}

/// The outcome of fetching one dataset.
#[derive(Debug)]
pub struct DatasetRead {
    /// Where the dataset was looked for.
    pub location: String,
    /// Raw bytes, `None` when absent.
    pub result: Result<Option<Vec<u8>>, FetchError>,
}

/// The settled fetches of one load cycle.
#[derive(Debug)]
pub struct RawDatasets {
    /// SA1 polygons.
    pub regions: DatasetRead,
    /// School points.
    pub schools: DatasetRead,
    /// Catchment polygons.
    pub catchments: DatasetRead,
    /// Transit lines.
    pub transit: DatasetRead,
    /// Overlay manifest.
    pub manifest: DatasetRead,
}

impl Snapshot {
    /// Builds a snapshot from settled fetches.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the region dataset is missing, unreadable
    /// or not a `FeatureCollection`.
    pub fn assemble(raw: RawDatasets) -> Result<Self, LoadError> {
        let mut warnings = Warnings::default();

        let regions = decode_regions(raw.regions)?;
        if regions.is_empty() {
            warnings.push(Dataset::Regions, "No SA1 features were loaded.");
        }
        let metadata = build_metadata(&regions);
        if metadata.irad_range.is_none() {
            warnings.push(
                Dataset::Regions,
                "No numeric IRAD_decile values found; regions use the fallback colour.",
            );
        }

        let (schools, school_summary) =
            match warnings.collection(Dataset::Schools, raw.schools) {
                Some(feed) => {
                    let schools = ensure_stages(&feed);
                    let summary = summarize(&schools);
                    if !summary.has_rankings {
                        warnings.push(
                            Dataset::Schools,
                            "Ranking attributes missing from the schools dataset.",
                        );
                    }
                    (schools, Some(summary))
                }
                None => (Collection::new(), None),
            };

        let (catchments, catchment_summary) =
            match warnings.collection(Dataset::Catchments, raw.catchments) {
                Some(feed) if feed.is_empty() => {
                    warnings.push(Dataset::Catchments, "Catchment dataset contains no features.");
                    (BTreeMap::new(), None)
                }
                Some(feed) => {
                    let groups = group_catchments(&feed);
                    if groups.is_empty() {
                        warnings.push(
                            Dataset::Catchments,
                            "Catchment features missing `catchment_level` attributes.",
                        );
                    }
                    let summary = summarize_catchments(&feed, &groups);
                    (groups, Some(summary))
                }
                None => (BTreeMap::new(), None),
            };

        let transit = match warnings.collection(Dataset::Transit, raw.transit) {
            Some(feed) => {
                if feed.is_empty() {
                    warnings.push(Dataset::Transit, "Transit dataset contains no features.");
                }
                group_transit(&feed)
            }
            None => BTreeMap::new(),
        };

        let manifest = warnings.manifest(raw.manifest).unwrap_or_default();

        Ok(Self {
            regions,
            metadata,
            schools,
            school_summary,
            catchments,
            catchment_summary,
            transit,
            manifest,
            warnings: warnings.into_inner(),
        })
    }
}

fn decode_regions(read: DatasetRead) -> Result<Collection, LoadError> {
    let DatasetRead { location, result } = read;
    match result {
        Ok(Some(bytes)) => serde_json::from_slice(&bytes)
            .map_err(|source| LoadError::PrimaryInvalid { location, source }),
        Ok(None) => Err(LoadError::PrimaryMissing { location }),
        Err(source) => Err(LoadError::PrimaryUnavailable { location, source }),
    }
}

#[derive(Default)]
struct Warnings(Vec<DatasetWarning>);

impl Warnings {
    fn push(&mut self, dataset: Dataset, message: impl Into<String>) {
        let warning = DatasetWarning::new(dataset, message);
        log::warn!("{warning}");
        self.0.push(warning);
    }

    /// Decodes a secondary dataset, recording a warning instead of failing.
    fn decode<T: serde::de::DeserializeOwned>(
        &mut self,
        dataset: Dataset,
        read: DatasetRead,
    ) -> Option<T> {
        let DatasetRead { location, result } = read;
        match result {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    self.push(dataset, format!("Failed to parse {location}: {e}"));
                    None
                }
            },
            Ok(None) => {
                self.push(dataset, format!("{location} not found."));
                None
            }
            Err(e) => {
                self.push(dataset, format!("Failed to load {location}: {e}"));
                None
            }
        }
    }

    fn collection(&mut self, dataset: Dataset, read: DatasetRead) -> Option<Collection> {
        self.decode(dataset, read)
    }

    fn manifest(&mut self, read: DatasetRead) -> Option<Manifest> {
        self.decode(Dataset::Manifest, read)
    }

    fn into_inner(self) -> Vec<DatasetWarning> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read(value: Option<serde_json::Value>) -> DatasetRead {
        DatasetRead {
            location: "memory:test".to_string(),
            result: Ok(value.map(|v| serde_json::to_vec(&v).unwrap())),
        }
    }

    fn collection(features: &[serde_json::Value]) -> serde_json::Value {
        json!({ "type": "FeatureCollection", "features": features })
    }

    fn region() -> serde_json::Value {
        json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[115.0, -32.0], [116.0, -32.0], [116.0, -31.0], [115.0, -32.0]]]
            },
            "properties": {
                "STE_NAME21": "Western Australia",
                "SA2_NAME21": "Perth City",
                "IRAD_decile": 6
            },
        })
    }

    fn point(properties: serde_json::Value) -> serde_json::Value {
        json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [115.86, -31.95] },
            "properties": properties,
        })
    }

    fn raw(regions: DatasetRead) -> RawDatasets {
        RawDatasets {
            regions,
            schools: read(None),
            catchments: read(None),
            transit: read(None),
            manifest: read(None),
        }
    }

    #[test]
    fn missing_regions_fail_the_load() {
        assert!(matches!(
            Snapshot::assemble(raw(read(None))),
            Err(LoadError::PrimaryMissing { .. })
        ));
    }

    #[test]
    fn unparseable_regions_fail_the_load() {
        let regions = DatasetRead {
            location: "memory:sa1".to_string(),
            result: Ok(Some(b"not json".to_vec())),
        };
        assert!(matches!(
            Snapshot::assemble(raw(regions)),
            Err(LoadError::PrimaryInvalid { .. })
        ));
    }

    #[test]
    fn missing_secondaries_become_warnings() {
        let snapshot = Snapshot::assemble(raw(read(Some(collection(&[region()]))))).unwrap();

        assert_eq!(snapshot.regions.len(), 1);
        assert_eq!(snapshot.metadata.states, vec!["Western Australia"]);
        assert!(snapshot.schools.is_empty());
        assert!(snapshot.school_summary.is_none());
        assert!(snapshot.catchments.is_empty());
        assert!(snapshot.transit.is_empty());

        let datasets: Vec<Dataset> = snapshot.warnings.iter().map(|w| w.dataset).collect();
        assert_eq!(
            datasets,
            vec![Dataset::Schools, Dataset::Catchments, Dataset::Transit, Dataset::Manifest]
        );
        assert_eq!(snapshot.warnings[0].message, "memory:test not found.");
    }

    #[test]
    fn assembles_every_dataset() {
        let raw = RawDatasets {
            regions: read(Some(collection(&[region()]))),
            schools: read(Some(collection(&[
                point(json!({
                    "schoolname": "A",
                    "lowyear": "KIN",
                    "highyear": "Y06",
                    "ranking_rank": 3
                })),
                point(json!({ "schoolname": "B", "lowyear": "Y07", "highyear": "Y12" })),
            ]))),
            catchments: read(Some(collection(&[
                point(json!({ "catchment_level": "primary" })),
                point(json!({ "catchment_level": "high" })),
            ]))),
            transit: read(Some(collection(&[point(json!({ "ROUTETYPE": "Train" }))]))),
            manifest: read(Some(json!({
                "layers": [{ "name": "bushfire", "file": "arcgis_layers/bushfire.geojson" }]
            }))),
        };

        let snapshot = Snapshot::assemble(raw).unwrap();
        assert!(snapshot.warnings.is_empty(), "{:?}", snapshot.warnings);

        let stages: Vec<_> = snapshot
            .schools
            .iter()
            .map(|f| f.property("stage").cloned())
            .collect();
        assert_eq!(stages, vec![Some(json!("primary")), Some(json!("secondary"))]);
        assert!(snapshot.school_summary.as_ref().unwrap().has_rankings);

        assert_eq!(snapshot.catchments.len(), 2);
        assert_eq!(snapshot.catchment_summary.as_ref().unwrap().count, 2);
        assert_eq!(snapshot.transit.keys().copied().collect::<Vec<_>>(), vec![TransitGroup::Train]);
        assert_eq!(snapshot.manifest.layers.len(), 1);
    }

    #[test]
    fn degraded_signals_are_reported() {
        let unranked_region = json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [115.0, -32.0] },
            "properties": { "STE_NAME21": "Western Australia", "IRAD_decile": "high" },
        });
        let raw = RawDatasets {
            regions: read(Some(collection(&[unranked_region]))),
            schools: read(Some(collection(&[point(json!({ "schoolname": "A" }))]))),
            catchments: read(Some(collection(&[point(json!({ "schoolname": "A" }))]))),
            transit: read(Some(collection(&[]))),
            manifest: read(Some(json!({ "layers": [] }))),
        };

        let snapshot = Snapshot::assemble(raw).unwrap();
        let messages: Vec<String> = snapshot.warnings.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "[regions] No numeric IRAD_decile values found; regions use the fallback colour.",
                "[schools] Ranking attributes missing from the schools dataset.",
                "[catchments] Catchment features missing `catchment_level` attributes.",
                "[transit] Transit dataset contains no features.",
            ]
        );
        assert_eq!(snapshot.catchment_summary.unwrap().count, 1);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let snapshot = Snapshot::assemble(raw(read(Some(collection(&[region()]))))).unwrap();
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("schoolSummary").is_some());
        assert_eq!(value["metadata"]["iradRange"], json!([6.0, 6.0]));
        assert_eq!(value["regions"]["type"], json!("FeatureCollection"));
    }
}
