#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared layer types for the suburb explorer.
//!
//! Every dataset the explorer loads (statistical-area polygons, schools,
//! catchments, transit lines, overlays) is normalized into a [`Collection`]
//! of immutable `GeoJSON` features. The derived values built on top of those
//! collections ([`Metadata`], [`SchoolSummary`], [`CatchmentSummary`]) live
//! here too so that every crate in the workspace agrees on their wire shape.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use geojson::{Feature, FeatureCollection, JsonValue};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

/// Property key holding the state or territory name of a region.
pub const STATE_KEY: &str = "STE_NAME21";

/// Property key holding the SA2 (sub-region) name of a region.
pub const SA2_KEY: &str = "SA2_NAME21";

/// Property key holding the SA1 code of a region.
pub const SA1_CODE_KEY: &str = "SA1_CODE21";

/// Numeric property driving the region choropleth.
pub const IRAD_DECILE_KEY: &str = "IRAD_decile";

/// An ordered sequence of features.
///
/// Features are held behind [`Arc`] so that filtering or back-filling a
/// single property produces a new collection which shares every untouched
/// feature with its source. Order is always the source insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    features: Vec<Arc<Feature>>,
}

impl Collection {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Wraps already-shared features without copying them.
    #[must_use]
    pub const fn from_shared(features: Vec<Arc<Feature>>) -> Self {
        Self { features }
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterates the features in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().map(AsRef::as_ref)
    }

    /// The shared feature handles, in insertion order.
    #[must_use]
    pub fn shared(&self) -> &[Arc<Feature>] {
        &self.features
    }

    /// Returns a new collection holding the features accepted by
    /// `predicate`, in their original order.
    #[must_use]
    pub fn filter<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&Feature) -> bool,
    {
        self.features
            .iter()
            .filter(|feature| predicate(feature))
            .cloned()
            .collect()
    }

    /// Copies the collection into a plain [`FeatureCollection`].
    #[must_use]
    pub fn to_feature_collection(&self) -> FeatureCollection {
        self.iter().cloned().collect()
    }
}

impl From<FeatureCollection> for Collection {
    fn from(value: FeatureCollection) -> Self {
        value.features.into_iter().collect()
    }
}

impl FromIterator<Feature> for Collection {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        Self {
            features: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

impl FromIterator<Arc<Feature>> for Collection {
    fn from_iter<T: IntoIterator<Item = Arc<Feature>>>(iter: T) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

struct SharedFeatures<'a>(&'a [Arc<Feature>]);

impl Serialize for SharedFeatures<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(AsRef::as_ref))
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "FeatureCollection")?;
        map.serialize_entry("features", &SharedFeatures(&self.features))?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        FeatureCollection::deserialize(deserializer).map(Self::from)
    }
}

/// Returns a property as trimmed, non-empty text.
///
/// Strings are trimmed; numbers and booleans use their JSON rendering.
/// `null`, arrays, objects, blank strings and missing keys yield `None`.
#[must_use]
pub fn property_text(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        JsonValue::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// Returns a string property without any conversion.
#[must_use]
pub fn property_str<'a>(feature: &'a Feature, key: &str) -> Option<&'a str> {
    feature.property(key).and_then(JsonValue::as_str)
}

/// Returns a property as a finite number. Numeric strings are **not**
/// coerced.
#[must_use]
pub fn property_f64(feature: &Feature, key: &str) -> Option<f64> {
    feature
        .property(key)
        .and_then(JsonValue::as_f64)
        .filter(|v| v.is_finite())
}

/// An axis-aligned bounding box in lon/lat degrees.
///
/// Serialized as `[minLon, minLat, maxLon, maxLat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bbox {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl Bbox {
    /// A degenerate box covering a single position.
    #[must_use]
    pub const fn from_point(lon: f64, lat: f64) -> Self {
        Self {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        }
    }

    /// Grows the box to include a position.
    pub fn extend(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }

    /// Midpoint of the box.
    #[must_use]
    pub fn center(&self) -> LatLng {
        LatLng {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lon: (self.min_lon + self.max_lon) / 2.0,
        }
    }
}

impl From<[f64; 4]> for Bbox {
    fn from([min_lon, min_lat, max_lon, max_lat]: [f64; 4]) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }
}

impl From<Bbox> for [f64; 4] {
    fn from(value: Bbox) -> Self {
        [value.min_lon, value.min_lat, value.max_lon, value.max_lat]
    }
}

/// A map location. Serialized as `[lat, lon]`, the order map widgets
/// expect for their centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(value: LatLng) -> Self {
        [value.lat, value.lon]
    }
}

/// A school's stage, derived from the year range it teaches.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Stage {
    /// Kindergarten / pre-primary through year 6.
    Primary,
    /// Year 7 and above.
    Secondary,
    /// Spans both primary and secondary years.
    Combined,
    /// Not determinable, or an unrecognized label.
    Other,
}

impl Stage {
    /// Every stage, in histogram order.
    pub const ALL: [Self; 4] = [Self::Primary, Self::Secondary, Self::Combined, Self::Other];

    /// Reads a stage label leniently; anything unrecognized is
    /// [`Stage::Other`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        label.trim().parse().unwrap_or(Self::Other)
    }
}

/// Sub-layer of the transit feed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransitGroup {
    /// Train lines.
    Train,
    /// Bus routes (standard, CAT and school services).
    Bus,
    /// Anything with a route type that is neither train nor bus.
    Other,
    /// The whole feed, used when no route type could be read at all.
    All,
}

/// Catchment sub-layer, matched exactly against `catchment_level`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CatchmentLevel {
    /// Primary school intake areas.
    Primary,
    /// High school intake areas.
    High,
    /// Any other catchment.
    Other,
}

impl CatchmentLevel {
    /// Every level, in layer order.
    pub const ALL: [Self; 3] = [Self::Primary, Self::High, Self::Other];
}

/// Derived description of the region polygon collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Distinct state names, sorted.
    pub states: Vec<String>,
    /// State name to its sorted, distinct SA2 names.
    pub sa2_by_state: BTreeMap<String, Vec<String>>,
    /// Envelope of every finite coordinate, if any.
    pub total_bounds: Option<Bbox>,
    /// Envelope of each state's polygons.
    pub state_bounds: BTreeMap<String, Bbox>,
    /// Centre of each state's envelope, rounded to 6 decimals.
    pub state_centers: BTreeMap<String, LatLng>,
    /// Number of region features.
    pub count: usize,
    /// Every property key seen, in order of first appearance.
    pub property_names: Vec<String>,
    /// `[min, max]` of the `IRAD_decile` values, if any were numeric.
    pub irad_range: Option<(f64, f64)>,
    /// Property names that carry SEIFA index values.
    pub seifa_columns: Vec<String>,
}

/// Frequency counts over the school collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolSummary {
    /// Number of schools.
    pub count: usize,
    /// Schools per sector label.
    pub sector_counts: BTreeMap<String, usize>,
    /// Schools per remoteness classification.
    pub remote_counts: BTreeMap<String, usize>,
    /// Schools per stage; every stage is present.
    pub stage_counts: BTreeMap<Stage, usize>,
    /// Whether any school carries a ranking.
    pub has_rankings: bool,
}

/// Feature counts over the catchment feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchmentSummary {
    /// Number of catchment features in the feed.
    pub count: usize,
    /// Features per non-empty level.
    pub levels: BTreeMap<CatchmentLevel, usize>,
}

/// One precomputed overlay listed in the layer manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestLayer {
    /// Display name.
    pub name: String,
    /// Path relative to the data root (e.g. `arcgis_layers/bike_paths.geojson`).
    pub file: String,
}

/// The overlay manifest (`arcgis_layers/index.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Listed overlays, in manifest order.
    #[serde(default)]
    pub layers: Vec<ManifestLayer>,
}

impl Manifest {
    /// Looks up an overlay by display name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ManifestLayer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    /// Display names, in manifest order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.name.as_str())
    }
}

/// The datasets a load cycle fetches.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Dataset {
    /// SA1 polygons with SEIFA attributes.
    Regions,
    /// School points.
    Schools,
    /// School catchment polygons.
    Catchments,
    /// Transit lines.
    Transit,
    /// The overlay manifest.
    Manifest,
}

/// A non-fatal problem found while loading one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetWarning {
    /// Which dataset the warning is about.
    pub dataset: Dataset,
    /// Human-readable description.
    pub message: String,
}

impl DatasetWarning {
    /// Creates a warning.
    #[must_use]
    pub fn new(dataset: Dataset, message: impl Into<String>) -> Self {
        Self {
            dataset,
            message: message.into(),
        }
    }
}

impl fmt::Display for DatasetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.dataset, self.message)
    }
}
