#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate flattening and envelope computation.
//!
//! All bounding-box math in the workspace goes through [`compute_bounds`]
//! so that total bounds, per-state bounds and overlay extents agree.
//! Coordinates are assumed to already be EPSG:4326 `[lon, lat]`.

use geojson::{Feature, Geometry, Value};
use suburb_explorer_layer_models::{Bbox, LatLng};

/// Decimal places kept on derived coordinates.
const COORDINATE_PRECISION: f64 = 1_000_000.0;

/// Collects every `[lon, lat]` pair of a geometry in traversal order,
/// descending into nested geometry collections.
///
/// Positions with fewer than two ordinates are skipped. Extra ordinates
/// (elevation) are dropped.
#[must_use]
pub fn flatten_coordinates(geometry: &Geometry) -> Vec<[f64; 2]> {
    let mut out = Vec::new();
    flatten_value(&geometry.value, &mut out);
    out
}

fn flatten_value(value: &Value, out: &mut Vec<[f64; 2]>) {
    match value {
        Value::Point(position) => push_position(position, out),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            positions.iter().for_each(|p| push_position(p, out));
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => lines
            .iter()
            .flatten()
            .for_each(|p| push_position(p, out)),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .flatten()
            .for_each(|p| push_position(p, out)),
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                flatten_value(&geometry.value, out);
            }
        }
    }
}

fn push_position(position: &[f64], out: &mut Vec<[f64; 2]>) {
    if let [lon, lat, ..] = position {
        out.push([*lon, *lat]);
    }
}

/// Envelope of every finite coordinate across `features`.
///
/// Returns `None` when no finite coordinate exists (empty input, features
/// without geometry, or only `NaN`/infinite positions). A single point
/// yields a degenerate box with `min == max`.
#[must_use]
pub fn compute_bounds<'a, I>(features: I) -> Option<Bbox>
where
    I: IntoIterator<Item = &'a Feature>,
{
    let mut bounds: Option<Bbox> = None;

    for geometry in features.into_iter().filter_map(|f| f.geometry.as_ref()) {
        for [lon, lat] in flatten_coordinates(geometry) {
            if !lon.is_finite() || !lat.is_finite() {
                continue;
            }
            match bounds.as_mut() {
                Some(b) => b.extend(lon, lat),
                None => bounds = Some(Bbox::from_point(lon, lat)),
            }
        }
    }

    bounds
}

/// Rounds a derived coordinate to 6 decimal places.
#[must_use]
pub fn round_coordinate(value: f64) -> f64 {
    (value * COORDINATE_PRECISION).round() / COORDINATE_PRECISION
}

/// Centre of a bounding box with both axes rounded.
#[must_use]
pub fn rounded_center(bbox: &Bbox) -> LatLng {
    let center = bbox.center();
    LatLng {
        lat: round_coordinate(center.lat),
        lon: round_coordinate(center.lon),
    }
}
