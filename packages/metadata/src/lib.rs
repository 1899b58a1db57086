#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Metadata derived from the region (SA1) polygon collection.
//!
//! [`build_metadata`] makes one linear pass to collect property names, the
//! state → SA2 grouping and the `IRAD_decile` range, then a second pass per
//! state to compute bounds through [`suburb_explorer_geometry`]. Every
//! set is materialized in sorted order so the output is a pure function of
//! the input.

use std::collections::{BTreeMap, BTreeSet};

use suburb_explorer_geometry::{compute_bounds, rounded_center};
use suburb_explorer_layer_models::{
    Collection, IRAD_DECILE_KEY, Metadata, SA2_KEY, STATE_KEY, property_f64, property_text,
};

/// Property-name prefixes of the SEIFA index columns.
pub const SEIFA_PREFIXES: &[&str] = &["IRSD_", "IRAD_", "IER_", "IEO_"];

/// The usual-resident-population column, reported alongside SEIFA.
pub const SEIFA_POPULATION_COLUMN: &str = "URP";

/// Builds the [`Metadata`] for a region collection.
#[must_use]
pub fn build_metadata(regions: &Collection) -> Metadata {
    let mut property_names: Vec<String> = Vec::new();
    let mut seen_names: BTreeSet<&str> = BTreeSet::new();
    let mut sa2_by_state: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut irad_range: Option<(f64, f64)> = None;

    for feature in regions.iter() {
        if let Some(properties) = &feature.properties {
            for key in properties.keys() {
                if seen_names.insert(key) {
                    property_names.push(key.clone());
                }
            }
        }

        if let Some(state) = property_text(feature, STATE_KEY) {
            let sa2s = sa2_by_state.entry(state).or_default();
            if let Some(sa2) = property_text(feature, SA2_KEY) {
                sa2s.insert(sa2);
            }
        }

        if let Some(value) = property_f64(feature, IRAD_DECILE_KEY) {
            irad_range = Some(match irad_range {
                Some((min, max)) => (min.min(value), max.max(value)),
                None => (value, value),
            });
        }
    }

    let mut state_bounds = BTreeMap::new();
    let mut state_centers = BTreeMap::new();
    for state in sa2_by_state.keys() {
        let in_state = regions
            .iter()
            .filter(|f| property_text(f, STATE_KEY).as_deref() == Some(state.as_str()));
        if let Some(bbox) = compute_bounds(in_state) {
            state_centers.insert(state.clone(), rounded_center(&bbox));
            state_bounds.insert(state.clone(), bbox);
        }
    }

    let seifa_columns = seifa_columns(&property_names);

    log::debug!(
        "Region metadata: {} features, {} states, {} properties, {} SEIFA columns",
        regions.len(),
        sa2_by_state.len(),
        property_names.len(),
        seifa_columns.len(),
    );

    Metadata {
        states: sa2_by_state.keys().cloned().collect(),
        sa2_by_state: sa2_by_state
            .into_iter()
            .map(|(state, sa2s)| (state, sa2s.into_iter().collect()))
            .collect(),
        total_bounds: compute_bounds(regions.iter()),
        state_bounds,
        state_centers,
        count: regions.len(),
        property_names,
        irad_range,
        seifa_columns,
    }
}

/// Selects the SEIFA columns out of a list of property names, keeping
/// their order.
#[must_use]
pub fn seifa_columns(property_names: &[String]) -> Vec<String> {
    property_names
        .iter()
        .filter(|name| is_seifa_column(name))
        .cloned()
        .collect()
}

fn is_seifa_column(name: &str) -> bool {
    name == SEIFA_POPULATION_COLUMN || SEIFA_PREFIXES.iter().any(|p| name.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn region(
        state: Option<&str>,
        sa2: Option<&str>,
        lon: f64,
        lat: f64,
        extra: serde_json::Value,
    ) -> geojson::Feature {
        let mut properties = json!({});
        if let Some(state) = state {
            properties[STATE_KEY] = json!(state);
        }
        if let Some(sa2) = sa2 {
            properties[SA2_KEY] = json!(sa2);
        }
        if let serde_json::Value::Object(extra) = extra {
            for (k, v) in extra {
                properties[k] = v;
            }
        }
        serde_json::from_value(json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[lon, lat], [lon + 1.0, lat], [lon + 1.0, lat + 1.0], [lon, lat]]],
            },
            "properties": properties,
        }))
        .unwrap()
    }

    fn sample() -> Collection {
        vec![
            region(
                Some("Western Australia"),
                Some("Perth City"),
                115.0,
                -32.0,
                json!({ "IRAD_decile": 7 }),
            ),
            region(Some("Victoria"), Some("Carlton"), 144.0, -38.0, json!({ "IRAD_decile": "9" })),
            region(
                Some("Western Australia"),
                Some("Fremantle"),
                115.5,
                -32.5,
                json!({ "IRAD_decile": 2, "URP": 300 }),
            ),
            region(
                Some("Western Australia"),
                Some("Perth City"),
                116.0,
                -31.5,
                json!({ "IRSD_score": 1000.5 }),
            ),
            region(Some("Victoria"), None, 145.0, -37.0, json!({ "IRAD_decile": null })),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn groups_states_and_sa2_sorted() {
        let meta = build_metadata(&sample());

        assert_eq!(meta.states, vec!["Victoria", "Western Australia"]);
        assert_eq!(meta.sa2_by_state["Western Australia"], vec!["Fremantle", "Perth City"]);
        assert_eq!(meta.sa2_by_state["Victoria"], vec!["Carlton"]);
        assert_eq!(meta.count, 5);
    }

    #[test]
    fn irad_range_ignores_strings_and_nulls() {
        let meta = build_metadata(&sample());
        assert_eq!(meta.irad_range, Some((2.0, 7.0)));
    }

    #[test]
    fn irad_range_absent_when_no_numeric_values() {
        let hobart = region(
            Some("Tasmania"),
            Some("Hobart"),
            147.0,
            -42.0,
            json!({ "IRAD_decile": "n/a" }),
        );
        let regions: Collection = std::iter::once(hobart).collect();
        assert_eq!(build_metadata(&regions).irad_range, None);
    }

    #[test]
    fn property_names_in_first_appearance_order() {
        let meta = build_metadata(&sample());
        assert_eq!(
            meta.property_names,
            vec![STATE_KEY, SA2_KEY, "IRAD_decile", "URP", "IRSD_score"]
        );
        assert_eq!(meta.seifa_columns, vec!["IRAD_decile", "URP", "IRSD_score"]);
    }

    #[test]
    fn state_bounds_match_member_polygons() {
        let meta = build_metadata(&sample());
        let wa = meta.state_bounds["Western Australia"];
        assert_eq!(<[f64; 4]>::from(wa), [115.0, -32.5, 117.0, -30.5]);

        let center = meta.state_centers["Western Australia"];
        assert!((center.lat - -31.5).abs() < f64::EPSILON);
        assert!((center.lon - 116.0).abs() < f64::EPSILON);

        let total = meta.total_bounds.unwrap();
        assert_eq!(<[f64; 4]>::from(total), [115.0, -38.0, 146.0, -30.5]);
    }

    #[test]
    fn empty_collection_has_no_bounds() {
        let meta = build_metadata(&Collection::new());
        assert!(meta.states.is_empty());
        assert!(meta.total_bounds.is_none());
        assert!(meta.irad_range.is_none());
    }

    #[test]
    fn output_is_deterministic() {
        let regions = sample();
        let first = serde_json::to_string(&build_metadata(&regions)).unwrap();
        let second = serde_json::to_string(&build_metadata(&regions)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn seifa_filter_is_prefix_based() {
        let names: Vec<String> = [
            "IEO_decile",
            "IER_score",
            "URP",
            "URP_total",
            "SA1_CODE21",
            "xIRSD_score",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(seifa_columns(&names), vec!["IEO_decile", "IER_score", "URP"]);
    }
}
