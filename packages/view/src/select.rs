//! Resolving map clicks to schools and SA1 polygons, and state filtering.

use std::sync::Arc;

use geo::Contains;
use geojson::{Feature, Geometry, JsonObject, JsonValue, Value};
use suburb_explorer_layer_models::{Collection, LatLng, SA1_CODE_KEY, STATE_KEY, property_str};

/// Maximum per-axis distance, in degrees, between a click and a school.
pub const SCHOOL_CLICK_TOLERANCE: f64 = 1e-5;

const SCHOOL_NAME_KEY: &str = "schoolname";

/// What the map reported for the last click.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Click {
    /// Clicked position, if the map reported one.
    pub at: Option<LatLng>,
    /// Properties of the clicked layer feature, if any.
    pub properties: Option<JsonObject>,
}

/// The school and SA1 currently shown in the detail panel.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Selected school.
    pub school: Option<Arc<Feature>>,
    /// Selected SA1 polygon.
    pub region: Option<Arc<Feature>>,
}

/// Finds the first school whose point lies within
/// [`SCHOOL_CLICK_TOLERANCE`] of `at` on both axes.
#[must_use]
pub fn find_school_at(schools: &Collection, at: LatLng) -> Option<Arc<Feature>> {
    schools
        .shared()
        .iter()
        .find(|school| {
            let Some(Value::Point(coords)) = school.geometry.as_ref().map(|g| &g.value) else {
                return false;
            };
            let [lon, lat, ..] = coords.as_slice() else {
                return false;
            };
            (lat - at.lat).abs() <= SCHOOL_CLICK_TOLERANCE
                && (lon - at.lon).abs() <= SCHOOL_CLICK_TOLERANCE
        })
        .cloned()
}

fn code_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finds the SA1 whose `SA1_CODE21` renders the same as `code`.
#[must_use]
pub fn find_region_by_code(regions: &Collection, code: &JsonValue) -> Option<Arc<Feature>> {
    let code = code_text(code)?;
    regions
        .shared()
        .iter()
        .find(|region| {
            region
                .property(SA1_CODE_KEY)
                .and_then(code_text)
                .is_some_and(|c| c == code)
        })
        .cloned()
}

/// Finds the first SA1 polygon containing `at`. Features without a
/// polygonal geometry are skipped.
#[must_use]
pub fn find_region_at(regions: &Collection, at: LatLng) -> Option<Arc<Feature>> {
    let point = geo::Point::new(at.lon, at.lat);
    regions
        .shared()
        .iter()
        .find(|region| {
            let Some(geometry) = region.geometry.clone() else {
                return false;
            };
            let Ok(shape) = geo::Geometry::<f64>::try_from(geometry) else {
                return false;
            };
            match shape {
                geo::Geometry::Polygon(polygon) => polygon.contains(&point),
                geo::Geometry::MultiPolygon(polygons) => polygons.contains(&point),
                _ => false,
            }
        })
        .cloned()
}

/// The school the clicked marker itself describes: its properties, when
/// they carry a non-empty `schoolname`, placed at the click position.
fn clicked_school(click: &Click) -> Option<Arc<Feature>> {
    let properties = click.properties.as_ref()?;
    let named = match properties.get(SCHOOL_NAME_KEY)? {
        JsonValue::Null => false,
        JsonValue::String(s) => !s.is_empty(),
        _ => true,
    };
    if !named {
        return None;
    }

    Some(Arc::new(Feature {
        bbox: None,
        geometry: click
            .at
            .map(|at| Geometry::new(Value::Point(vec![at.lon, at.lat]))),
        id: None,
        properties: Some(properties.clone()),
        foreign_members: None,
    }))
}

/// Updates `previous` for a click.
///
/// The school is the clicked marker's own properties when they name a
/// school, else whichever marker sits at the click position; with no
/// schools loaded there is never a school. The SA1 is looked up by code
/// when the clicked feature carries `SA1_CODE21` (with no positional
/// fallback), else by position. A click that lands on a
/// school but no SA1 keeps the previous SA1; a click that hits neither
/// clears both.
#[must_use]
pub fn resolve_click(
    click: &Click,
    schools: &Collection,
    regions: &Collection,
    previous: &Selection,
) -> Selection {
    let school = if schools.is_empty() {
        None
    } else {
        clicked_school(click).or_else(|| click.at.and_then(|at| find_school_at(schools, at)))
    };

    let code = click
        .properties
        .as_ref()
        .and_then(|props| props.get(SA1_CODE_KEY))
        .filter(|code| code_text(code).is_some());
    let region = match code {
        Some(code) => find_region_by_code(regions, code),
        None => click.at.and_then(|at| find_region_at(regions, at)),
    };

    let region = match (region, &school) {
        (Some(region), _) => Some(region),
        (None, Some(_)) => previous.region.clone(),
        (None, None) => None,
    };
    log::debug!(
        "Click resolved: school={} region={}",
        school.is_some(),
        region.is_some()
    );

    Selection { school, region }
}

/// Keeps the features of one state (`STE_NAME21`). `None` keeps all.
#[must_use]
pub fn filter_by_state(collection: &Collection, state: Option<&str>) -> Collection {
    state.map_or_else(
        || collection.clone(),
        |state| collection.filter(|f| property_str(f, STATE_KEY) == Some(state)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(geometry: JsonValue, props: JsonValue) -> Feature {
        serde_json::from_value(json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": props,
        }))
        .unwrap()
    }

    /// One-degree square with its south-west corner at (`lon`, `lat`).
    fn ring(lon: f64, lat: f64) -> JsonValue {
        json!([[
            [lon, lat],
            [lon + 1.0, lat],
            [lon + 1.0, lat + 1.0],
            [lon, lat + 1.0],
            [lon, lat]
        ]])
    }

    fn regions() -> Collection {
        vec![
            feature(json!(null), json!({ "SA1_CODE21": "50101" })),
            feature(
                json!({ "type": "Polygon", "coordinates": ring(115.0, -32.0) }),
                json!({ "SA1_CODE21": "50102", "STE_NAME21": "Western Australia" }),
            ),
            feature(
                json!({ "type": "MultiPolygon", "coordinates": [ring(138.0, -35.0)] }),
                json!({ "SA1_CODE21": 50103, "STE_NAME21": "South Australia" }),
            ),
        ]
        .into_iter()
        .collect()
    }

    fn schools() -> Collection {
        vec![
            feature(
                json!({ "type": "Point", "coordinates": [115.5, -31.5] }),
                json!({ "schoolname": "A" }),
            ),
            feature(
                json!({ "type": "Point", "coordinates": [130.0, -20.0] }),
                json!({ "schoolname": "B" }),
            ),
        ]
        .into_iter()
        .collect()
    }

    fn name(feature: &Feature, key: &str) -> JsonValue {
        feature.property(key).cloned().unwrap_or(JsonValue::Null)
    }

    #[test]
    fn school_within_tolerance() {
        let near = LatLng {
            lat: -20.000_009,
            lon: 129.999_991,
        };
        let hit = find_school_at(&schools(), near).unwrap();
        assert_eq!(name(&hit, "schoolname"), json!("B"));
        assert!(find_school_at(&schools(), LatLng { lat: -20.0001, lon: 130.0 }).is_none());
    }

    #[test]
    fn region_by_position_handles_multipolygons() {
        let hit = find_region_at(&regions(), LatLng { lat: -31.5, lon: 115.5 }).unwrap();
        assert_eq!(name(&hit, "SA1_CODE21"), json!("50102"));

        let hit = find_region_at(&regions(), LatLng { lat: -34.5, lon: 138.5 }).unwrap();
        assert_eq!(name(&hit, "SA1_CODE21"), json!(50103));

        assert!(find_region_at(&regions(), LatLng { lat: 0.0, lon: 0.0 }).is_none());
    }

    #[test]
    fn region_by_code_compares_text() {
        let hit = find_region_by_code(&regions(), &json!("50103")).unwrap();
        assert_eq!(name(&hit, "SA1_CODE21"), json!(50103));
        assert!(find_region_by_code(&regions(), &json!("")).is_none());
    }

    #[test]
    fn code_lookup_has_no_positional_fallback() {
        let click = Click {
            at: Some(LatLng { lat: -31.5, lon: 115.5 }),
            properties: json!({ "SA1_CODE21": "99999" }).as_object().cloned(),
        };
        let selection =
            resolve_click(&click, &Collection::new(), &regions(), &Selection::default());
        assert!(selection.region.is_none());
    }

    #[test]
    fn school_click_keeps_previous_region() {
        let previous = Selection {
            school: None,
            region: regions().shared().first().cloned(),
        };
        let click = Click {
            at: Some(LatLng { lat: -20.0, lon: 130.0 }),
            properties: json!({ "schoolname": "B" }).as_object().cloned(),
        };

        let selection = resolve_click(&click, &schools(), &regions(), &previous);
        assert_eq!(name(selection.school.as_ref().unwrap(), "schoolname"), json!("B"));
        assert_eq!(name(selection.region.as_ref().unwrap(), "SA1_CODE21"), json!("50101"));
    }

    #[test]
    fn clicked_marker_properties_name_the_school() {
        let click = Click {
            at: Some(LatLng { lat: -31.4, lon: 115.4 }),
            properties: json!({ "schoolname": "Marker PS", "sector": "Government" })
                .as_object()
                .cloned(),
        };

        let selection = resolve_click(&click, &schools(), &regions(), &Selection::default());
        let school = selection.school.unwrap();
        assert_eq!(name(&school, "schoolname"), json!("Marker PS"));
        assert_eq!(name(&school, "sector"), json!("Government"));
        assert_eq!(
            school.geometry.as_ref().map(|g| g.value.clone()),
            Some(Value::Point(vec![115.4, -31.4]))
        );
        assert_eq!(name(selection.region.as_ref().unwrap(), "SA1_CODE21"), json!("50102"));
    }

    #[test]
    fn blank_school_name_falls_back_to_position() {
        let click = Click {
            at: Some(LatLng { lat: -20.0, lon: 130.0 }),
            properties: json!({ "schoolname": "" }).as_object().cloned(),
        };
        let selection = resolve_click(&click, &schools(), &regions(), &Selection::default());
        assert_eq!(name(selection.school.as_ref().unwrap(), "schoolname"), json!("B"));

        let without_schools =
            resolve_click(&click, &Collection::new(), &regions(), &Selection::default());
        assert!(without_schools.school.is_none());
    }

    #[test]
    fn click_on_school_inside_region_selects_both() {
        let click = Click {
            at: Some(LatLng { lat: -31.5, lon: 115.5 }),
            properties: None,
        };
        let selection = resolve_click(&click, &schools(), &regions(), &Selection::default());
        assert!(selection.school.is_some());
        assert_eq!(name(selection.region.as_ref().unwrap(), "SA1_CODE21"), json!("50102"));
    }

    #[test]
    fn empty_click_clears_selection() {
        let previous = Selection {
            school: schools().shared().first().cloned(),
            region: regions().shared().first().cloned(),
        };
        let click = Click {
            at: Some(LatLng { lat: 0.0, lon: 0.0 }),
            properties: None,
        };
        let selection = resolve_click(&click, &schools(), &regions(), &previous);
        assert!(selection.school.is_none());
        assert!(selection.region.is_none());
    }

    #[test]
    fn filters_by_state_name() {
        assert_eq!(filter_by_state(&regions(), None).len(), 3);
        let wa = filter_by_state(&regions(), Some("Western Australia"));
        assert_eq!(wa.len(), 1);
        assert_eq!(filter_by_state(&regions(), Some("Tasmania")).len(), 0);
    }
}
