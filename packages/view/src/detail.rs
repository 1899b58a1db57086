//! Detail panel lines for a selected school or SA1.

use geojson::{Feature, JsonValue};
use suburb_explorer_layer_models::property_text;

/// Labelled school properties, in display order.
pub const SCHOOL_DETAIL_FIELDS: &[(&str, &str)] = &[
    ("Sector", "sector"),
    ("Stage", "stage"),
    ("Education region", "educationr"),
    ("Rank", "ranking_rank"),
    ("Score", "ranking_score"),
    ("Ranking percentile", "ranking_percentile"),
    ("Enrolments", "totalschoo"),
    ("Address", "physicalst"),
    ("Town", "physicalto"),
    ("Postcode", "physicalpo"),
    ("Low year", "lowyear"),
    ("High year", "highyear"),
    ("Matched Name", "matched_key"),
];

/// Labelled SA1 properties, in display order.
pub const SA1_DETAIL_FIELDS: &[(&str, &str)] = &[
    ("SA1 name", "SA1_NAME21"),
    ("SA2 name", "SA2_NAME21"),
    ("SA3 name", "SA3_NAME21"),
    ("State", "STE_NAME21"),
    ("IRSD score", "IRSD_score"),
    ("IRAD score", "IRAD_score"),
    ("IER score", "IER_score"),
    ("IEO score", "IEO_score"),
    ("Usual resident population", "URP"),
];

/// Renders a property for display. Whole floats drop their fraction
/// (`12.0` → `"12"`); `null` renders as nothing.
#[must_use]
pub fn format_detail_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(match n.as_f64() {
            Some(v) if n.is_f64() && v.is_finite() && v.fract() == 0.0 => format!("{v:.0}"),
            _ => n.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

/// Renders a school code (`schoolcode`) as a plain integer where it is
/// numeric, else as trimmed text.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_school_code(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
            .map(|v| v.to_string()),
        JsonValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else if let Ok(code) = trimmed.parse::<i64>() {
                Some(code.to_string())
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

/// The `(label, value)` lines for `feature`, skipping absent and empty
/// values.
#[must_use]
pub fn detail_lines(
    feature: &Feature,
    fields: &[(&'static str, &str)],
) -> Vec<(&'static str, String)> {
    fields
        .iter()
        .filter_map(|(label, key)| {
            let value = format_detail_value(feature.property(key)?)?;
            (!value.is_empty()).then_some((*label, value))
        })
        .collect()
}

/// Panel heading for a school.
#[must_use]
pub fn school_heading(feature: &Feature) -> String {
    property_text(feature, "schoolname").unwrap_or_else(|| "School".to_string())
}

/// Panel heading for an SA1, falling back to its SA2 name.
#[must_use]
pub fn region_heading(feature: &Feature) -> Option<String> {
    property_text(feature, "SA1_NAME21").or_else(|| property_text(feature, "SA2_NAME21"))
}
