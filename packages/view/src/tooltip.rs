//! Hover tooltip field lists.

use std::collections::BTreeSet;

use serde::Serialize;
use suburb_explorer_layer_models::Collection;

/// One tooltip row: the property to show and its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TooltipField {
    /// Property key.
    pub field: String,
    /// Label shown before the value, including the trailing colon.
    pub alias: String,
}

impl TooltipField {
    fn new(field: &str, alias: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            alias: alias.into(),
        }
    }
}

const REGION_NAME_FIELDS: [(&str, &str); 4] = [
    ("SA1_NAME21", "SA1:"),
    ("SA2_NAME21", "SA2:"),
    ("SA3_NAME21", "SA3:"),
    ("STE_NAME21", "State:"),
];

const SCHOOL_FIELDS: [(&str, &str); 5] = [
    ("schoolname", "School:"),
    ("sector", "Sector:"),
    ("ranking_rank", "Rank:"),
    ("ranking_score", "Score:"),
    ("ranking_percentile", "Percentile:"),
];

const CATCHMENT_FIELDS: [(&str, &str); 6] = [
    ("schoolname", "School:"),
    ("catchment_level", "Level:"),
    ("catchment_type", "Type:"),
    ("catchment_notes", "Notes:"),
    ("catchment_score", "Score:"),
    ("catchment_score_strat", "Score stratification:"),
];

fn seifa_display_name(column: &str) -> Option<&'static str> {
    Some(match column {
        "IRSD_score" => "IRSD score",
        "IRSD_decile" => "IRSD decile",
        "IRAD_score" => "IRAD score",
        "IRAD_decile" => "IRAD decile",
        "IER_score" => "IER score",
        "IER_decile" => "IER decile",
        "IEO_score" => "IEO score",
        "IEO_decile" => "IEO decile",
        "URP" => "URP",
        _ => return None,
    })
}

/// Tooltip fields for SA1 polygons.
///
/// Region names come first (when the data has them), then each SEIFA
/// column except raw scores. Falls back to the first property (labelled
/// with its own name), then to the SA1 code, so the list is never empty.
#[must_use]
pub fn build_tooltip_fields(
    property_names: &[String],
    seifa_columns: &[String],
) -> Vec<TooltipField> {
    let mut fields: Vec<TooltipField> = REGION_NAME_FIELDS
        .iter()
        .filter(|(field, _)| property_names.iter().any(|name| name == field))
        .map(|(field, alias)| TooltipField::new(field, *alias))
        .collect();

    for column in seifa_columns {
        if column.ends_with("_score") || column.ends_with("_Score") {
            continue;
        }
        let alias = seifa_display_name(column).map_or_else(
            || format!("{column}:"),
            |display| format!("{display}:"),
        );
        fields.push(TooltipField {
            field: column.clone(),
            alias,
        });
    }

    if fields.is_empty() {
        fields.push(property_names.first().map_or_else(
            || TooltipField::new("SA1_CODE21", "SA1 code:"),
            |first| TooltipField::new(first, format!("{first}:")),
        ));
    }
    fields
}

fn present_fields(collection: &Collection, table: &[(&str, &str)]) -> Vec<TooltipField> {
    let keys: BTreeSet<&str> = collection
        .iter()
        .filter_map(|f| f.properties.as_ref())
        .flat_map(|props| props.keys().map(String::as_str))
        .collect();

    let mut fields: Vec<TooltipField> = table
        .iter()
        .filter(|(field, _)| keys.contains(field))
        .map(|(field, alias)| TooltipField::new(field, *alias))
        .collect();

    if fields.is_empty() {
        fields.push(TooltipField::new("schoolname", "School:"));
    }
    fields
}

/// Tooltip fields for school markers, limited to keys some school has.
#[must_use]
pub fn school_tooltip_fields(schools: &Collection) -> Vec<TooltipField> {
    present_fields(schools, &SCHOOL_FIELDS)
}

/// Tooltip fields for catchment polygons, limited to keys some catchment
/// has.
#[must_use]
pub fn catchment_tooltip_fields(catchments: &Collection) -> Vec<TooltipField> {
    present_fields(catchments, &CATCHMENT_FIELDS)
}
