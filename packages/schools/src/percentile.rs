//! Percentile parsing and the "maximum school percentile" filter.

use geojson::JsonValue;
use suburb_explorer_layer_models::Collection;

use crate::RANKING_PERCENTILE_KEY;

/// Upper end of the percentile scale.
const MAX_PERCENTILE: f64 = 100.0;

/// Reads a percentage that may be a JSON number or a string such as
/// `" 87.5% "`.
///
/// Returns `None` for blanks, non-numeric text, non-finite values and any
/// other JSON type.
#[must_use]
pub fn parse_numeric_percentage(value: &JsonValue) -> Option<f64> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => {
            let trimmed = s.trim();
            let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
            trimmed.parse::<f64>().ok()
        }
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::Array(_) | JsonValue::Object(_) => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn school_percentile(school: &geojson::Feature) -> Option<f64> {
    school
        .property(RANKING_PERCENTILE_KEY)
        .and_then(parse_numeric_percentage)
}

/// The default upper bound of the percentile filter: the highest
/// percentile present, truncated and capped at 100.
///
/// `None` when no school has a readable percentile, which disables the
/// filter.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentile_ceiling(schools: &Collection) -> Option<u8> {
    schools
        .iter()
        .filter_map(school_percentile)
        .reduce(f64::max)
        .map(|max| max.clamp(0.0, MAX_PERCENTILE).trunc() as u8)
}

/// Keeps schools at or below `max_percentile`.
///
/// The filter is active only when `max_percentile` is below `ceiling`;
/// while active, schools without a percentile are dropped too. Schools
/// above `max_percentile` are always dropped.
#[must_use]
pub fn filter_by_percentile(schools: &Collection, max_percentile: u8, ceiling: u8) -> Collection {
    let active = max_percentile < ceiling;
    let max = f64::from(max_percentile);

    schools.filter(|school| match school_percentile(school) {
        Some(value) => value <= max,
        None => !active,
    })
}
