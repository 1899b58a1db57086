//! Fixed label and style tables for the secondary layers.

use suburb_explorer_layer_models::TransitGroup;
use suburb_explorer_schools::SchoolGroup;

use crate::Style;

const GOVERNMENT_COLOR: &str = "#2d9cdb";
const NON_GOVERNMENT_COLOR: &str = "#9b5de5";
const CATCHMENT_FALLBACK_COLOR: &str = "#6d597a";
const LIVE_OVERLAY_COLOR: &str = "#8f2d56";
const PROCESSED_OVERLAY_COLOR: &str = "#8338ec";

/// Capitalizes the first letter of every alphabetic run and lower-cases
/// the rest (`"non-government"` → `"Non-Government"`).
#[must_use]
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Human label for a lower-cased sector key.
#[must_use]
pub fn sector_label(sector: &str) -> String {
    match sector {
        "government" => "Government".to_string(),
        "non-government" => "Non-Government".to_string(),
        "community kinder" => "Community Kinder".to_string(),
        "independent pre" => "Independent Pre-school".to_string(),
        other => title_case(other),
    }
}

/// Marker colour for a sector. Anything mentioning "non" is treated as
/// non-government.
#[must_use]
pub fn school_color(sector: &str) -> &'static str {
    if sector.to_lowercase().contains("non") {
        NON_GOVERNMENT_COLOR
    } else {
        GOVERNMENT_COLOR
    }
}

/// Circle-marker style for a sector.
#[must_use]
pub fn school_style(sector: &str) -> Style {
    Style::filled(school_color(sector), 2, 0.8)
}

/// Layer name for a sector/stage group, e.g. `"Government - Primary"`.
#[must_use]
pub fn school_layer_name(group: &SchoolGroup) -> String {
    format!(
        "{} - {}",
        sector_label(&group.sector),
        title_case(group.stage.as_ref())
    )
}

/// Colour for a `catchment_level` value.
#[must_use]
pub fn catchment_color(level: &str) -> &'static str {
    match level {
        "primary" => "#2e7d32",
        "high" => "#1565c0",
        _ => CATCHMENT_FALLBACK_COLOR,
    }
}

/// Layer label for a `catchment_level` value.
#[must_use]
pub fn catchment_label(level: &str) -> String {
    match level {
        "primary" => "Primary school catchment".to_string(),
        "high" => "High school catchment".to_string(),
        "other" => "Other catchment".to_string(),
        other => title_case(other),
    }
}

/// Polygon style for a catchment level.
#[must_use]
pub fn catchment_style(level: &str) -> Style {
    Style::filled(catchment_color(level), 2, 0.15)
}

/// Line style for a transit sub-layer.
#[must_use]
pub fn transit_style(group: TransitGroup) -> Style {
    match group {
        TransitGroup::Train => Style::stroke("#003f5c", 4, 0.9),
        TransitGroup::Bus => Style::stroke("#ffa600", 2, 0.8),
        TransitGroup::Other | TransitGroup::All => Style::stroke("#3740ff", 3, 0.8),
    }
}

/// Layer name for a transit sub-layer.
#[must_use]
pub const fn transit_layer_name(group: TransitGroup) -> &'static str {
    match group {
        TransitGroup::Train => "PTA metro (train)",
        TransitGroup::Bus => "PTA bus network",
        TransitGroup::Other | TransitGroup::All => "PTA services",
    }
}

/// Style for a layer fetched live from an ArcGIS service.
#[must_use]
pub fn live_overlay_style() -> Style {
    Style::filled(LIVE_OVERLAY_COLOR, 2, 0.2)
}

/// Style for a precomputed overlay from the manifest.
#[must_use]
pub fn processed_overlay_style() -> Style {
    Style::filled(PROCESSED_OVERLAY_COLOR, 2, 0.2)
}

/// Layer name for a precomputed overlay.
#[must_use]
pub fn processed_overlay_name(name: &str) -> String {
    format!("ArcGIS (processed) - {name}")
}
