#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Presentation helpers called by the map front end at render time.
//!
//! Everything here is a pure function of a loaded snapshot's collections
//! and metadata. Nothing is re-derived or mutated.

pub mod camera;
pub mod color;
pub mod detail;
pub mod select;
pub mod tables;
pub mod tooltip;

use serde::Serialize;

pub use camera::{AUSTRALIA_CENTER, STATE_CAPITALS, default_state, map_center, zoom_level};
pub use color::{
    FALLBACK_COLOR, color_for_decile, decile_value, region_style, selected_region_style,
};
pub use detail::{SA1_DETAIL_FIELDS, SCHOOL_DETAIL_FIELDS, detail_lines, format_detail_value};
pub use select::{
    Click, Selection, filter_by_state, find_region_at, find_region_by_code, find_school_at,
};
pub use tables::{catchment_color, catchment_label, school_color, sector_label, transit_style};
pub use tooltip::{
    TooltipField, build_tooltip_fields, catchment_tooltip_fields, school_tooltip_fields,
};

/// Path style handed to the renderer (Leaflet option names).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    /// Stroke colour.
    pub color: String,
    /// Stroke width in pixels.
    pub weight: u8,
    /// Stroke opacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Fill colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    /// Fill opacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
}

impl Style {
    /// A line style.
    #[must_use]
    pub fn stroke(color: &str, weight: u8, opacity: f64) -> Self {
        Self {
            color: color.to_string(),
            weight,
            opacity: Some(opacity),
            fill_color: None,
            fill_opacity: None,
        }
    }

    /// A polygon or marker style whose fill matches its stroke.
    #[must_use]
    pub fn filled(color: &str, weight: u8, fill_opacity: f64) -> Self {
        Self {
            color: color.to_string(),
            weight,
            opacity: None,
            fill_color: Some(color.to_string()),
            fill_opacity: Some(fill_opacity),
        }
    }
}
