//! Choropleth colouring of SA1 polygons by `IRAD_decile`.
//!
//! The ramp runs red → yellow → green across the loaded decile range, so
//! the least advantaged areas of the current data are red whatever the
//! absolute values.

use geojson::{Feature, JsonValue};
use suburb_explorer_layer_models::IRAD_DECILE_KEY;

use crate::Style;

/// Colour for polygons without a usable decile.
pub const FALLBACK_COLOR: &str = "#b0bec5";

const RED: [u8; 3] = [215, 48, 39];
const YELLOW: [u8; 3] = [254, 224, 139];
const GREEN: [u8; 3] = [26, 152, 80];

/// Reads a decile as a whole number.
///
/// Numbers are truncated toward zero; strings must hold an integer.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn decile_value(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64().filter(|v| v.is_finite()).map(f64::trunc),
        JsonValue::String(s) => s.trim().parse::<i64>().ok().map(|v| v as f64),
        _ => None,
    }
}

/// Maps a decile onto the ramp over `range` (`[min, max]`).
///
/// Values outside the range are clamped to its ends; a range with
/// `min == max` puts every value at the midpoint (yellow). Returns
/// [`FALLBACK_COLOR`] when either input is missing.
#[must_use]
pub fn color_for_decile(decile: Option<f64>, range: Option<(f64, f64)>) -> String {
    let (Some(decile), Some((min, max))) = (decile.filter(|d| d.is_finite()), range) else {
        return FALLBACK_COLOR.to_string();
    };

    #[allow(clippy::float_cmp)]
    let position = if min == max {
        0.5
    } else {
        ((decile - min) / (max - min)).clamp(0.0, 1.0)
    };

    let rgb = if position <= 0.5 {
        interpolate(RED, YELLOW, position / 0.5)
    } else {
        interpolate(YELLOW, GREEN, (position - 0.5) / 0.5)
    };
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn interpolate(from: [u8; 3], to: [u8; 3], t: f64) -> [u8; 3] {
    let mut out = [0u8; 3];
    for (i, channel) in out.iter_mut().enumerate() {
        let a = f64::from(from[i]);
        let b = f64::from(to[i]);
        *channel = (a + (b - a) * t).trunc().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Style for one SA1 polygon.
#[must_use]
pub fn region_style(feature: &Feature, irad_range: Option<(f64, f64)>) -> Style {
    let decile = feature.property(IRAD_DECILE_KEY).and_then(decile_value);
    let color = color_for_decile(decile, irad_range);
    Style {
        fill_color: Some(color.clone()),
        color,
        weight: 1,
        opacity: None,
        fill_opacity: Some(0.45),
    }
}

/// Style for the highlighted (clicked) SA1 polygon.
#[must_use]
pub fn selected_region_style() -> Style {
    Style {
        color: "#d62828".to_string(),
        weight: 3,
        opacity: None,
        fill_color: Some("#ff6b6b".to_string()),
        fill_opacity: Some(0.45),
    }
}
