//! Nominatim / OpenStreetMap address search for the map's search pin.
//!
//! The public instance allows **1 request per second**; searches are
//! user-triggered so no extra throttling is done here.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use serde::{Deserialize, Serialize};

use crate::{SourceError, retry};

/// Public Nominatim search endpoint.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// A resolved address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressPin {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// The full address Nominatim matched, or the query when it gave none.
    pub address: String,
}

/// Geocodes a free-form address. Returns `None` when nothing matched or
/// the query is blank.
///
/// # Errors
///
/// Returns [`SourceError`] if the HTTP request or response parsing fails.
pub async fn geocode_address(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
) -> Result<Option<AddressPin>, SourceError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(None);
    }

    log::info!("Nominatim: searching {query:?}");
    let body = retry::send_json(|| {
        client.get(base_url).query(&[
            ("q", query),
            ("format", "jsonv2"),
            ("limit", "1"),
        ])
    })
    .await?;

    let pin = parse_response(&body, query)?;
    if pin.is_none() {
        log::info!("Nominatim: no match for {query:?}");
    }
    Ok(pin)
}

/// Parses a Nominatim `jsonv2` search response.
///
/// # Errors
///
/// Returns [`SourceError::Response`] if the body is not an array or the
/// first result lacks coordinates.
pub fn parse_response(
    body: &serde_json::Value,
    query: &str,
) -> Result<Option<AddressPin>, SourceError> {
    let results = body.as_array().ok_or_else(|| SourceError::Response {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = coordinate(first, "lat")?;
    let lon = coordinate(first, "lon")?;
    let address = first["display_name"]
        .as_str()
        .map_or_else(|| query.to_string(), String::from);

    Ok(Some(AddressPin { lat, lon, address }))
}

/// Nominatim sends coordinates as strings; plain numbers are accepted too.
fn coordinate(result: &serde_json::Value, key: &str) -> Result<f64, SourceError> {
    let value = &result[key];
    value
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .filter(|v| v.is_finite())
        .ok_or_else(|| SourceError::Response {
            message: format!("Missing {key} in Nominatim response"),
        })
}
