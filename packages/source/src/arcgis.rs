//! `ArcGIS` REST query adapter.
//!
//! Queries a `FeatureServer` (or `MapServer`) layer with `f=geojson` so the
//! service does the conversion to `GeoJSON` for us. `ArcGIS` reports some
//! failures inside an HTTP 200 body (`{"error": {"code": 400, "message":
//! ...}}`), so both the status and the payload are checked.

use geojson::{FeatureCollection, JsonValue};
use suburb_explorer_layer_models::Collection;

use crate::{SourceError, retry};

/// `where` clause selecting every record.
pub const DEFAULT_WHERE: &str = "1=1";

/// `outFields` value selecting every attribute.
pub const DEFAULT_OUT_FIELDS: &str = "*";

/// A query against one `ArcGIS` layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcGisQuery {
    /// Layer URL, with or without the trailing `/query`.
    pub url: String,
    /// SQL-like filter. Blank means [`DEFAULT_WHERE`].
    pub where_clause: Option<String>,
    /// Comma-separated attribute list. Blank means [`DEFAULT_OUT_FIELDS`].
    pub out_fields: Option<String>,
}

impl ArcGisQuery {
    /// Creates a query for every feature and attribute of a layer.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            where_clause: None,
            out_fields: None,
        }
    }

    /// Sets the `where` filter.
    #[must_use]
    pub fn with_where(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    /// Sets the `outFields` list.
    #[must_use]
    pub fn with_out_fields(mut self, out_fields: impl Into<String>) -> Self {
        self.out_fields = Some(out_fields.into());
        self
    }

    /// Builds the full request URL.
    ///
    /// Appends `/query` when the layer URL does not already end with it and
    /// keeps any query parameters already present (e.g. a `token`).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::ArcGis`] if the URL is blank or unparseable.
    pub fn query_url(&self) -> Result<reqwest::Url, SourceError> {
        let raw = self.url.trim();
        if raw.is_empty() {
            return Err(SourceError::ArcGis {
                message: "ArcGIS URL is required".to_string(),
            });
        }

        let mut url = reqwest::Url::parse(raw).map_err(|e| SourceError::ArcGis {
            message: format!("invalid ArcGIS URL {raw:?}: {e}"),
        })?;

        let path = url.path().trim_end_matches('/').to_string();
        if !path.to_ascii_lowercase().ends_with("/query") {
            url.set_path(&format!("{path}/query"));
        }

        url.query_pairs_mut()
            .append_pair("where", non_blank(self.where_clause.as_deref(), DEFAULT_WHERE))
            .append_pair(
                "outFields",
                non_blank(self.out_fields.as_deref(), DEFAULT_OUT_FIELDS),
            )
            .append_pair("f", "geojson");

        Ok(url)
    }
}

fn non_blank<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default)
}

/// Runs an `ArcGIS` query and normalizes the response.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails, the service answers with a
/// non-success status, or the body carries an `error` object.
pub async fn fetch_arcgis_geojson(
    client: &reqwest::Client,
    query: &ArcGisQuery,
) -> Result<Collection, SourceError> {
    let url = query.query_url()?;
    log::info!("ArcGIS: querying {url}");

    let body = retry::send_json(|| client.get(url.clone())).await?;
    let collection = parse_query_response(body)?;

    log::info!("ArcGIS: received {} features", collection.len());
    Ok(collection)
}

/// Converts a decoded `f=geojson` response into a [`Collection`].
///
/// # Errors
///
/// Returns [`SourceError::ArcGis`] when the payload carries an `error`
/// object or is not a `FeatureCollection`.
pub fn parse_query_response(body: JsonValue) -> Result<Collection, SourceError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(JsonValue::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("Unknown ArcGIS error");
        let message = match error.get("code").and_then(JsonValue::as_i64) {
            Some(code) => format!("{message} (code {code})"),
            None => message.to_string(),
        };
        return Err(SourceError::ArcGis { message });
    }

    let exceeded = body
        .pointer("/properties/exceededTransferLimit")
        .or_else(|| body.get("exceededTransferLimit"))
        .and_then(JsonValue::as_bool)
        .unwrap_or(false);
    if exceeded {
        log::warn!("ArcGIS: transfer limit exceeded, only the first page of features was returned");
    }

    let collection: FeatureCollection =
        serde_json::from_value(body).map_err(|e| SourceError::ArcGis {
            message: format!("response is not a GeoJSON FeatureCollection: {e}"),
        })?;

    Ok(collection.into())
}
