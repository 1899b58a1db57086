#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Normalizers for the heterogeneous feeds the explorer consumes.
//!
//! Every adapter turns a third-party shape into a
//! [`Collection`](suburb_explorer_layer_models::Collection):
//!
//! - [`arcgis`]: live `ArcGIS` `FeatureServer` queries (`f=geojson`).
//! - [`kml`]: user-supplied KML documents and KMZ archives.
//! - [`transit`]: splits one transit feed into train/bus/other layers.
//! - [`catchment`]: splits the catchment feed by `catchment_level`.
//!
//! [`nominatim`] resolves free-form addresses for the search pin, and
//! [`retry`] wraps every outgoing HTTP request.

pub mod arcgis;
pub mod catchment;
pub mod kml;
pub mod nominatim;
pub mod retry;
pub mod transit;

/// User-Agent sent with every outgoing request. Nominatim rejects
/// anonymous clients.
pub const USER_AGENT: &str = concat!("suburb-explorer/", env!("CARGO_PKG_VERSION"));

/// Errors raised by the source adapters.
///
/// Only genuinely exceptional conditions end up here (bad archive, failed
/// transport, service-reported error). Missing or malformed properties are
/// never errors.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status.
        status: reqwest::StatusCode,
        /// Requested URL.
        url: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The KMZ container could not be read.
    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The KML document is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The `ArcGIS` service rejected the query or returned an unusable
    /// payload.
    #[error("ArcGIS query failed: {message}")]
    ArcGis {
        /// Description of what went wrong.
        message: String,
    },

    /// The KML/KMZ input could not be converted.
    #[error("KML conversion failed: {message}")]
    Kml {
        /// Description of what went wrong.
        message: String,
    },

    /// A response did not have the expected shape.
    #[error("Unexpected response: {message}")]
    Response {
        /// Description of what went wrong.
        message: String,
    },
}
