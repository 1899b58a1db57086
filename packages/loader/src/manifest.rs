//! Overlay manifest generation.
//!
//! The manifest lists every precomputed overlay in a directory, named by
//! file stem:
//!
//! ```json
//! {"layers": [{"name": "bushfire_prone", "file": "arcgis_layers/bushfire_prone.geojson"}]}
//! ```

use std::path::{Path, PathBuf};

use suburb_explorer_layer_models::{Manifest, ManifestLayer};

/// File name the manifest is written to inside the overlay directory.
pub const MANIFEST_FILE_NAME: &str = "index.json";

/// Errors raised while building or writing a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Reading the directory or writing the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lists the `*.geojson` files of `dir` (case-insensitive, sorted by file
/// name). Each entry's `file` is `prefix/<file name>`, or just the file
/// name when `prefix` is empty. A missing directory yields an empty
/// manifest.
///
/// # Errors
///
/// Returns [`ManifestError::Io`] if the directory exists but cannot be
/// read.
pub async fn scan_layer_dir(dir: &Path, prefix: &str) -> Result<Manifest, ManifestError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("Overlay directory {} does not exist", dir.display());
            return Ok(Manifest::default());
        }
        Err(e) => return Err(e.into()),
    };

    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_geojson = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("geojson"));
        if is_geojson && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let prefix = prefix.trim_end_matches('/');
    let layers = files
        .iter()
        .filter_map(|path| {
            let stem = path.file_stem()?.to_string_lossy().into_owned();
            let file_name = path.file_name()?.to_string_lossy().into_owned();
            let file = if prefix.is_empty() {
                file_name
            } else {
                format!("{prefix}/{file_name}")
            };
            Some(ManifestLayer { name: stem, file })
        })
        .collect();

    Ok(Manifest { layers })
}

/// Scans `dir` and writes the manifest to `dir/index.json`, using the
/// directory's own name as the file prefix. Returns the written path and
/// the manifest.
///
/// # Errors
///
/// Returns [`ManifestError`] if scanning or writing fails.
pub async fn write_manifest(dir: &Path) -> Result<(PathBuf, Manifest), ManifestError> {
    let prefix = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let manifest = scan_layer_dir(dir, &prefix).await?;

    let path = dir.join(MANIFEST_FILE_NAME);
    let json = serde_json::to_vec_pretty(&manifest)?;
    tokio::fs::write(&path, json).await?;

    log::info!(
        "Wrote {} overlay entries to {}",
        manifest.layers.len(),
        path.display()
    );
    Ok((path, manifest))
}
