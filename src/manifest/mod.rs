use std::fs;
use std::path::Path;

use log::debug;

use crate::error::UpdateError;

mod models;

pub use models::{App, Manifest, VersionEntry};

/// Read and decode the manifest at `path`.
///
/// A missing file is reported as [`UpdateError::ManifestNotFound`] before any
/// read is attempted.
pub fn load(path: &Path) -> Result<Manifest, UpdateError> {
    if !path.exists() {
        return Err(UpdateError::ManifestNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| UpdateError::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    })?;
    let manifest = parse(&bytes)?;
    debug!(
        "manifest: loaded {} app(s) from {}",
        manifest.app_count(),
        path.display()
    );
    Ok(manifest)
}

pub fn parse(bytes: &[u8]) -> Result<Manifest, UpdateError> {
    serde_json::from_slice(bytes).map_err(|err| UpdateError::MalformedManifest(err.to_string()))
}

/// Pretty-print the manifest with two-space indentation and a trailing
/// newline. Non-ASCII text is written as-is.
pub fn render(manifest: &Manifest) -> Result<String, UpdateError> {
    let mut rendered = serde_json::to_string_pretty(manifest)
        .map_err(|err| UpdateError::MalformedManifest(err.to_string()))?;
    rendered.push('\n');
    Ok(rendered)
}

/// Overwrite `path` with the rendered manifest.
pub fn save(path: &Path, manifest: &Manifest) -> Result<(), UpdateError> {
    let rendered = render(manifest)?;
    fs::write(path, rendered.as_bytes()).map_err(|source| UpdateError::Io {
        action: "write",
        path: path.to_path_buf(),
        source,
    })?;
    debug!("manifest: wrote {} bytes to {}", rendered.len(), path.display());
    Ok(())
}
