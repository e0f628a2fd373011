use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a manifest update.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Command line could not be parsed
    #[error("{0}")]
    Usage(#[from] clap::Error),

    /// Manifest file does not exist
    #[error("{} not found.", .0.display())]
    ManifestNotFound(PathBuf),

    /// No app carries the requested bundle identifier
    #[error("App with bundleIdentifier '{0}' not found in JSON.")]
    AppNotFound(String),

    /// Manifest is not valid JSON or does not have the expected shape
    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    /// A numeric argument could not be coerced
    #[error("invalid {field} '{value}': expected an integer")]
    InvalidArgument { field: &'static str, value: String },

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Local artifact does not match the advertised size or digest
    #[error("artifact {} does not match: {reason}", .path.display())]
    ArtifactMismatch { path: PathBuf, reason: String },
}

impl UpdateError {
    /// Whether the run should still end with a zero exit status.
    ///
    /// Only a missing manifest or a missing app are reported and swallowed;
    /// all other failures abort the run.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UpdateError::ManifestNotFound(_) | UpdateError::AppNotFound(_)
        )
    }
}
