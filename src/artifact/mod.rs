use std::fs;
use std::io::Read;
use std::path::Path;

use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::error::UpdateError;
use crate::util::format_size;

/// Check that the built artifact on disk is the one the new entry advertises.
pub fn verify(path: &Path, expected_size: u64, expected_sha256: &str) -> Result<(), UpdateError> {
    let io_error = |action: &'static str, source: std::io::Error| UpdateError::Io {
        action,
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(path).map_err(|source| io_error("inspect", source))?;
    if metadata.len() != expected_size {
        return Err(UpdateError::ArtifactMismatch {
            path: path.to_path_buf(),
            reason: format!(
                "size is {} bytes, expected {expected_size}",
                metadata.len()
            ),
        });
    }

    let actual = sha256_file(path).map_err(|source| io_error("hash", source))?;
    if !actual.eq_ignore_ascii_case(expected_sha256.trim()) {
        return Err(UpdateError::ArtifactMismatch {
            path: path.to_path_buf(),
            reason: format!("checksum mismatch: expected {expected_sha256}, got {actual}"),
        });
    }

    info!(
        "artifact: {} verified ({})",
        path.display(),
        format_size(expected_size)
    );
    Ok(())
}

/// Lowercase hex SHA-256 of the file contents.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    let digest = format!("{:x}", hasher.finalize());
    debug!("artifact: sha256 {} = {digest}", path.display());
    Ok(digest)
}
