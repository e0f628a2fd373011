use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info};

use crate::env;
use crate::error::UpdateError;
use crate::manifest::{self, App, Manifest, VersionEntry};
use crate::util::parse_integer;

/// Release details exactly as given on the command line.
///
/// `build` and `size` stay textual until the entry is built: the build is
/// matched against existing entries in its raw form.
#[derive(Debug, Clone)]
pub struct Release {
    pub version: String,
    pub build: String,
    pub download_url: String,
    pub size: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub version: String,
    pub build: i64,
    /// An entry with the same version and build was replaced.
    pub replaced: bool,
    /// Entries discarded to respect the history cap.
    pub dropped: usize,
}

/// Inserts releases into one app's version history inside a manifest file.
pub struct ManifestUpdater {
    path: PathBuf,
    bundle_id: String,
    keep: usize,
}

impl ManifestUpdater {
    pub fn new(path: impl Into<PathBuf>, bundle_id: impl Into<String>, keep: usize) -> Self {
        Self {
            path: path.into(),
            bundle_id: bundle_id.into(),
            keep,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest, insert `release` dated `today`, and overwrite the
    /// file.
    ///
    /// # Errors
    /// Nothing is written when any step fails.
    pub fn update(&self, release: &Release, today: NaiveDate) -> Result<UpdateSummary, UpdateError> {
        let (manifest, summary) = self.prepare(release, today)?;
        manifest::save(&self.path, &manifest)?;
        info!(
            "updater: {} now at {} (build {})",
            self.bundle_id, summary.version, summary.build
        );
        Ok(summary)
    }

    /// Same as [`ManifestUpdater::update`] but returns the rendered manifest
    /// instead of writing it.
    pub fn preview(
        &self,
        release: &Release,
        today: NaiveDate,
    ) -> Result<(String, UpdateSummary), UpdateError> {
        let (manifest, summary) = self.prepare(release, today)?;
        Ok((manifest::render(&manifest)?, summary))
    }

    fn prepare(
        &self,
        release: &Release,
        today: NaiveDate,
    ) -> Result<(Manifest, UpdateSummary), UpdateError> {
        let mut manifest = manifest::load(&self.path)?;
        let summary = apply_release(&mut manifest, &self.bundle_id, release, today, self.keep)?;
        Ok((manifest, summary))
    }
}

/// Insert `release` at the front of the history of the app identified by
/// `bundle_id`, replacing a previous entry for the same version and build and
/// keeping at most `keep` entries.
pub fn apply_release(
    manifest: &mut Manifest,
    bundle_id: &str,
    release: &Release,
    today: NaiveDate,
    keep: usize,
) -> Result<UpdateSummary, UpdateError> {
    manifest
        .update_app(bundle_id, |app| insert_release(app, release, today, keep))?
        .ok_or_else(|| UpdateError::AppNotFound(bundle_id.to_owned()))
}

fn insert_release(
    app: &mut App,
    release: &Release,
    today: NaiveDate,
    keep: usize,
) -> Result<UpdateSummary, UpdateError> {
    debug!(
        "updater: {} has {} version(s)",
        app.bundle_identifier,
        app.versions.len()
    );
    let versions = &mut app.versions;

    let existing = versions
        .iter()
        .position(|entry| entry.is_release(&release.version, &release.build));

    let build = parse_integer("build", &release.build)?;
    let size = parse_integer("size", &release.size)?;
    let entry = VersionEntry::new(
        &release.version,
        build,
        today,
        &release.download_url,
        size,
        &release.sha256,
        env::build_description(&release.build),
    );

    if let Some(index) = existing {
        debug!(
            "updater: replacing existing entry {} (build {}) at position {index}",
            release.version,
            versions[index].build_label()
        );
        versions.remove(index);
    }
    versions.insert(0, entry);

    let dropped = versions.len().saturating_sub(keep);
    if dropped > 0 {
        debug!("updater: dropping {dropped} old version(s)");
    }
    versions.truncate(keep);

    Ok(UpdateSummary {
        version: release.version.clone(),
        build,
        replaced: existing.is_some(),
        dropped,
    })
}
