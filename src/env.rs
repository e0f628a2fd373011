use std::path::PathBuf;

use chrono::{Local, NaiveDate};

/// Manifest location relative to the repository root the tool runs from.
pub const DEFAULT_MANIFEST_PATH: &str = "docs/apps.json";

/// Application whose version history gets updated.
pub const DEFAULT_BUNDLE_ID: &str = "com.example.nezu-app";

/// Number of versions kept per application after an update.
pub const DEFAULT_KEEP: u64 = 5;

/// Label appended to the build number in `localizedDescription`.
pub const BUILD_LABEL: &str = "自動ビルドによる更新";

pub fn default_manifest_path() -> PathBuf {
    PathBuf::from(DEFAULT_MANIFEST_PATH)
}

/// Current calendar date in the local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Human-readable description attached to a freshly inserted version.
pub fn build_description(build: &str) -> String {
    format!("Build {build} - {BUILD_LABEL}")
}
