use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::UpdateError;

// Every record keeps the full JSON object it was read from. Only the values an
// update reads are decoded; everything else, including key order and the
// exact spelling of numbers, is written back untouched.
type Fields = Map<String, Value>;

/// The whole `apps.json` document.
///
/// Apps stay raw until one is looked up, so oddly shaped entries on other
/// apps never stop an update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "serde_json::Map<String, serde_json::Value>",
    into = "serde_json::Map<String, serde_json::Value>"
)]
pub struct Manifest {
    apps: Vec<Value>,
    fields: Fields,
}

impl Manifest {
    pub fn app_count(&self) -> usize {
        self.apps.len()
    }

    /// Decode the app carrying `bundle_id`, if any.
    #[cfg(test)]
    pub fn app(&self, bundle_id: &str) -> Result<Option<App>, UpdateError> {
        match self.position(bundle_id)? {
            Some(index) => decode_app(&self.apps[index]).map(Some),
            None => Ok(None),
        }
    }

    /// Run `edit` on the app carrying `bundle_id` and store the result.
    ///
    /// Returns `Ok(None)` when no app matches. The stored app is left as it
    /// was when `edit` fails.
    pub fn update_app<T>(
        &mut self,
        bundle_id: &str,
        edit: impl FnOnce(&mut App) -> Result<T, UpdateError>,
    ) -> Result<Option<T>, UpdateError> {
        let Some(index) = self.position(bundle_id)? else {
            return Ok(None);
        };
        let mut app = decode_app(&self.apps[index])?;
        let outcome = edit(&mut app)?;
        self.apps[index] = Value::Object(app.into());
        Ok(Some(outcome))
    }

    // Apps after the first match are never inspected.
    fn position(&self, bundle_id: &str) -> Result<Option<usize>, UpdateError> {
        for (index, app) in self.apps.iter().enumerate() {
            let id = app
                .as_object()
                .and_then(|fields| fields.get("bundleIdentifier"))
                .ok_or_else(|| {
                    UpdateError::MalformedManifest(format!(
                        "`apps`[{index}] has no `bundleIdentifier`"
                    ))
                })?;
            if id.as_str() == Some(bundle_id) {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

fn decode_app(value: &Value) -> Result<App, UpdateError> {
    serde_json::from_value(value.clone())
        .map_err(|err| UpdateError::MalformedManifest(format!("target app: {err}")))
}

impl TryFrom<Fields> for Manifest {
    type Error = String;

    fn try_from(mut fields: Fields) -> Result<Self, Self::Error> {
        // The placeholder keeps `apps` at its original position.
        let apps = match fields.get_mut("apps") {
            Some(Value::Array(apps)) => std::mem::take(apps),
            Some(_) => return Err("`apps` is not an array".into()),
            None => return Err("missing field `apps`".into()),
        };
        Ok(Self { apps, fields })
    }
}

impl From<Manifest> for Fields {
    fn from(manifest: Manifest) -> Self {
        let mut fields = manifest.fields;
        fields.insert("apps".into(), Value::Array(manifest.apps));
        fields
    }
}

/// The app being updated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "serde_json::Map<String, serde_json::Value>",
    into = "serde_json::Map<String, serde_json::Value>"
)]
pub struct App {
    pub bundle_identifier: String,
    /// Newest first.
    pub versions: Vec<VersionEntry>,
    fields: Fields,
}

impl TryFrom<Fields> for App {
    type Error = String;

    fn try_from(mut fields: Fields) -> Result<Self, Self::Error> {
        let bundle_identifier = match fields.get("bundleIdentifier") {
            Some(Value::String(id)) => id.clone(),
            Some(_) => return Err("`bundleIdentifier` is not a string".into()),
            None => return Err("missing field `bundleIdentifier`".into()),
        };
        let entries = match fields.get_mut("versions") {
            Some(Value::Array(entries)) => std::mem::take(entries),
            Some(_) => return Err("`versions` is not an array".into()),
            None => return Err("missing field `versions`".into()),
        };
        let versions = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::Object(entry) => VersionEntry::try_from(entry)
                    .map_err(|err| format!("`versions`[{index}]: {err}")),
                _ => Err(format!("`versions`[{index}] is not an object")),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            bundle_identifier,
            versions,
            fields,
        })
    }
}

impl From<App> for Fields {
    fn from(app: App) -> Self {
        let mut fields = app.fields;
        let versions = app
            .versions
            .into_iter()
            .map(|entry| Value::Object(entry.into()))
            .collect();
        fields.insert("versions".into(), Value::Array(versions));
        fields
    }
}

/// A single published build of an app.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "serde_json::Map<String, serde_json::Value>",
    into = "serde_json::Map<String, serde_json::Value>"
)]
pub struct VersionEntry {
    /// `None` when the stored version is not a string; such entries never
    /// match a release.
    pub version: Option<String>,
    build: String,
    fields: Fields,
}

impl VersionEntry {
    pub fn new(
        version: impl Into<String>,
        build: i64,
        date: NaiveDate,
        download_url: impl Into<String>,
        size: i64,
        sha256: impl Into<String>,
        localized_description: impl Into<String>,
    ) -> Self {
        let version = version.into();
        let mut fields = Fields::new();
        fields.insert("version".into(), Value::String(version.clone()));
        fields.insert("build".into(), Value::from(build));
        fields.insert(
            "date".into(),
            Value::String(date.format("%Y-%m-%d").to_string()),
        );
        fields.insert("downloadURL".into(), Value::String(download_url.into()));
        fields.insert("size".into(), Value::from(size));
        fields.insert("sha256".into(), Value::String(sha256.into()));
        fields.insert(
            "localizedDescription".into(),
            Value::String(localized_description.into()),
        );
        Self {
            version: Some(version),
            build: build.to_string(),
            fields,
        }
    }

    /// Textual build number; empty when the entry has none.
    pub fn build_label(&self) -> &str {
        &self.build
    }

    /// Whether this entry describes the given version/build pair.
    ///
    /// Builds compare by their textual form, so `4` and `"4"` are the same
    /// build while `"04"` and `4.0` are not.
    pub fn is_release(&self, version: &str, build: &str) -> bool {
        self.version.as_deref() == Some(version) && self.build == build
    }
}

impl TryFrom<Fields> for VersionEntry {
    type Error = String;

    fn try_from(fields: Fields) -> Result<Self, Self::Error> {
        let version = match fields.get("version") {
            Some(value) => value.as_str().map(str::to_owned),
            None => return Err("missing field `version`".into()),
        };
        let build = fields.get("build").map(build_text).unwrap_or_default();
        Ok(Self {
            version,
            build,
            fields,
        })
    }
}

impl From<VersionEntry> for Fields {
    fn from(entry: VersionEntry) -> Self {
        entry.fields
    }
}

// Scalars render the way a build label is usually spelled: strings bare,
// numbers exactly as written in the file.
fn build_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "None".into(),
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry_json() -> Value {
        json!({
            "version": "1.0",
            "build": 3,
            "date": "2025-01-02",
            "downloadURL": "https://x/old.ipa",
            "size": 100,
            "sha256": "ff00",
            "localizedDescription": "Build 3",
            "minOSVersion": "17.0"
        })
    }

    #[test]
    fn decodes_version_and_build_only() {
        let entry: VersionEntry = serde_json::from_value(entry_json()).unwrap();
        assert_eq!(entry.version.as_deref(), Some("1.0"));
        assert_eq!(entry.build_label(), "3");
        assert_eq!(entry.fields.get("minOSVersion"), Some(&json!("17.0")));
    }

    #[test]
    fn writes_back_identical_object() {
        let entry: VersionEntry = serde_json::from_value(entry_json()).unwrap();
        assert_eq!(serde_json::to_value(&entry).unwrap(), entry_json());
    }

    #[test]
    fn keeps_original_key_order() {
        let raw = r##"{"name":"Repo","apps":[{"name":"Nezu","versions":[],"bundleIdentifier":"a.b","tint":"#fff"}],"news":[]}"##;
        let mut manifest: Manifest = serde_json::from_str(raw).unwrap();
        manifest.update_app("a.b", |_| Ok(())).unwrap().unwrap();
        assert_eq!(serde_json::to_string(&manifest).unwrap(), raw);
    }

    #[test]
    fn quoted_build_stays_quoted() {
        let mut raw = entry_json();
        raw["build"] = json!("4");
        let entry: VersionEntry = serde_json::from_value(raw).unwrap();
        assert!(entry.is_release("1.0", "4"));
        assert_eq!(serde_json::to_value(&entry).unwrap()["build"], json!("4"));
    }

    #[test]
    fn compares_builds_textually() {
        let entry: VersionEntry = serde_json::from_value(entry_json()).unwrap();
        assert!(entry.is_release("1.0", "3"));
        assert!(!entry.is_release("1.0", "03"));
        assert!(!entry.is_release("1.1", "3"));

        let float: VersionEntry =
            serde_json::from_str(r#"{"version":"1.0","build":4.0}"#).unwrap();
        assert_eq!(float.build_label(), "4.0");
        assert!(float.is_release("1.0", "4.0"));
        assert!(!float.is_release("1.0", "4"));
    }

    #[test]
    fn odd_values_never_fail_decoding() {
        let raw = json!({ "version": 2, "build": null, "size": "12 MB", "date": false });
        let entry: VersionEntry = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entry.version, None);
        assert_eq!(entry.build_label(), "None");
        assert!(!entry.is_release("2", "None"));
        assert_eq!(serde_json::to_value(&entry).unwrap(), raw);
    }

    #[test]
    fn missing_build_matches_only_empty_label() {
        let entry: VersionEntry = serde_json::from_value(json!({ "version": "1.0" })).unwrap();
        assert_eq!(entry.build_label(), "");
        assert!(!entry.is_release("1.0", "3"));
        assert!(entry.is_release("1.0", ""));
        assert_eq!(serde_json::to_value(&entry).unwrap(), json!({ "version": "1.0" }));
    }

    #[test]
    fn entry_without_version_is_rejected() {
        let err = serde_json::from_value::<VersionEntry>(json!({ "build": 3 })).unwrap_err();
        assert!(err.to_string().contains("`version`"), "{err}");
    }

    #[test]
    fn new_entry_uses_manifest_key_names() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let entry = VersionEntry::new("1.1", 4, date, "https://x/y.ipa", 1_048_576, "abc123", "Build 4");
        assert!(entry.is_release("1.1", "4"));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "version": "1.1",
                "build": 4,
                "date": "2026-03-09",
                "downloadURL": "https://x/y.ipa",
                "size": 1048576,
                "sha256": "abc123",
                "localizedDescription": "Build 4"
            })
        );
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            [
                "version",
                "build",
                "date",
                "downloadURL",
                "size",
                "sha256",
                "localizedDescription"
            ]
        );
    }

    #[test]
    fn manifest_requires_apps_array() {
        assert!(serde_json::from_str::<Manifest>(r#"{"name":"Repo"}"#).is_err());
        assert!(serde_json::from_str::<Manifest>(r#"{"apps":{}}"#).is_err());
        assert!(serde_json::from_str::<Manifest>("[]").is_err());
    }

    #[test]
    fn other_apps_are_not_decoded() {
        let raw = json!({
            "apps": [
                { "bundleIdentifier": "a", "versions": [{ "version": 2, "size": "12 MB", "build": 4.0 }] },
                { "bundleIdentifier": "b", "versions": [] },
                "not even an object"
            ]
        });
        let mut manifest: Manifest = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(manifest.app_count(), 3);
        assert!(manifest.app("b").unwrap().is_some());
        manifest.update_app("b", |_| Ok(())).unwrap().unwrap();
        assert_eq!(serde_json::to_value(&manifest).unwrap(), raw);
    }

    #[test]
    fn lookup_needs_bundle_identifiers_up_to_the_match() {
        let manifest: Manifest = serde_json::from_value(json!({
            "apps": [{ "name": "anonymous" }, { "bundleIdentifier": "b", "versions": [] }]
        }))
        .unwrap();
        assert!(matches!(
            manifest.app("b"),
            Err(UpdateError::MalformedManifest(_))
        ));
    }

    #[test]
    fn unknown_bundle_identifier_is_none() {
        let mut manifest: Manifest = serde_json::from_value(json!({
            "apps": [{ "bundleIdentifier": "a", "versions": [] }]
        }))
        .unwrap();
        assert!(manifest.app("c").unwrap().is_none());
        assert!(manifest.update_app("c", |_| Ok(())).unwrap().is_none());
    }

    #[test]
    fn failed_edit_leaves_app_unchanged() {
        let raw = json!({ "apps": [{ "bundleIdentifier": "a", "versions": [] }] });
        let mut manifest: Manifest = serde_json::from_value(raw.clone()).unwrap();
        let result: Result<Option<()>, _> = manifest.update_app("a", |app| {
            app.versions.clear();
            Err(UpdateError::MalformedManifest("stop".into()))
        });
        assert!(result.is_err());
        assert_eq!(serde_json::to_value(&manifest).unwrap(), raw);
    }

    #[test]
    fn target_without_versions_is_malformed() {
        let mut manifest: Manifest = serde_json::from_value(json!({
            "apps": [{ "bundleIdentifier": "a", "name": "A" }]
        }))
        .unwrap();
        assert!(matches!(
            manifest.update_app("a", |_| Ok(())),
            Err(UpdateError::MalformedManifest(_))
        ));
    }
}
