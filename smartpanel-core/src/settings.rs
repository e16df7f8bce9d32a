use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SettingsError;
use crate::state::EditorOpenBehavior;

/// Key of the object holding our settings inside a shared settings file.
pub const NAMESPACE: &str = "smartPanel";

/// User settings, stored as the `smartPanel` object of a JSON settings file.
///
/// The `#[serde(default)]` on the struct fills in any field missing from an
/// existing file, so older files keep working when fields are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanelSettings {
    pub enable_auto_maximize: bool,
    pub editor_open_behavior: EditorOpenBehavior,
    /// Quiet period in milliseconds before a burst of changes is reconciled.
    pub debounce_delay: u64,
}

impl Default for PanelSettings {
    fn default() -> Self {
        PanelSettings {
            enable_auto_maximize: true,
            editor_open_behavior: EditorOpenBehavior::Normal,
            debounce_delay: 50,
        }
    }
}

impl PanelSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_delay)
    }
}

/// Where the engine reads its settings from.
///
/// `snapshot` is called once per reconciliation pass and must return the
/// current values; implementations must not hand out a value cached from
/// before a user edit.
pub trait ConfigSource {
    fn snapshot(&self) -> PanelSettings;
    fn set_enable_auto_maximize(&self, enabled: bool) -> Result<(), SettingsError>;
}

/// Settings held in memory and, when a path is set, mirrored to a JSON file.
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: RwLock<PanelSettings>,
}

impl SettingsStore {
    pub fn in_memory(settings: PanelSettings) -> Self {
        Self {
            path: None,
            current: RwLock::new(settings),
        }
    }

    /// Open a file-backed store. A missing or unreadable file starts from
    /// defaults; the file is only written on the first update.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = match read_settings_file(&path) {
            Ok(Some(settings)) => settings,
            Ok(None) => PanelSettings::default(),
            Err(e) => {
                log::warn!("Ignoring settings at {}: {}", path.display(), e);
                PanelSettings::default()
            }
        };
        Self {
            path: Some(path),
            current: RwLock::new(initial),
        }
    }

    pub fn open_default() -> Result<Self, SettingsError> {
        default_settings_path()
            .map(|path| Self::open(path))
            .ok_or(SettingsError::NoConfigDir)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Overwrite every setting at once, e.g. when the host pushes its own
    /// configuration. Not persisted: on a file-backed store the next
    /// snapshot reads the file again.
    pub fn replace(&self, settings: PanelSettings) {
        *self.current.write() = settings;
    }
}

impl ConfigSource for SettingsStore {
    fn snapshot(&self) -> PanelSettings {
        if let Some(path) = &self.path {
            match read_settings_file(path) {
                Ok(Some(settings)) => {
                    *self.current.write() = settings.clone();
                    return settings;
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!(
                        "Invalid settings at {}, keeping previous values: {}",
                        path.display(),
                        e
                    );
                }
            }
        }
        self.current.read().clone()
    }

    fn set_enable_auto_maximize(&self, enabled: bool) -> Result<(), SettingsError> {
        let mut updated = self.current.read().clone();
        updated.enable_auto_maximize = enabled;
        if let Some(path) = &self.path {
            write_settings_file(path, &updated)?;
        }
        *self.current.write() = updated;
        Ok(())
    }
}

fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("smartpanel").join("settings.json"))
}

/// Returns `Ok(None)` when the file does not exist.
fn read_settings_file(path: &Path) -> Result<Option<PanelSettings>, SettingsError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let doc: serde_json::Value = serde_json::from_str(&contents)?;
    match doc.get(NAMESPACE) {
        Some(section) => Ok(Some(serde_json::from_value(section.clone())?)),
        None => Ok(Some(PanelSettings::default())),
    }
}

/// Rewrites only our namespace; other top-level keys in the file survive.
fn write_settings_file(path: &Path, settings: &PanelSettings) -> Result<(), SettingsError> {
    let mut doc = match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<serde_json::Value>(&contents) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        },
        Err(_) => serde_json::Map::new(),
    };
    doc.insert(NAMESPACE.to_string(), serde_json::to_value(settings)?);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&serde_json::Value::Object(doc))?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = PanelSettings::default();
        assert!(settings.enable_auto_maximize);
        assert_eq!(settings.editor_open_behavior, EditorOpenBehavior::Normal);
        assert_eq!(settings.debounce(), Duration::from_millis(50));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings: PanelSettings =
            serde_json::from_str(r#"{"editorOpenBehavior": "hidden"}"#).unwrap();
        assert!(settings.enable_auto_maximize);
        assert_eq!(settings.editor_open_behavior, EditorOpenBehavior::Hidden);
        assert_eq!(settings.debounce_delay, 50);
    }

    #[test]
    fn serializes_camel_case_keys() {
        let json = serde_json::to_value(PanelSettings::default()).unwrap();
        assert_eq!(json["enableAutoMaximize"], true);
        assert_eq!(json["editorOpenBehavior"], "normal");
        assert_eq!(json["debounceDelay"], 50);
    }

    #[test]
    fn in_memory_store_updates() {
        let store = SettingsStore::in_memory(PanelSettings::default());
        store.set_enable_auto_maximize(false).unwrap();
        assert!(!store.snapshot().enable_auto_maximize);
        assert!(store.path().is_none());
    }

    #[test]
    fn open_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json"));
        assert_eq!(store.snapshot(), PanelSettings::default());
    }

    #[test]
    fn update_persists_and_keeps_other_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"editor.fontSize": 13, "smartPanel": {"debounceDelay": 80}}"#,
        )
        .unwrap();

        let store = SettingsStore::open(&path);
        store.set_enable_auto_maximize(false).unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["editor.fontSize"], 13);
        assert_eq!(doc["smartPanel"]["enableAutoMaximize"], false);
        assert_eq!(doc["smartPanel"]["debounceDelay"], 80);
    }

    #[test]
    fn snapshot_sees_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path);
        assert_eq!(
            store.snapshot().editor_open_behavior,
            EditorOpenBehavior::Normal
        );

        std::fs::write(&path, r#"{"smartPanel": {"editorOpenBehavior": "hidden"}}"#).unwrap();
        assert_eq!(
            store.snapshot().editor_open_behavior,
            EditorOpenBehavior::Hidden
        );
    }

    #[test]
    fn invalid_file_keeps_last_good_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"smartPanel": {"debounceDelay": 120}}"#).unwrap();
        let store = SettingsStore::open(&path);
        assert_eq!(store.snapshot().debounce_delay, 120);

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(store.snapshot().debounce_delay, 120);
    }

    #[test]
    fn failed_write_leaves_value_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = SettingsStore::open(blocker.join("settings.json"));

        assert!(store.set_enable_auto_maximize(false).is_err());
        assert!(store.snapshot().enable_auto_maximize);
    }

    #[test]
    fn replace_overrides_in_memory_values() {
        let store = SettingsStore::in_memory(PanelSettings::default());
        store.replace(PanelSettings {
            enable_auto_maximize: false,
            editor_open_behavior: EditorOpenBehavior::Hidden,
            debounce_delay: 10,
        });
        let snapshot = store.snapshot();
        assert!(!snapshot.enable_auto_maximize);
        assert_eq!(snapshot.debounce_delay, 10);
    }
}
