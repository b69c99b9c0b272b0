//! Preferences persisted as a JSON object of booleans.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PreferencesError;

use super::collaborators::Preferences;

/// Boolean preferences stored in a JSON file.
///
/// A missing file reads as empty; changes are written by [`Preferences::save`].
#[derive(Debug, Clone)]
pub struct JsonPreferences {
    path: PathBuf,
    values: BTreeMap<String, bool>,
}

impl JsonPreferences {
    /// Load preferences from `path`.
    ///
    /// # Errors
    /// * `PreferencesError::Io` - The file exists but cannot be read
    /// * `PreferencesError::Parse` - The file is not a JSON object of booleans
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, PreferencesError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| PreferencesError::Parse(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(PreferencesError::Io(format!("{}: {}", path.display(), e))),
        };

        debug!(path = %path.display(), entries = values.len(), "Loaded preferences");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Preferences for JsonPreferences {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<(), PreferencesError> {
        let io_err = |e: std::io::Error| PreferencesError::Io(format!("{}: {}", self.path.display(), e));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(&self.values)
            .map_err(|e| PreferencesError::Parse(e.to_string()))?;
        fs::write(&self.path, text).map_err(io_err)?;

        debug!(path = %self.path.display(), "Saved preferences");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let prefs = JsonPreferences::load(dir.path().join("prefs.json")).unwrap();
        assert!(prefs.get_bool("colorize", true));
        assert!(!prefs.get_bool("colorize", false));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        let mut prefs = JsonPreferences::load(&path).unwrap();
        prefs.set_bool("splitWindows", false);
        prefs.save().unwrap();

        let reloaded = JsonPreferences::load(&path).unwrap();
        assert!(!reloaded.get_bool("splitWindows", true));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{\"colorize\": \"yes\"}").unwrap();

        assert!(matches!(
            JsonPreferences::load(&path),
            Err(PreferencesError::Parse(_))
        ));
    }
}
