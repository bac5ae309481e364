//! The persisted licensing configuration: license keys the user registered.
//!
//! The file is shared with the host's own configuration tooling, so keys this
//! crate does not know are carried through a load/save cycle untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LicenseResult;
use crate::fs::FileSystem;

/// License keys registered by the user.
///
/// Older files hold a `licenses` list; newer ones a single active `license`.
/// Both are read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensingConfiguration {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(flatten)]
    other: Map<String, Value>,
}

impl LicensingConfiguration {
    /// Every registered key, list entries first, without duplicates.
    #[must_use]
    pub fn all_license_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for key in self.licenses.iter().chain(self.license.iter()) {
            let key = key.trim();
            if !key.is_empty() && !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
        keys
    }

    /// Appends a key to the list. Returns false if it was already present.
    pub fn add_license(&mut self, key: &str) -> bool {
        let key = key.trim();
        if self.all_license_keys().iter().any(|k| k == key) {
            return false;
        }
        self.licenses.push(key.to_string());
        true
    }
}

/// Reads and writes a [`LicensingConfiguration`] file.
#[derive(Debug, Clone)]
pub struct LicensingConfigurationStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl LicensingConfigurationStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration; a missing or blank file is an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns I/O errors (possibly transient) and JSON errors.
    pub fn load(&self) -> LicenseResult<LicensingConfiguration> {
        if !self.fs.exists(&self.path) {
            return Ok(LicensingConfiguration::default());
        }
        let contents = self.fs.read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(LicensingConfiguration::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Overwrites the file with `configuration`.
    ///
    /// # Errors
    ///
    /// Returns I/O errors (possibly transient).
    pub fn save(&self, configuration: &LicensingConfiguration) -> LicenseResult<()> {
        if let Some(parent) = self.path.parent() {
            self.fs.create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(configuration)?;
        self.fs.write(&self.path, &json)?;
        Ok(())
    }
}
