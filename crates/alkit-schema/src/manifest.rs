//! Application manifest (`app.json`) model.
//!
//! Only the fields needed to work out which symbol packages an application
//! compiles against are modelled; everything else in the file is ignored.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading an application manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The contents are not a valid manifest.
    #[error("Invalid app manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The subset of `app.json` used for dependency resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppManifest {
    /// Application GUID.
    #[serde(default, alias = "appId")]
    pub id: Option<String>,
    /// Application name.
    pub name: String,
    /// Publisher name.
    pub publisher: String,
    /// Application version.
    pub version: String,
    /// Minimum platform version the app targets.
    #[serde(default)]
    pub platform: Option<String>,
    /// Minimum application version the app targets.
    #[serde(default)]
    pub application: Option<String>,
    /// Explicitly declared dependencies, in declaration order.
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

/// One entry of the manifest's `dependencies` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// Application GUID of the dependency (`id`, or `appId` in older manifests).
    #[serde(default, alias = "appId")]
    pub id: Option<String>,
    /// Dependency name.
    pub name: String,
    /// Dependency publisher.
    pub publisher: String,
    /// Minimum required version.
    pub version: String,
}

impl AppManifest {
    /// Parse a manifest from JSON text, tolerating a leading byte-order mark.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] if the text is not a valid manifest.
    pub fn from_json_str(text: &str) -> Result<Self, ManifestError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read, or
    /// [`ManifestError::Parse`] if its contents are invalid.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}
