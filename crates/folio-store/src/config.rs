//! Folio configuration, stored as RON.
//!
//! ```ron
//! (
//!     editor: (large_selection_ratio: 0.5),
//!     save: (debounce_ms: 5000, autosave: true, min_content_chars: 4),
//! )
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use std::path::Path;

use folio_doc::EditorConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scheduler::SaveConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub editor: EditorConfig,
    pub save: SaveConfig,
}

impl FolioConfig {
    /// Parse RON text.
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(content)?)
    }

    /// Pretty RON for writing a starter config.
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Load from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Load from `path` if given and present, otherwise defaults.
    ///
    /// A file that exists but does not parse is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => {
                let config = Self::load(path)?;
                tracing::debug!(path = %path.display(), "loaded config");
                Ok(config)
            }
            Some(path) => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}
