//! Library configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings read from a TOML file:
///
/// ```toml
/// title = "Home library"
/// sources = ["/srv/books", "/srv/flibusta/flibusta.inpx"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_title")]
    pub title: String,
    /// Directories to walk and individual files (books or containers).
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

fn default_title() -> String {
    "fbshelf library".to_string()
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            sources: Vec::new(),
        }
    }
}

impl LibraryConfig {
    /// Load from a TOML file. Relative sources are resolved against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(base) = path.parent() {
            for source in &mut config.sources {
                if source.is_relative() {
                    *source = base.join(&*source);
                }
            }
        }
        Ok(config)
    }
}
