/// Provider configuration
///
/// Paths for the sticker root, the thumbnail cache and the catalog database,
/// plus a few knobs for the provider. Stored as JSON; every field has a
/// default so a partial (or missing) file still loads.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Application folder name under the platform data/cache directories
const APP_DIR: &str = "rays";

/// How generated thumbnails are written to the cache
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ThumbnailEncoding {
    /// PNG keeps sticker transparency
    #[default]
    Png,
    /// JPEG at the given quality (1-100), alpha flattened over white
    Jpeg { quality: u8 },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Root directory holding one file per sticker, named by sticker id
    pub sticker_dir: PathBuf,
    /// Directory for generated thumbnails
    pub thumbnail_dir: PathBuf,
    /// SQLite catalog
    pub database_path: PathBuf,
    /// Maximum number of rows returned by the recents query
    pub recent_limit: usize,
    pub thumbnail_encoding: ThumbnailEncoding,
    pub root_title: String,
    pub root_summary: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let data_dir = Self::data_dir();
        Self {
            sticker_dir: data_dir.join("stickers"),
            thumbnail_dir: Self::cache_dir().join("provider_thumbnails"),
            database_path: data_dir.join("rays.db"),
            recent_limit: 64,
            thumbnail_encoding: ThumbnailEncoding::default(),
            root_title: "Rays".to_string(),
            root_summary: "Stickers".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Build a config rooted at one directory, used by tests and portable installs
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            sticker_dir: base.join("stickers"),
            thumbnail_dir: base.join("provider_thumbnails"),
            database_path: base.join("rays.db"),
            ..Self::default()
        }
    }

    /// Load the config from a JSON file, falling back to defaults when the file is missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write the config as pretty JSON, creating the parent directory if needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Create the sticker root and the thumbnail cache directory
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.sticker_dir)?;
        fs::create_dir_all(&self.thumbnail_dir)?;
        Ok(())
    }

    /// Default location of the config file
    /// - Linux: ~/.config/rays/provider.json
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push("provider.json");
        path
    }

    /// ~/.local/share/rays on Linux
    fn data_dir() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path
    }

    /// ~/.cache/rays on Linux
    fn cache_dir() -> PathBuf {
        let mut path = dirs_next::cache_dir()
            .or_else(dirs_next::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ProviderConfig::from_json(r#"{ "recent_limit": 5 }"#).unwrap();
        assert_eq!(config.recent_limit, 5);
        assert_eq!(config.thumbnail_encoding, ThumbnailEncoding::Png);
        assert_eq!(config.root_summary, "Stickers");
    }

    #[test]
    fn test_default_encoding_is_png() {
        assert_eq!(ThumbnailEncoding::default(), ThumbnailEncoding::Png);
        assert_eq!(
            serde_json::to_string(&ThumbnailEncoding::default()).unwrap(),
            r#"{"format":"png"}"#
        );
    }

    #[test]
    fn test_jpeg_encoding_from_json() {
        let config = ProviderConfig::from_json(
            r#"{ "thumbnail_encoding": { "format": "jpeg", "quality": 85 } }"#,
        )
        .unwrap();
        assert_eq!(config.thumbnail_encoding, ThumbnailEncoding::Jpeg { quality: 85 });
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let config = ProviderConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, ProviderConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf").join("provider.json");
        let mut config = ProviderConfig::rooted_at(dir.path());
        config.root_title = "Mine".to_string();
        config.save(&path).unwrap();

        let loaded = ProviderConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempdir().unwrap();
        let config = ProviderConfig::rooted_at(dir.path());
        config.ensure_dirs().unwrap();
        assert!(config.sticker_dir.is_dir());
        assert!(config.thumbnail_dir.is_dir());
    }
}
