use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;
use crate::filter::DEFAULT_PAGE_SIZE;
use crate::limiter::{DEFAULT_COOLDOWN_WINDOW_MS, DEFAULT_MAX_PER_WINDOW};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub browse: BrowseConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Which shape the catalog source has.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogFormat {
    /// JSON array of `{id, title, audio_url}` from a tracks API.
    Api,
    /// JSON array of full records including tags.
    TaggedJson,
    /// Numbered plain-text mapping: `N. filename` followed by a URL line.
    MappingText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog source — either an http(s):// URL or a local file path.
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_format")]
    pub format: CatalogFormat,
    /// Category assigned to records from sources that carry none.
    #[serde(default = "default_category")]
    pub default_category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_max_per_window")]
    pub max_per_window: usize,
    #[serde(default = "default_cooldown_window_ms")]
    pub cooldown_window_ms: i64,
    /// Directory downloaded tracks are written to.
    /// Defaults to `~/trackshelf-downloads`.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            format: default_format(),
            default_category: default_category(),
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_per_window: default_max_per_window(),
            cooldown_window_ms: default_cooldown_window_ms(),
            downloads_dir: default_downloads_dir(),
        }
    }
}

fn default_source() -> String {
    platform::config_dir()
        .join("catalog.json")
        .to_string_lossy()
        .into_owned()
}

fn default_format() -> CatalogFormat {
    CatalogFormat::TaggedJson
}

fn default_category() -> String {
    "bgm".to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_per_window() -> usize {
    DEFAULT_MAX_PER_WINDOW
}

fn default_cooldown_window_ms() -> i64 {
    DEFAULT_COOLDOWN_WINDOW_MS
}

fn default_downloads_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trackshelf-downloads")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.browse.page_size, 24);
        assert_eq!(config.download.max_per_window, 10);
        assert_eq!(config.download.cooldown_window_ms, 180_000);
        assert_eq!(config.catalog.format, CatalogFormat::TaggedJson);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [download]
            max_per_window = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.download.max_per_window, 5);
        assert_eq!(config.download.cooldown_window_ms, 180_000);
        assert_eq!(config.browse.page_size, 24);
    }
}
