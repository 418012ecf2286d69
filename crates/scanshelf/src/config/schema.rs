use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one PDF per catalog entry.
    #[serde(default = "default_catalog_directory")]
    pub catalog_directory: PathBuf,
    /// SQLite file backing the key-value store.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub thumbnail: ThumbnailSize,
    /// Prefix of generated names when a document is assembled without one.
    #[serde(default = "default_name_prefix")]
    pub default_name_prefix: String,
    /// Capacity of the catalog event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scanshelf")
}

fn default_catalog_directory() -> PathBuf {
    data_root().join("documents")
}

fn default_database_path() -> PathBuf {
    data_root().join("catalog.db")
}

fn default_name_prefix() -> String {
    "Scanned".to_string()
}

fn default_event_capacity() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_directory: default_catalog_directory(),
            database_path: default_database_path(),
            thumbnail: ThumbnailSize::default(),
            default_name_prefix: default_name_prefix(),
            event_capacity: default_event_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Pixel budget of catalog thumbnails. The rendered preview fits inside
/// these bounds with its aspect ratio preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailSize {
    #[serde(default = "default_thumbnail_width")]
    pub width: u32,
    #[serde(default = "default_thumbnail_height")]
    pub height: u32,
}

fn default_thumbnail_width() -> u32 {
    200
}

fn default_thumbnail_height() -> u32 {
    300
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self {
            width: default_thumbnail_width(),
            height: default_thumbnail_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
