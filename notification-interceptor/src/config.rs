//! Configuration management for the notification interceptor.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub host: HostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether interception is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Package id of this application; its own notifications are ignored
    #[serde(default = "default_own_package")]
    pub own_package: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: default_log_level(),
            own_package: default_own_package(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Cache root; the platform cache directory when unset
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// Subdirectory of the cache root holding extracted images
    #[serde(default = "default_directory_name")]
    pub directory_name: String,

    /// File name prefix for stored images
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// JPEG quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Files older than this are removed by the age-based sweep
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,

    /// Minimum usable space required before an image is written
    #[serde(default = "default_min_free_bytes")]
    pub min_free_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            directory_name: default_directory_name(),
            file_prefix: default_file_prefix(),
            jpeg_quality: default_jpeg_quality(),
            max_age_hours: default_max_age_hours(),
            min_free_bytes: default_min_free_bytes(),
        }
    }
}

impl StorageConfig {
    /// Resolve the cache root
    pub fn cache_root(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("notification-interceptor"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Resolve `content:`/`file:` URIs found in extras
    #[serde(default = "default_true")]
    pub resolve_uris: bool,

    /// Drop notifications that carry no image instead of publishing them
    /// with an empty image path
    #[serde(default = "default_true")]
    pub require_image: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            resolve_uris: true,
            require_image: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Whether notifications are monitored at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Only apps whose name or package contains this (case-insensitive)
    #[serde(default)]
    pub app_name_filter: String,

    /// Package ids to ignore (supports wildcards)
    #[serde(default)]
    pub blocked_apps: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_name_filter: String::new(),
            blocked_apps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Root for resource icons: `<dir>/<package>/<name>.png`
    #[serde(default)]
    pub resources_dir: Option<String>,

    /// Root for content URIs: `<dir>/<authority>/<path>`
    #[serde(default)]
    pub content_root: Option<String>,

    /// Package id -> display name
    #[serde(default)]
    pub app_labels: HashMap<String, String>,
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_own_package() -> String {
    "app.notification.interceptor".to_string()
}

fn default_directory_name() -> String {
    "notification_images".to_string()
}

fn default_file_prefix() -> String {
    "notification".to_string()
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_max_age_hours() -> u64 {
    24
}

fn default_min_free_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notification-interceptor")
            .join("config.toml")
    }
}
