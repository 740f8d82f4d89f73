//! Application configuration stored next to the key-value store

use crate::paths::{ensure_parent_dir, get_config_path};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Backend URL baked in by build.rs when AIBREWER_BACKEND_URL is set
const BUILTIN_BACKEND_URL: &str = env!("DEFAULT_BACKEND_URL");

/// Fallback backend for local development
pub const LOCAL_BACKEND_URL: &str = "http://localhost:5000";

/// Equipment profile sent with every workflow request
pub const DEFAULT_EQUIPMENT_PROFILE: &str = "Grainfather G30";

/// Runtime override for the backend URL
pub const BASE_URL_ENV: &str = "AIBREWER_BASE_URL";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_equipment_profile")]
    pub equipment_profile: String,
    #[serde(default)]
    pub debug: bool,
    /// Where exported BeerXML files go; OS download dir when unset
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    if BUILTIN_BACKEND_URL.is_empty() {
        LOCAL_BACKEND_URL.to_string()
    } else {
        BUILTIN_BACKEND_URL.to_string()
    }
}

fn default_equipment_profile() -> String {
    DEFAULT_EQUIPMENT_PROFILE.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            equipment_profile: default_equipment_profile(),
            debug: false,
            download_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the app data directory and applies the env override
    pub fn load() -> Result<Self, String> {
        let mut config = Self::load_from(&get_config_path()?)?;
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read app config: {}", e))?;
        let mut config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse app config: {}", e))?;
        config.base_url = normalize_base_url(&config.base_url);
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        ensure_parent_dir(path)?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize app config: {}", e))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to save app config: {}", e))
    }
}

/// Trims whitespace and trailing slashes; an empty value falls back to the default
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        default_base_url()
    } else {
        trimmed.to_string()
    }
}
