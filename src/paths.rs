//! Path utilities and file system helpers

use std::path::{Path, PathBuf};

/// Application identifier, also used as the data directory name
pub const APP_IDENTIFIER: &str = "com.aibrewer.desktop";

/// Gets the application data directory
pub fn get_app_data_dir() -> Result<PathBuf, String> {
    dirs::data_dir()
        .map(|p| p.join(APP_IDENTIFIER))
        .ok_or_else(|| "Could not find app data directory".to_string())
}

/// Gets the key-value store database path
pub fn get_store_path() -> Result<PathBuf, String> {
    get_app_data_dir().map(|p| p.join("aibrewer_store.db"))
}

/// Gets the application config file path
pub fn get_config_path() -> Result<PathBuf, String> {
    get_app_data_dir().map(|p| p.join(".app_config.json"))
}

/// Gets the directory exported recipes are written to when none is configured
pub fn get_default_download_dir() -> Result<PathBuf, String> {
    dirs::download_dir()
        .or_else(|| get_app_data_dir().ok().map(|p| p.join("exports")))
        .ok_or_else(|| "Could not find download directory".to_string())
}

/// Turns a recipe name into a file name safe for every desktop platform
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "recipe".to_string()
    } else {
        cleaned
    }
}

/// Ensures the parent directory of `path` exists
pub fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create directory: {}", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_file_stem("Citra Pale Ale"), "Citra Pale Ale");
    }

    #[test]
    fn sanitize_replaces_separators() {
        assert_eq!(sanitize_file_stem("IPA/NEIPA: v2"), "IPA_NEIPA_ v2");
    }

    #[test]
    fn sanitize_falls_back_for_empty_names() {
        assert_eq!(sanitize_file_stem("   "), "recipe");
        assert_eq!(sanitize_file_stem(".."), "recipe");
    }
}
