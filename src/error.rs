//! Error taxonomy shared by every component and surfaced to the webview

use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Backend answered with a non-success status
    #[error("API error: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No active brewing profile. Configure a Brewfather profile in Settings first.")]
    NotAuthenticated,

    #[error("No ingredients selected. Select ingredients first.")]
    NoIngredientsSelected,

    #[error("No recipe draft available.")]
    NoDraft,

    #[error("Malformed AI response: {0}")]
    MalformedAiResponse(String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl AppError {
    /// Errors that block an action before any request is sent and warrant a modal prompt
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AppError::NotAuthenticated
                | AppError::NoIngredientsSelected
                | AppError::NoDraft
                | AppError::InvalidProfile(_)
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

// Commands hand errors to the webview as plain strings
impl Serialize for AppError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_display_string() {
        let err = AppError::Api {
            status: 500,
            message: "Brewfather unavailable".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"API error: Brewfather unavailable\"");
    }

    #[test]
    fn precondition_classification() {
        assert!(AppError::NoIngredientsSelected.is_precondition());
        assert!(AppError::NotAuthenticated.is_precondition());
        assert!(!AppError::Network("down".into()).is_precondition());
        assert!(!AppError::MalformedAiResponse("x".into()).is_precondition());
    }
}
