//! Beer style suggestions returned as free text

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

fn numbered_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+\.\s([^\n]+)").expect("valid style pattern"))
}

/// AI reasoning plus the style names picked out of its numbered list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleSuggestions {
    pub text: String,
    pub styles: Vec<String>,
}

impl StyleSuggestions {
    pub fn from_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            styles: extract_style_names(text),
        }
    }
}

/// Names from `<digits>. <name>` lines, in order of appearance
pub fn extract_style_names(text: &str) -> Vec<String> {
    numbered_line()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
