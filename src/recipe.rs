//! Recipe draft lifecycle, rendering and AI-driven revision parsing

use crate::error::{AppError, AppResult};
use crate::inventory::trim_number;
use crate::models::RecipeDraft;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

pub const XML_BUTTON_LABEL: &str = "Export BeerXML";
pub const XML_BUTTON_BUSY_LABEL: &str = "Generating...";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DraftState {
    NoDraft,
    Loading { style: String },
    Displayed,
    ExportPending,
    RevisionPending,
    Error { message: String, retry_style: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionButton {
    pub label: String,
    pub enabled: bool,
}

impl ActionButton {
    fn idle() -> Self {
        Self {
            label: XML_BUTTON_LABEL.to_string(),
            enabled: true,
        }
    }
}

/// Owns the displayed draft. Every `begin_*` must be paired with its `finish_*`.
#[derive(Debug, Clone)]
pub struct RecipeManager {
    state: DraftState,
    draft: Option<RecipeDraft>,
    last_style: Option<String>,
    xml_button: ActionButton,
}

impl Default for RecipeManager {
    fn default() -> Self {
        Self {
            state: DraftState::NoDraft,
            draft: None,
            last_style: None,
            xml_button: ActionButton::idle(),
        }
    }
}

impl RecipeManager {
    pub fn state(&self) -> &DraftState {
        &self.state
    }

    pub fn draft(&self) -> Option<&RecipeDraft> {
        self.draft.as_ref()
    }

    pub fn last_style(&self) -> Option<&str> {
        self.last_style.as_deref()
    }

    pub fn xml_button(&self) -> &ActionButton {
        &self.xml_button
    }

    pub fn begin_draft(&mut self, style: &str) {
        self.last_style = Some(style.to_string());
        self.state = DraftState::Loading {
            style: style.to_string(),
        };
    }

    /// A failed generation keeps the previous draft cached but shows the error
    pub fn finish_draft(&mut self, result: &AppResult<RecipeDraft>) {
        match result {
            Ok(draft) => {
                self.draft = Some(draft.clone());
                self.state = DraftState::Displayed;
            }
            Err(e) => {
                self.state = DraftState::Error {
                    message: e.to_string(),
                    retry_style: self.last_style.clone(),
                };
            }
        }
    }

    /// Marks the export button busy and hands out the draft to export
    pub fn begin_export(&mut self) -> AppResult<RecipeDraft> {
        let draft = self.draft.clone().ok_or(AppError::NoDraft)?;
        self.xml_button = ActionButton {
            label: XML_BUTTON_BUSY_LABEL.to_string(),
            enabled: false,
        };
        self.state = DraftState::ExportPending;
        Ok(draft)
    }

    /// Restores the export button whatever the outcome
    pub fn finish_export(&mut self) {
        self.xml_button = ActionButton::idle();
        if self.state == DraftState::ExportPending {
            self.state = DraftState::Displayed;
        }
    }

    pub fn begin_revision(&mut self) -> AppResult<RecipeDraft> {
        let draft = self.draft.clone().ok_or(AppError::NoDraft)?;
        self.state = DraftState::RevisionPending;
        Ok(draft)
    }

    /// Replaces the draft on success; on failure the previous draft stays untouched
    pub fn finish_revision(&mut self, revised: Option<RecipeDraft>) {
        if let Some(draft) = revised {
            self.draft = Some(draft);
        }
        if self.state == DraftState::RevisionPending {
            self.state = DraftState::Displayed;
        }
    }

    pub fn view(&self) -> Option<RecipeView> {
        self.draft.as_ref().map(RecipeView::from_draft)
    }
}

// ============ Revision parsing ============

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("no JSON data found in the AI response")]
    NoJsonFound,
    #[error("the AI response contained malformed JSON: {0}")]
    InvalidJson(String),
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        AppError::MalformedAiResponse(e.to_string())
    }
}

fn revision_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid json fence pattern"),
            Regex::new(r"(?s)```\s*(.*?)\s*```").expect("valid fence pattern"),
            Regex::new(r"(?s)\{.*\}").expect("valid brace pattern"),
        ]
    })
}

/// Pulls a recipe out of free text: a ```json fence, then any fence, then the
/// outermost braces. Only the first pattern that matches is parsed.
pub fn extract_recipe_json(text: &str) -> Result<Value, ExtractError> {
    let candidate = revision_patterns()
        .iter()
        .find_map(|pattern| {
            pattern
                .captures(text)
                .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
        })
        .map(|m| m.as_str())
        .ok_or(ExtractError::NoJsonFound)?;

    serde_json::from_str(candidate).map_err(|e| ExtractError::InvalidJson(e.to_string()))
}

// ============ Rendering ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FermentableLine {
    pub name: String,
    pub percent: String,
    pub color_srm: String,
    pub supplier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeView {
    pub name: String,
    pub og: String,
    pub ibu: String,
    pub ebc: String,
    pub abv: String,
    pub fermentables: Vec<FermentableLine>,
    pub hops: Vec<String>,
    pub yeast: String,
}

/// JavaScript-style truthiness: null, false, 0 and "" count as missing
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(trim_number).unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

fn display_or(value: Option<&Value>, fallback: &str) -> String {
    present(value).map(display).unwrap_or_else(|| fallback.to_string())
}

impl RecipeView {
    pub fn from_draft(draft: &RecipeDraft) -> Self {
        let raw = &draft.0;
        let og = present(raw.get("target_og")).or_else(|| present(raw.get("og")));

        let metadata = raw.get("fermentables_metadata");
        let fermentables = raw
            .get("fermentables")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(name, values)| {
                        let percent = match values {
                            Value::Array(items) => items.first().map(display),
                            Value::Null => None,
                            other => Some(display(other)),
                        };
                        let meta = metadata.and_then(|m| m.get(name));
                        let color = meta
                            .and_then(|m| m.get("srm_color"))
                            .and_then(crate::models::value_as_f64)
                            .map(|c| format!("{:.1}", c));
                        FermentableLine {
                            name: name.clone(),
                            percent: percent.unwrap_or_else(|| "?".to_string()),
                            color_srm: color.unwrap_or_else(|| "?".to_string()),
                            supplier: display_or(meta.and_then(|m| m.get("supplier")), "Unknown"),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let hops = raw
            .get("hops")
            .and_then(Value::as_array)
            .map(|hops| hops.iter().map(format_hop_line).collect())
            .unwrap_or_default();

        let yeast = match raw.get("yeast") {
            Some(yeast) if yeast.is_object() => format!(
                "{} - {} packages",
                display_or(yeast.get("type"), "?"),
                display_or(yeast.get("amount"), "?")
            ),
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => "?".to_string(),
        };

        Self {
            name: display_or(raw.get("name"), "Untitled recipe"),
            og: og.map(display).unwrap_or_else(|| "?".to_string()),
            ibu: display_or(raw.get("ibu"), "?"),
            ebc: display_or(raw.get("ebc"), "?"),
            abv: display_or(raw.get("abv"), "calculated later"),
            fermentables,
            hops,
            yeast,
        }
    }
}

const DRY_HOP_LABEL: &str = "Dry hop";

/// Boil additions show bitterness; dry hops (time 0) show g/L, or the
/// dry hop label when no rate is given
pub fn format_hop_line(hop: &Value) -> String {
    if hop.is_null() {
        return String::new();
    }
    let name = display_or(hop.get("name"), "Unknown hop");
    let alpha = present(hop.get("alpha"))
        .map(|a| format!("{}% alpha", display(a)))
        .unwrap_or_default();
    let time = present(hop.get("time"))
        .and_then(crate::models::value_as_f64)
        .unwrap_or(0.0);

    if time == 0.0 {
        let rate = hop
            .get("dry_hop_rate")
            .filter(|v| !v.is_null())
            .map(|r| format!("{} g/L", display(r)))
            .unwrap_or_else(|| DRY_HOP_LABEL.to_string());
        format!("{} - {} - {} - {}", name, alpha, rate, DRY_HOP_LABEL)
    } else {
        let ibu = hop
            .get("ibu_contribution")
            .filter(|v| !v.is_null())
            .map(|i| format!("{} IBU", display(i)))
            .unwrap_or_default();
        format!("{} - {} - {} - {} min boil", name, alpha, ibu, trim_number(time))
    }
}
