//! Data models and structures used throughout the application

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

// ============ Inventory ============

/// Ingredient category as named by the backend inventory payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fermentables,
    Hops,
    Yeasts,
}

impl Category {
    /// Display order used by every inventory view
    pub const ALL: [Category; 3] = [Category::Fermentables, Category::Hops, Category::Yeasts];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fermentables => "fermentables",
            Category::Hops => "hops",
            Category::Yeasts => "yeasts",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Fermentables => "Malt",
            Category::Hops => "Hops",
            Category::Yeasts => "Yeast",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Fermentables => "🌾",
            Category::Hops => "🌿",
            Category::Yeasts => "🧫",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Category::Fermentables => "kg",
            Category::Hops => "g",
            Category::Yeasts => "pkg",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts numbers, numeric strings and null
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

/// Null and missing names read as empty; numbers are kept as text
fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// One inventory record; category-specific attributes are kept as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub inventory: Option<f64>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl InventoryItem {
    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(value_as_f64)
    }

    pub fn color(&self) -> Option<f64> {
        self.attribute_f64("color")
    }

    pub fn alpha(&self) -> Option<f64> {
        self.attribute_f64("alpha")
    }

    pub fn in_stock(&self) -> bool {
        self.inventory.map(|amount| amount > 0.0).unwrap_or(false)
    }
}

/// Inventory snapshot as returned by `get-inventory`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub fermentables: Vec<InventoryItem>,
    #[serde(default)]
    pub hops: Vec<InventoryItem>,
    #[serde(default)]
    pub yeasts: Vec<InventoryItem>,
}

impl Inventory {
    /// Typed view over the backend payload. Records without a usable name
    /// are skipped; the payload itself is never modified.
    pub fn from_raw(raw: &Value) -> Self {
        let mut inventory = Inventory::default();
        for category in Category::ALL {
            let Some(records) = raw.get(category.as_str()).and_then(Value::as_array) else {
                continue;
            };
            let items = match category {
                Category::Fermentables => &mut inventory.fermentables,
                Category::Hops => &mut inventory.hops,
                Category::Yeasts => &mut inventory.yeasts,
            };
            for (index, record) in records.iter().enumerate() {
                match serde_json::from_value::<InventoryItem>(record.clone()) {
                    Ok(item) if !item.name.is_empty() => items.push(item),
                    Ok(_) => warn!("[inventory] Skipping nameless {} record #{}", category, index),
                    Err(e) => warn!("[inventory] Skipping {} record #{}: {}", category, index, e),
                }
            }
        }
        inventory
    }

    pub fn items(&self, category: Category) -> &[InventoryItem] {
        match category {
            Category::Fermentables => &self.fermentables,
            Category::Hops => &self.hops,
            Category::Yeasts => &self.yeasts,
        }
    }

    pub fn total_items(&self) -> usize {
        Category::ALL.iter().map(|c| self.items(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }
}

/// Identity of a selectable ingredient
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IngredientKey {
    pub category: Category,
    pub name: String,
}

impl IngredientKey {
    pub fn new(category: Category, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }
}

impl fmt::Display for IngredientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.name)
    }
}

// ============ Users ============

/// Saved Brewfather credential profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(rename = "apiId")]
    pub api_id: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

impl UserProfile {
    pub fn has_credentials(&self) -> bool {
        !self.api_id.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_id: self.api_id.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "apiId")]
    pub api_id: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

// ============ Personalities ============

/// Server-defined brewer persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
}

pub type PersonalityPresets = BTreeMap<String, Personality>;

// ============ Chat ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Message in the history sent to the `discuss` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    You,
    Assistant,
    System,
}

/// Line shown in the chat panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    pub timestamp: String,
    #[serde(default)]
    pub pending: bool,
}

// ============ Recipes ============

/// AI-generated draft; kept opaque apart from a few display accessors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeDraft(pub Value);

impl RecipeDraft {
    pub fn name(&self) -> Option<&str> {
        self.0
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Download file name: `<name>.xml`, or `recipe.xml` when unnamed
    pub fn xml_file_name(&self) -> String {
        match self.name() {
            Some(name) => format!("{}.xml", crate::paths::sanitize_file_stem(name)),
            None => "recipe.xml".to_string(),
        }
    }
}

/// Entry of the saved recipes list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecipe {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}
