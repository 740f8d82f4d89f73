//! Session copy of the Brewfather inventory and its renderings

use crate::models::{Category, Inventory, InventoryItem};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryLine {
    pub name: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySection {
    pub category: Category,
    pub title: String,
    pub lines: Vec<InventoryLine>,
}

/// Per-category listing; empty categories are omitted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryView {
    pub sections: Vec<InventorySection>,
}

/// Read-only cache of the inventory for this session. The backend payload is
/// kept as received; the typed copy only feeds views and the picker.
#[derive(Debug, Default)]
pub struct InventoryManager {
    raw: Option<Value>,
    data: Option<Inventory>,
}

impl InventoryManager {
    pub fn replace(&mut self, raw: Value) -> &Inventory {
        let inventory = Inventory::from_raw(&raw);
        self.raw = Some(raw);
        self.data.insert(inventory)
    }

    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    pub fn data(&self) -> Option<&Inventory> {
        self.data.as_ref()
    }

    pub fn view(&self) -> InventoryView {
        self.data.as_ref().map(render_view).unwrap_or_default()
    }
}

/// `4.50 kg`, `100.00 g`, `2 pkg`; missing or zero stock reads "unknown amount"
pub fn format_amount(category: Category, item: &InventoryItem) -> String {
    match item.inventory {
        Some(amount) if amount != 0.0 => match category {
            Category::Fermentables | Category::Hops => {
                format!("{:.2} {}", amount, category.unit())
            }
            Category::Yeasts => format!("{} {}", trim_number(amount), category.unit()),
        },
        _ => "unknown amount".to_string(),
    }
}

/// Renders whole numbers without a fractional part
pub fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

pub fn render_view(inventory: &Inventory) -> InventoryView {
    let sections = Category::ALL
        .iter()
        .filter(|c| !inventory.items(**c).is_empty())
        .map(|category| InventorySection {
            category: *category,
            title: capitalize(category.as_str()),
            lines: inventory
                .items(*category)
                .iter()
                .map(|item| InventoryLine {
                    name: item.name.clone(),
                    amount: format_amount(*category, item),
                })
                .collect(),
        })
        .collect();
    InventoryView { sections }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn attribute_or_na(item: &InventoryItem, key: &str) -> Value {
    match item.attributes.get(key) {
        Some(value)
            if !value.is_null() && *value != json!("") && value.as_f64() != Some(0.0) =>
        {
            value.clone()
        }
        _ => json!("N/A"),
    }
}

fn stock_text(item: &InventoryItem, unit: &str) -> String {
    match item.inventory {
        Some(amount) => format!("{} {}", trim_number(amount), unit),
        None => format!("unknown {}", unit),
    }
}

/// Compact summary injected into the chat context
pub fn chat_summary(inventory: &Inventory) -> Value {
    let fermentables: Vec<Value> = inventory
        .fermentables
        .iter()
        .map(|item| {
            json!({
                "name": item.name,
                "amount": stock_text(item, "kg"),
                "color": attribute_or_na(item, "color"),
            })
        })
        .collect();
    let hops: Vec<Value> = inventory
        .hops
        .iter()
        .map(|item| {
            json!({
                "name": item.name,
                "amount": stock_text(item, "g"),
                "alpha": attribute_or_na(item, "alpha"),
            })
        })
        .collect();
    let yeasts: Vec<Value> = inventory
        .yeasts
        .iter()
        .map(|item| {
            json!({
                "name": item.name,
                "amount": stock_text(item, "pkg"),
            })
        })
        .collect();

    json!({
        "fermentables": fermentables,
        "hops": hops,
        "yeasts": yeasts,
    })
}
