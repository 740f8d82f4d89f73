//! Ingredient picker: tabbed, searchable grid over the inventory with a selection set

use crate::inventory::format_amount;
use crate::models::{Category, IngredientKey, Inventory, InventoryItem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// SRM 0..=41 to an approximate beer color
const SRM_COLORS: [&str; 42] = [
    "#FFE699", "#FFD878", "#FFCA5A", "#FFBF42", "#FBB123", "#F8A600", "#F39C00", "#EA8F00",
    "#E58500", "#DE7C00", "#D77200", "#CF6900", "#CB6200", "#C35900", "#BB5100", "#B54C00",
    "#B04500", "#A63E00", "#A13700", "#9B3200", "#952D00", "#8E2900", "#882300", "#821E00",
    "#7B1A00", "#771900", "#701400", "#6A0E00", "#660D00", "#5E0B00", "#5A0A02", "#600903",
    "#520907", "#4C0505", "#470606", "#440607", "#3F0708", "#3B0607", "#3A070B", "#36080A",
    "#2F0A0B", "#2B0C0E",
];

/// Swatch for an SRM value; fractional values use the lower entry
pub fn srm_color_hex(srm: f64) -> &'static str {
    if srm.is_nan() || srm <= 0.0 {
        return SRM_COLORS[0];
    }
    let index = (srm.floor() as usize).min(SRM_COLORS.len() - 1);
    SRM_COLORS[index]
}

/// Quick filters offered per category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerFilter {
    LightColor,
    MediumColor,
    DarkColor,
    LowAlpha,
    MediumAlpha,
    HighAlpha,
    InStock,
}

impl PickerFilter {
    pub fn for_category(category: Category) -> Vec<PickerFilter> {
        match category {
            Category::Fermentables => vec![
                PickerFilter::LightColor,
                PickerFilter::MediumColor,
                PickerFilter::DarkColor,
                PickerFilter::InStock,
            ],
            Category::Hops => vec![
                PickerFilter::LowAlpha,
                PickerFilter::MediumAlpha,
                PickerFilter::HighAlpha,
                PickerFilter::InStock,
            ],
            Category::Yeasts => vec![PickerFilter::InStock],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PickerFilter::LightColor => "Light (<5 SRM)",
            PickerFilter::MediumColor => "Medium (5-15 SRM)",
            PickerFilter::DarkColor => "Dark (>15 SRM)",
            PickerFilter::LowAlpha => "Low alpha (<5%)",
            PickerFilter::MediumAlpha => "Medium alpha (5-10%)",
            PickerFilter::HighAlpha => "High alpha (>10%)",
            PickerFilter::InStock => "In stock",
        }
    }

    pub fn matches(&self, item: &InventoryItem) -> bool {
        let color = item.color().unwrap_or(0.0);
        let alpha = item.alpha().unwrap_or(0.0);
        match self {
            PickerFilter::LightColor => color < 5.0,
            PickerFilter::MediumColor => (5.0..15.0).contains(&color),
            PickerFilter::DarkColor => color >= 15.0,
            PickerFilter::LowAlpha => alpha < 5.0,
            PickerFilter::MediumAlpha => (5.0..10.0).contains(&alpha),
            PickerFilter::HighAlpha => alpha >= 10.0,
            PickerFilter::InStock => item.in_stock(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOption {
    pub filter: PickerFilter,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientCard {
    pub key: IngredientKey,
    pub name: String,
    pub amount: String,
    pub detail: Option<String>,
    pub swatch: Option<&'static str>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickerTab {
    pub category: Category,
    pub label: &'static str,
    pub icon: &'static str,
    pub active: bool,
    pub selected: usize,
    pub total: usize,
}

/// Everything the page needs to draw the picker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickerState {
    pub tabs: Vec<PickerTab>,
    pub filters: Vec<FilterOption>,
    pub search: String,
    pub cards: Vec<IngredientCard>,
    pub selected_count: usize,
    pub total_count: usize,
}

/// Canonical picker. Starts with nothing selected.
#[derive(Debug, Clone, Default)]
pub struct IngredientSelector {
    entries: Vec<(IngredientKey, InventoryItem)>,
    selected: BTreeSet<IngredientKey>,
    active_tab: Option<Category>,
    search: String,
    filter: Option<PickerFilter>,
}

impl IngredientSelector {
    pub fn new(inventory: &Inventory) -> Self {
        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();
        for category in Category::ALL {
            for item in inventory.items(category) {
                let key = IngredientKey::new(category, item.name.clone());
                if seen.insert(key.clone()) {
                    entries.push((key, item.clone()));
                }
            }
        }
        Self {
            entries,
            selected: BTreeSet::new(),
            active_tab: Some(Category::Fermentables),
            search: String::new(),
            filter: None,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, key: &IngredientKey) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Flips membership of `key`; unknown keys are ignored. Returns the new state.
    pub fn toggle(&mut self, key: &IngredientKey) -> bool {
        if !self.contains(key) {
            return false;
        }
        if !self.selected.remove(key) {
            self.selected.insert(key.clone());
            true
        } else {
            false
        }
    }

    pub fn is_selected(&self, key: &IngredientKey) -> bool {
        self.selected.contains(key)
    }

    pub fn select_all(&mut self, category: Category) {
        for (key, _) in self.entries.iter().filter(|(k, _)| k.category == category) {
            self.selected.insert(key.clone());
        }
    }

    pub fn clear_all(&mut self, category: Category) {
        self.selected.retain(|k| k.category != category);
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn set_tab(&mut self, category: Category) {
        if self.active_tab != Some(category) {
            self.filter = None;
        }
        self.active_tab = Some(category);
    }

    pub fn active_tab(&self) -> Category {
        self.active_tab.unwrap_or(Category::Fermentables)
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.trim().to_lowercase();
    }

    /// Applies a quick filter; filters that do not apply to the active tab are dropped
    pub fn set_filter(&mut self, filter: Option<PickerFilter>) {
        self.filter = filter.filter(|f| PickerFilter::for_category(self.active_tab()).contains(f));
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Selection in stable (category, name) order
    pub fn selection(&self) -> Vec<IngredientKey> {
        self.selected.iter().cloned().collect()
    }

    fn is_visible(&self, key: &IngredientKey, item: &InventoryItem) -> bool {
        if key.category != self.active_tab() {
            return false;
        }
        if !self.search.is_empty() && !item.name.to_lowercase().contains(&self.search) {
            return false;
        }
        self.filter.map(|f| f.matches(item)).unwrap_or(true)
    }

    fn card(&self, key: &IngredientKey, item: &InventoryItem) -> IngredientCard {
        let (detail, swatch) = match key.category {
            Category::Fermentables => match item.color().filter(|c| *c > 0.0) {
                Some(color) => (Some(format!("{} SRM", color)), Some(srm_color_hex(color))),
                None => (None, None),
            },
            Category::Hops => (item.alpha().filter(|a| *a > 0.0).map(|a| format!("{}% α", a)), None),
            Category::Yeasts => (None, None),
        };
        IngredientCard {
            key: key.clone(),
            name: item.name.clone(),
            amount: format_amount(key.category, item),
            detail,
            swatch,
            selected: self.is_selected(key),
        }
    }

    pub fn state(&self) -> PickerState {
        let active = self.active_tab();
        let tabs = Category::ALL
            .iter()
            .map(|category| PickerTab {
                category: *category,
                label: category.label(),
                icon: category.icon(),
                active: *category == active,
                selected: self.selected.iter().filter(|k| k.category == *category).count(),
                total: self.entries.iter().filter(|(k, _)| k.category == *category).count(),
            })
            .collect();
        let filters = PickerFilter::for_category(active)
            .into_iter()
            .map(|filter| FilterOption {
                filter,
                label: filter.label(),
                active: self.filter == Some(filter),
            })
            .collect();
        let cards = self
            .entries
            .iter()
            .filter(|(key, item)| self.is_visible(key, item))
            .map(|(key, item)| self.card(key, item))
            .collect();

        PickerState {
            tabs,
            filters,
            search: self.search.clone(),
            cards,
            selected_count: self.selected.len(),
            total_count: self.entries.len(),
        }
    }
}
