//! Brewer personality presets and the persisted selection

use crate::db::KvStore;
use crate::error::AppResult;
use crate::models::{Personality, PersonalityPresets};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

pub const PERSONALITY_KEY: &str = "aibrewer_personality";
pub const DEFAULT_PERSONALITY: &str = "traditionalist";

/// Current id plus its preset when the backend offers one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalitySelection {
    pub id: String,
    pub preset: Option<Personality>,
}

/// Card shown in the personality picker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalityCard {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub selected: bool,
}

pub struct PersonalityManager {
    store: Arc<KvStore>,
    presets: PersonalityPresets,
    current: String,
}

impl PersonalityManager {
    /// Restores the persisted selection, or the default preset
    pub fn load(store: Arc<KvStore>) -> AppResult<Self> {
        let current = store
            .get(PERSONALITY_KEY)?
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| DEFAULT_PERSONALITY.to_string());
        info!("[personality] Current personality: {}", current);
        Ok(Self {
            store,
            presets: PersonalityPresets::new(),
            current,
        })
    }

    pub fn set_presets(&mut self, presets: PersonalityPresets) {
        if !presets.is_empty() && !presets.contains_key(&self.current) {
            warn!(
                "[personality] Persisted personality {} is not offered by the backend",
                self.current
            );
        }
        self.presets = presets;
    }

    pub fn current_id(&self) -> &str {
        &self.current
    }

    /// Preset for the current id; `None` means no special styling applies
    pub fn current(&self) -> Option<&Personality> {
        self.presets.get(&self.current)
    }

    /// Selects and persists `id`; returns the preset when the id is known
    pub fn select(&mut self, id: &str) -> AppResult<Option<Personality>> {
        let id = id.trim();
        self.store.set(PERSONALITY_KEY, id)?;
        self.current = id.to_string();
        info!("[personality] Selected {}", id);
        Ok(self.presets.get(id).cloned())
    }

    pub fn cards(&self) -> Vec<PersonalityCard> {
        self.presets
            .iter()
            .map(|(id, p)| PersonalityCard {
                id: id.clone(),
                name: p.name.clone(),
                icon: p.icon.clone(),
                description: p.description.clone(),
                selected: *id == self.current,
            })
            .collect()
    }
}

/// Toast shown after picking a personality
pub fn selection_notice(personality: &Personality) -> String {
    format!("{} is now helping with your brews!", personality.name)
}
