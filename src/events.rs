//! Domain events pushed to the webview

use crate::ingredients::PickerState;
use crate::inventory::InventoryView;
use crate::models::{IngredientKey, TranscriptEntry};
use crate::recipe::{ActionButton, DraftState, RecipeView};
use crate::styles::StyleSuggestions;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrewerEvent {
    InventoryLoaded {
        view: InventoryView,
        picker: PickerState,
    },
    IngredientsSelected(Vec<IngredientKey>),
    StylesSuggested(StyleSuggestions),
    DraftStateChanged {
        state: DraftState,
        recipe: Option<RecipeView>,
        xml_button: ActionButton,
    },
    ChatUpdated(Vec<TranscriptEntry>),
    XmlExported {
        file_name: String,
        path: String,
    },
    PersonalityChanged {
        id: String,
        name: Option<String>,
    },
    Notification {
        level: NoticeLevel,
        message: String,
    },
}

impl BrewerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BrewerEvent::InventoryLoaded { .. } => "inventory-loaded",
            BrewerEvent::IngredientsSelected(_) => "ingredients-selected",
            BrewerEvent::StylesSuggested(_) => "styles-suggested",
            BrewerEvent::DraftStateChanged { .. } => "draft-state-changed",
            BrewerEvent::ChatUpdated(_) => "chat-updated",
            BrewerEvent::XmlExported { .. } => "xml-exported",
            BrewerEvent::PersonalityChanged { .. } => "personality-changed",
            BrewerEvent::Notification { .. } => "notification",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            BrewerEvent::InventoryLoaded { view, picker } => {
                json!({ "view": view, "picker": picker })
            }
            BrewerEvent::IngredientsSelected(keys) => json!({ "ingredients": keys }),
            BrewerEvent::StylesSuggested(suggestions) => json!(suggestions),
            BrewerEvent::DraftStateChanged {
                state,
                recipe,
                xml_button,
            } => json!({ "state": state, "recipe": recipe, "xml_button": xml_button }),
            BrewerEvent::ChatUpdated(entries) => json!({ "transcript": entries }),
            BrewerEvent::XmlExported { file_name, path } => {
                json!({ "file_name": file_name, "path": path })
            }
            BrewerEvent::PersonalityChanged { id, name } => json!({ "id": id, "name": name }),
            BrewerEvent::Notification { level, message } => {
                json!({ "level": level, "message": message })
            }
        }
    }

    pub fn notice(level: NoticeLevel, message: impl Into<String>) -> Self {
        BrewerEvent::Notification {
            level,
            message: message.into(),
        }
    }
}

/// Where the coordinator publishes events; the app handle in production
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &BrewerEvent);
}

#[cfg(test)]
pub mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<BrewerEvent>>,
    }

    impl RecordingSink {
        pub fn names(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().iter().map(BrewerEvent::name).collect()
        }

        pub fn events(&self) -> Vec<BrewerEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn count(&self, name: &str) -> usize {
            self.names().into_iter().filter(|n| *n == name).count()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: &BrewerEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_payload() {
        let event = BrewerEvent::notice(NoticeLevel::Success, "Saved");
        assert_eq!(event.name(), "notification");
        assert_eq!(event.payload(), json!({ "level": "success", "message": "Saved" }));
    }

    #[test]
    fn selection_payload_uses_keys() {
        let event = BrewerEvent::IngredientsSelected(vec![IngredientKey::new(
            crate::models::Category::Hops,
            "Citra",
        )]);
        assert_eq!(
            event.payload(),
            json!({ "ingredients": [{ "category": "hops", "name": "Citra" }] })
        );
    }
}
