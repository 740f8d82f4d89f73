//! Chat history sent to the assistant and the transcript shown to the user

use crate::error::AppResult;
use crate::inventory::chat_summary;
use crate::models::{ChatMessage, Inventory, RecipeDraft, Sender, TranscriptEntry};
use crate::prompts;
use log::{debug, info};

/// Snapshot handed to the request while the placeholder is on screen
#[derive(Debug, Clone)]
pub struct PendingChat {
    pub placeholder_id: u64,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone)]
pub struct ChatSystem {
    history: Vec<ChatMessage>,
    transcript: Vec<TranscriptEntry>,
    next_id: u64,
    recipe_context_added: bool,
    inventory_context_added: bool,
}

impl Default for ChatSystem {
    fn default() -> Self {
        let mut chat = Self {
            history: vec![ChatMessage::system(prompts::CHAT_SYSTEM_PROMPT)],
            transcript: Vec::new(),
            next_id: 1,
            recipe_context_added: false,
            inventory_context_added: false,
        };
        chat.notify(Sender::Assistant, prompts::CHAT_GREETING);
        chat
    }
}

impl ChatSystem {
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    #[cfg(test)]
    pub fn recipe_context_added(&self) -> bool {
        self.recipe_context_added
    }

    #[cfg(test)]
    pub fn inventory_context_added(&self) -> bool {
        self.inventory_context_added
    }

    /// Appends a transcript line without touching the model history
    pub fn notify(&mut self, sender: Sender, text: &str) -> u64 {
        self.push_entry(sender, text, false)
    }

    fn push_entry(&mut self, sender: Sender, text: &str, pending: bool) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.transcript.push(TranscriptEntry {
            id,
            sender,
            text: text.to_string(),
            timestamp: chrono::Local::now().format("%H:%M").to_string(),
            pending,
        });
        id
    }

    /// Records the user message, injects recipe and inventory context once each,
    /// and shows a placeholder. Blank input yields `None`.
    pub fn begin_message(
        &mut self,
        text: &str,
        recipe: Option<&RecipeDraft>,
        inventory: Option<&Inventory>,
    ) -> AppResult<Option<PendingChat>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        self.notify(Sender::You, text);
        self.history.push(ChatMessage::user(text));

        if let Some(draft) = recipe {
            if !self.recipe_context_added {
                let body = serde_json::to_string_pretty(&draft.0)?;
                self.history.push(ChatMessage::system(format!(
                    "{}{}",
                    prompts::RECIPE_CONTEXT_PREFIX,
                    body
                )));
                self.recipe_context_added = true;
                debug!("[chat] Added recipe context");
            }
        }

        if let Some(inventory) = inventory {
            if !self.inventory_context_added {
                let body = serde_json::to_string_pretty(&chat_summary(inventory))?;
                self.history.push(ChatMessage::system(format!(
                    "{}{}",
                    prompts::INVENTORY_CONTEXT_PREFIX,
                    body
                )));
                self.inventory_context_added = true;
                debug!("[chat] Added inventory context");
            }
        }

        let placeholder_id = self.push_entry(Sender::Assistant, prompts::CHAT_PLACEHOLDER, true);
        Ok(Some(PendingChat {
            placeholder_id,
            messages: self.history.clone(),
        }))
    }

    /// Swaps the placeholder for the answer, or turns it into the error text
    pub fn complete_message(&mut self, placeholder_id: u64, result: &AppResult<String>) {
        match result {
            Ok(answer) => {
                self.transcript.retain(|entry| entry.id != placeholder_id);
                self.history.push(ChatMessage::assistant(answer.clone()));
                self.notify(Sender::Assistant, answer);
            }
            Err(e) => {
                if let Some(entry) = self
                    .transcript
                    .iter_mut()
                    .find(|entry| entry.id == placeholder_id)
                {
                    entry.text = prompts::chat_error_notice(&e.to_string());
                    entry.pending = false;
                }
            }
        }
    }

    /// Full history plus the one-off revision instruction
    pub fn revision_messages(&self) -> Vec<ChatMessage> {
        let mut messages = self.history.clone();
        messages.push(ChatMessage::user(prompts::UPDATE_RECIPE_INSTRUCTION));
        messages
    }

    pub fn record_revision(&mut self, answer: &str) {
        self.history.push(ChatMessage::user(prompts::UPDATE_RECIPE_REQUEST));
        self.history.push(ChatMessage::assistant(answer));
        self.history.push(ChatMessage::system(prompts::RECIPE_UPDATED_NOTE));
    }

    pub fn clear(&mut self) {
        self.history = vec![ChatMessage::system(prompts::CHAT_SYSTEM_PROMPT)];
        self.transcript.clear();
        self.recipe_context_added = false;
        self.inventory_context_added = false;
        self.notify(Sender::System, prompts::CHAT_CLEARED_NOTICE);
        info!("[chat] Cleared");
    }
}
