//! Fixed prompt and notice texts for the brewing assistant

/// First entry of every chat history
pub const CHAT_SYSTEM_PROMPT: &str =
    "You are an AI assistant helping with home brewing. Answer clearly and practically.";

/// Transcript greeting shown at start-up
pub const CHAT_GREETING: &str =
    "Hi! Ask me anything about your recipe, your ingredients or brewing in general.";

pub const CHAT_CLEARED_NOTICE: &str = "Chat cleared. Ask a new question!";

pub const CHAT_PLACEHOLDER: &str = "...";

pub const RECIPE_CONTEXT_PREFIX: &str = "The current recipe: ";

pub const INVENTORY_CONTEXT_PREFIX: &str = "Ingredients available in the user's inventory: ";

/// Appended for the revision request only; not kept in history
pub const UPDATE_RECIPE_INSTRUCTION: &str = "Based on our discussion above, update the recipe and give me a new complete recipe in JSON format that follows exactly the same format as the current recipe. Only change the parts we discussed.";

/// Stored in history in place of the instruction once a revision succeeds
pub const UPDATE_RECIPE_REQUEST: &str = "Update the recipe based on our discussion.";

pub const RECIPE_UPDATED_NOTE: &str = "Recipe updated.";

pub const REVISION_APPLIED_NOTICE: &str = "The recipe has been updated based on the discussion.";

pub fn revision_failed_notice(reason: &str) -> String {
    format!("Could not update the recipe: {}", reason)
}

pub fn chat_error_notice(reason: &str) -> String {
    format!("An error occurred: {}", reason)
}
