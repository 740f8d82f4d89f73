// Prevents additional console window on Windows in release
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Module declarations
mod api_client;
mod chat;
mod config;
mod db;
mod error;
mod events;
mod ingredients;
mod inventory;
mod models;
mod paths;
mod personality;
mod prompts;
mod recipe;
mod state;
mod styles;
mod user_manager;

#[cfg(test)]
mod test_support;

use api_client::StyleFilter;
use config::AppConfig;
use db::KvStore;
use error::{AppError, AppResult};
use events::{BrewerEvent, EventSink};
use ingredients::{PickerFilter, PickerState};
use inventory::InventoryView;
use models::{Category, IngredientKey, Personality, SavedRecipe, TranscriptEntry};
use personality::{PersonalityCard, PersonalitySelection};
use recipe::RecipeView;
use state::Brewer;
use styles::StyleSuggestions;
use user_manager::ProfileListing;

use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tauri::{command, AppHandle, Emitter, Manager, State};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

// ============ Event bridge ============

/// Forwards domain events to every webview
struct WebviewSink(AppHandle);

impl EventSink for WebviewSink {
    fn emit(&self, event: &BrewerEvent) {
        if let Err(e) = self.0.emit(event.name(), event.payload()) {
            warn!("[events] Failed to emit {}: {}", event.name(), e);
        }
    }
}

/// Precondition failures get a modal prompt on top of the returned error
fn surface<T>(app: &AppHandle, result: AppResult<T>) -> AppResult<T> {
    if let Err(e) = &result {
        if e.is_precondition() {
            warn!("[dialog] {}", e);
            app.dialog()
                .message(e.to_string())
                .title("AIBrewer")
                .kind(MessageDialogKind::Warning)
                .show(|_| {});
        }
    }
    result
}

// ============ Startup ============

#[derive(Serialize)]
pub struct InitStatus {
    pub ready: bool,
    pub authenticated: bool,
    pub backend_url: String,
    pub profile: Option<ProfileListing>,
    pub personality: PersonalitySelection,
    pub transcript: Vec<TranscriptEntry>,
}

#[command]
async fn init_app(brewer: State<'_, Brewer>) -> Result<InitStatus, AppError> {
    if let Err(e) = brewer.load_personalities().await {
        warn!("[startup] Personalities unavailable: {}", e);
    }
    Ok(InitStatus {
        ready: true,
        authenticated: brewer.is_authenticated(),
        backend_url: brewer.config().base_url,
        profile: brewer.current_profile(),
        personality: brewer.personality(),
        transcript: brewer.chat_transcript(),
    })
}

// ============ Config Commands ============

#[command]
fn get_config(brewer: State<'_, Brewer>) -> AppConfig {
    brewer.config()
}

#[command]
fn save_config(brewer: State<'_, Brewer>, config: AppConfig) -> Result<AppConfig, AppError> {
    brewer.save_config(config)
}

// ============ Profile Commands ============

#[command]
fn list_profiles(brewer: State<'_, Brewer>) -> Result<Vec<ProfileListing>, AppError> {
    brewer.list_profiles()
}

#[command]
fn save_profile(
    app: AppHandle,
    brewer: State<'_, Brewer>,
    username: String,
    api_id: String,
    api_key: String,
) -> Result<ProfileListing, AppError> {
    surface(&app, brewer.save_profile(&username, &api_id, &api_key))
}

#[command]
fn select_profile(
    app: AppHandle,
    brewer: State<'_, Brewer>,
    username: String,
) -> Result<ProfileListing, AppError> {
    surface(&app, brewer.select_profile(&username))
}

#[command]
fn delete_profile(
    brewer: State<'_, Brewer>,
    username: String,
) -> Result<Vec<ProfileListing>, AppError> {
    brewer.delete_profile(&username)
}

#[command]
fn current_profile(brewer: State<'_, Brewer>) -> Option<ProfileListing> {
    brewer.current_profile()
}

// ============ Personality Commands ============

#[command]
async fn load_personalities(brewer: State<'_, Brewer>) -> Result<Vec<PersonalityCard>, AppError> {
    brewer.load_personalities().await
}

#[command]
fn select_personality(
    brewer: State<'_, Brewer>,
    id: String,
) -> Result<Option<Personality>, AppError> {
    brewer.select_personality(&id)
}

#[command]
fn get_personality(brewer: State<'_, Brewer>) -> PersonalitySelection {
    brewer.personality()
}

// ============ Inventory & Picker Commands ============

#[command]
async fn fetch_inventory(
    app: AppHandle,
    brewer: State<'_, Brewer>,
) -> Result<InventoryView, AppError> {
    surface(&app, brewer.fetch_inventory().await)
}

#[command]
fn get_inventory_view(brewer: State<'_, Brewer>) -> InventoryView {
    brewer.inventory_view()
}

#[command]
fn picker_state(brewer: State<'_, Brewer>) -> PickerState {
    brewer.picker_state()
}

#[command]
fn toggle_ingredient(brewer: State<'_, Brewer>, key: IngredientKey) -> PickerState {
    brewer.toggle_ingredient(&key)
}

#[command]
fn select_all_ingredients(brewer: State<'_, Brewer>, category: Category) -> PickerState {
    brewer.select_all_ingredients(category)
}

#[command]
fn clear_ingredients(brewer: State<'_, Brewer>, category: Option<Category>) -> PickerState {
    brewer.clear_ingredients(category)
}

#[command]
fn search_ingredients(brewer: State<'_, Brewer>, term: String) -> PickerState {
    brewer.search_ingredients(&term)
}

#[command]
fn select_picker_tab(brewer: State<'_, Brewer>, category: Category) -> PickerState {
    brewer.select_picker_tab(category)
}

#[command]
fn filter_ingredients(brewer: State<'_, Brewer>, filter: Option<PickerFilter>) -> PickerState {
    brewer.filter_ingredients(filter)
}

#[command]
async fn confirm_selection(
    app: AppHandle,
    brewer: State<'_, Brewer>,
) -> Result<StyleSuggestions, AppError> {
    surface(&app, brewer.confirm_selection().await)
}

#[command]
fn get_style_suggestions(brewer: State<'_, Brewer>) -> StyleSuggestions {
    brewer.style_suggestions()
}

// ============ Recipe Commands ============

#[command]
async fn generate_draft(
    app: AppHandle,
    brewer: State<'_, Brewer>,
    style: String,
) -> Result<RecipeView, AppError> {
    surface(&app, brewer.generate_draft(&style).await)
}

#[command]
async fn retry_draft(app: AppHandle, brewer: State<'_, Brewer>) -> Result<RecipeView, AppError> {
    surface(&app, brewer.retry_draft().await)
}

#[command]
fn get_recipe_view(brewer: State<'_, Brewer>) -> Option<RecipeView> {
    brewer.recipe_view()
}

#[command]
fn get_recipe_draft(brewer: State<'_, Brewer>) -> Option<Value> {
    brewer.current_draft().map(|draft| draft.0)
}

#[command]
async fn generate_xml(app: AppHandle, brewer: State<'_, Brewer>) -> Result<String, AppError> {
    let path = surface(&app, brewer.generate_xml().await)?;
    Ok(path.to_string_lossy().to_string())
}

#[command]
async fn update_recipe_from_chat(
    app: AppHandle,
    brewer: State<'_, Brewer>,
) -> Result<Option<RecipeView>, AppError> {
    surface(&app, brewer.update_recipe_from_chat().await)
}

// ============ Chat Commands ============

#[command]
async fn send_chat_message(
    brewer: State<'_, Brewer>,
    message: String,
) -> Result<Vec<TranscriptEntry>, AppError> {
    brewer.send_chat_message(&message).await
}

#[command]
fn get_chat_transcript(brewer: State<'_, Brewer>) -> Vec<TranscriptEntry> {
    brewer.chat_transcript()
}

#[command]
fn clear_chat(brewer: State<'_, Brewer>) -> Vec<TranscriptEntry> {
    brewer.clear_chat()
}

// ============ Style Browsing Commands ============

#[command]
async fn style_categories(brewer: State<'_, Brewer>) -> Result<Vec<String>, AppError> {
    brewer.style_categories().await
}

#[command]
async fn filter_styles(
    brewer: State<'_, Brewer>,
    filter: StyleFilter,
) -> Result<Vec<Value>, AppError> {
    brewer.filter_styles(&filter).await
}

#[command]
async fn list_recipes(brewer: State<'_, Brewer>) -> Result<Vec<SavedRecipe>, AppError> {
    brewer.list_recipes().await
}

#[command]
async fn backend_status(brewer: State<'_, Brewer>) -> Result<Value, AppError> {
    brewer.backend_status().await
}

// ============ Debug Commands ============

#[command]
fn log_from_frontend(level: String, message: String) {
    match level.as_str() {
        "error" => error!("[Frontend] {}", message),
        "warn" => warn!("[Frontend] {}", message),
        "debug" => log::debug!("[Frontend] {}", message),
        _ => info!("[Frontend] {}", message),
    }
}

fn main() {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load app config, using defaults: {}", e);
        AppConfig::default()
    });
    let level = if config.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    tauri::Builder::default()
        .setup(move |app| {
            info!("=== AIBrewer Desktop Starting ===");
            if let Ok(store_path) = paths::get_store_path() {
                info!("[startup] Store: {:?}", store_path);
            }
            info!(
                "[startup] Backend: {}, equipment profile: {}",
                config.base_url, config.equipment_profile
            );

            let store = Arc::new(KvStore::open_default().map_err(|e| {
                error!("[startup] Failed to open store: {}", e);
                e.to_string()
            })?);
            let sink = Arc::new(WebviewSink(app.handle().clone()));
            let brewer = Brewer::new(
                config.clone(),
                paths::get_config_path().ok(),
                store,
                sink,
            )
            .map_err(|e| e.to_string())?;
            app.manage(brewer);

            Ok(())
        })
        .plugin(tauri_plugin_dialog::init())
        .plugin(
            tauri_plugin_log::Builder::new()
                .clear_targets()
                .target(tauri_plugin_log::Target::new(
                    tauri_plugin_log::TargetKind::Stdout,
                ))
                .target(tauri_plugin_log::Target::new(
                    tauri_plugin_log::TargetKind::LogDir {
                        file_name: Some("aibrewer".into()),
                    },
                ))
                .level(level)
                .build(),
        )
        .invoke_handler(tauri::generate_handler![
            init_app,
            get_config,
            save_config,
            list_profiles,
            save_profile,
            select_profile,
            delete_profile,
            current_profile,
            load_personalities,
            select_personality,
            get_personality,
            fetch_inventory,
            get_inventory_view,
            picker_state,
            toggle_ingredient,
            select_all_ingredients,
            clear_ingredients,
            search_ingredients,
            select_picker_tab,
            filter_ingredients,
            confirm_selection,
            get_style_suggestions,
            generate_draft,
            retry_draft,
            get_recipe_view,
            get_recipe_draft,
            generate_xml,
            update_recipe_from_chat,
            send_chat_message,
            get_chat_transcript,
            clear_chat,
            style_categories,
            filter_styles,
            list_recipes,
            backend_status,
            log_from_frontend,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
