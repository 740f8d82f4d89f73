//! Application state owned by the Tauri runtime and the brewing workflow on top of it

use crate::api_client::{ApiClient, StyleFilter};
use crate::chat::ChatSystem;
use crate::config::{normalize_base_url, AppConfig};
use crate::db::KvStore;
use crate::error::{AppError, AppResult};
use crate::events::{BrewerEvent, EventSink, NoticeLevel};
use crate::ingredients::{IngredientSelector, PickerFilter, PickerState};
use crate::inventory::{InventoryManager, InventoryView};
use crate::models::{
    Category, IngredientKey, Personality, RecipeDraft, SavedRecipe, Sender, TranscriptEntry,
};
use crate::paths::get_default_download_dir;
use crate::personality::{
    selection_notice, PersonalityCard, PersonalityManager, PersonalitySelection,
};
use crate::prompts;
use crate::recipe::{extract_recipe_json, RecipeManager, RecipeView};
use crate::styles::StyleSuggestions;
use crate::user_manager::{ProfileListing, UserManager};
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Everything that lives only for the current run
#[derive(Default)]
pub struct Session {
    pub inventory: InventoryManager,
    pub selector: IngredientSelector,
    /// Last confirmed selection, sent with drafts and exports
    pub selected: Vec<IngredientKey>,
    pub styles: StyleSuggestions,
    pub recipe: RecipeManager,
    pub chat: ChatSystem,
}

pub struct Brewer {
    config: RwLock<AppConfig>,
    config_path: Option<PathBuf>,
    api: RwLock<Arc<ApiClient>>,
    users: Mutex<UserManager>,
    personalities: Mutex<PersonalityManager>,
    session: Mutex<Session>,
    sink: Arc<dyn EventSink>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Brewer {
    /// `config_path` of `None` keeps config changes in memory only
    pub fn new(
        config: AppConfig,
        config_path: Option<PathBuf>,
        store: Arc<KvStore>,
        sink: Arc<dyn EventSink>,
    ) -> AppResult<Self> {
        let users = UserManager::load(store.clone())?;
        let personalities = PersonalityManager::load(store)?;
        let api = ApiClient::new(&config.base_url, personalities.current_id());
        info!("[startup] Backend: {}", api.base_url());

        Ok(Self {
            config: RwLock::new(config),
            config_path,
            api: RwLock::new(Arc::new(api)),
            users: Mutex::new(users),
            personalities: Mutex::new(personalities),
            session: Mutex::new(Session::default()),
            sink,
        })
    }

    fn api(&self) -> Arc<ApiClient> {
        self.api
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn emit(&self, event: BrewerEvent) {
        self.sink.emit(&event);
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(BrewerEvent::notice(level, message));
    }

    fn emit_draft(&self, session: &Session) {
        self.emit(BrewerEvent::DraftStateChanged {
            state: session.recipe.state().clone(),
            recipe: session.recipe.view(),
            xml_button: session.recipe.xml_button().clone(),
        });
    }

    fn emit_chat(&self, session: &Session) {
        self.emit(BrewerEvent::ChatUpdated(session.chat.transcript().to_vec()));
    }

    // ============ Config ============

    pub fn config(&self) -> AppConfig {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn equipment_profile(&self) -> String {
        self.config().equipment_profile
    }

    /// Persists the config and points the client at the (possibly new) backend
    pub fn save_config(&self, mut config: AppConfig) -> AppResult<AppConfig> {
        config.base_url = normalize_base_url(&config.base_url);
        if let Some(path) = &self.config_path {
            config.save_to(path).map_err(AppError::Config)?;
        }

        let personality = self.api().personality();
        *self.api.write().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Arc::new(ApiClient::new(&config.base_url, &personality));
        *self.config.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = config.clone();

        info!("[config] Saved, backend {}", config.base_url);
        Ok(config)
    }

    // ============ Profiles ============

    pub fn list_profiles(&self) -> AppResult<Vec<ProfileListing>> {
        lock(&self.users).listings()
    }

    pub fn current_profile(&self) -> Option<ProfileListing> {
        lock(&self.users).current().map(|p| ProfileListing {
            username: p.username.clone(),
            api_id: p.api_id.clone(),
            active: true,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.users).is_authenticated()
    }

    pub fn save_profile(
        &self,
        username: &str,
        api_id: &str,
        api_key: &str,
    ) -> AppResult<ProfileListing> {
        let profile = lock(&self.users).save_profile(username, api_id, api_key)?;
        self.notify(
            NoticeLevel::Success,
            format!("Profile {} saved", profile.username),
        );
        Ok(ProfileListing {
            username: profile.username,
            api_id: profile.api_id,
            active: true,
        })
    }

    pub fn select_profile(&self, username: &str) -> AppResult<ProfileListing> {
        let profile = lock(&self.users).select_profile(username)?;
        Ok(ProfileListing {
            username: profile.username,
            api_id: profile.api_id,
            active: true,
        })
    }

    pub fn delete_profile(&self, username: &str) -> AppResult<Vec<ProfileListing>> {
        let mut users = lock(&self.users);
        users.delete_profile(username)?;
        users.listings()
    }

    // ============ Personalities ============

    /// Fetches the preset dictionary and returns picker cards
    pub async fn load_personalities(&self) -> AppResult<Vec<PersonalityCard>> {
        let presets = self.api().get_personalities().await.map_err(|e| {
            error!("[personality] Failed to load presets: {}", e);
            e
        })?;
        info!("[personality] Loaded {} presets", presets.len());

        let mut personalities = lock(&self.personalities);
        personalities.set_presets(presets);
        Ok(personalities.cards())
    }

    pub fn select_personality(&self, id: &str) -> AppResult<Option<Personality>> {
        let picked = lock(&self.personalities).select(id)?;
        self.api().set_personality(id.trim());

        self.emit(BrewerEvent::PersonalityChanged {
            id: id.trim().to_string(),
            name: picked.as_ref().map(|p| p.name.clone()),
        });
        match &picked {
            Some(personality) => self.notify(NoticeLevel::Success, selection_notice(personality)),
            None => warn!("[personality] {} is not a known preset", id),
        }
        Ok(picked)
    }

    pub fn personality(&self) -> PersonalitySelection {
        let personalities = lock(&self.personalities);
        PersonalitySelection {
            id: personalities.current_id().to_string(),
            preset: personalities.current().cloned(),
        }
    }

    // ============ Inventory ============

    pub async fn fetch_inventory(&self) -> AppResult<InventoryView> {
        let credentials = lock(&self.users).require_credentials()?;

        let inventory = match self.api().get_inventory(&credentials).await {
            Ok(inventory) => inventory,
            Err(e) => {
                error!("[inventory] Fetch failed: {}", e);
                self.notify(NoticeLevel::Error, format!("Could not load inventory: {}", e));
                return Err(e);
            }
        };

        let mut session = lock(&self.session);
        let typed = session.inventory.replace(inventory);
        if typed.is_empty() {
            warn!("[inventory] Brewfather returned an empty inventory");
        }
        let selector = IngredientSelector::new(typed);
        info!(
            "[inventory] Loaded {} items, {} selectable",
            typed.total_items(),
            selector.entry_count()
        );
        session.selector = selector;
        let view = session.inventory.view();
        self.emit(BrewerEvent::InventoryLoaded {
            view: view.clone(),
            picker: session.selector.state(),
        });
        Ok(view)
    }

    pub fn inventory_view(&self) -> InventoryView {
        lock(&self.session).inventory.view()
    }

    // ============ Ingredient picker ============

    pub fn picker_state(&self) -> PickerState {
        lock(&self.session).selector.state()
    }

    pub fn toggle_ingredient(&self, key: &IngredientKey) -> PickerState {
        let mut session = lock(&self.session);
        let selected = session.selector.toggle(key);
        debug!(
            "[ingredients] {} selected: {} ({} in total)",
            key,
            selected,
            session.selector.selected_count()
        );
        session.selector.state()
    }

    pub fn select_all_ingredients(&self, category: Category) -> PickerState {
        let mut session = lock(&self.session);
        session.selector.select_all(category);
        session.selector.state()
    }

    /// Clears one category, or everything when `category` is `None`
    pub fn clear_ingredients(&self, category: Option<Category>) -> PickerState {
        let mut session = lock(&self.session);
        match category {
            Some(category) => session.selector.clear_all(category),
            None => session.selector.clear(),
        }
        session.selector.state()
    }

    pub fn search_ingredients(&self, term: &str) -> PickerState {
        let mut session = lock(&self.session);
        session.selector.set_search(term);
        session.selector.state()
    }

    pub fn select_picker_tab(&self, category: Category) -> PickerState {
        let mut session = lock(&self.session);
        session.selector.set_tab(category);
        session.selector.state()
    }

    pub fn filter_ingredients(&self, filter: Option<PickerFilter>) -> PickerState {
        let mut session = lock(&self.session);
        session.selector.set_filter(filter);
        session.selector.state()
    }

    /// Publishes the picked ingredients and asks the backend for matching styles
    pub async fn confirm_selection(&self) -> AppResult<StyleSuggestions> {
        let selection = {
            let mut session = lock(&self.session);
            let selection = session.selector.selection();
            if selection.is_empty() {
                return Err(AppError::NoIngredientsSelected);
            }
            session.selected = selection.clone();
            selection
        };
        info!("[ingredients] Confirmed {} ingredients", selection.len());
        self.emit(BrewerEvent::IngredientsSelected(selection.clone()));

        let body = json!({
            "ingredients": selection,
            "profile": self.equipment_profile(),
        });
        let response = self.api().suggest_styles(body).await.map_err(|e| {
            error!("[styles] Suggestion request failed: {}", e);
            self.notify(NoticeLevel::Error, format!("Could not suggest styles: {}", e));
            e
        })?;

        let suggestions = StyleSuggestions::from_text(&response.styles);
        if suggestions.styles.is_empty() {
            warn!("[styles] No numbered styles found in the suggestion text");
        }
        lock(&self.session).styles = suggestions.clone();
        self.emit(BrewerEvent::StylesSuggested(suggestions.clone()));
        Ok(suggestions)
    }

    pub fn style_suggestions(&self) -> StyleSuggestions {
        lock(&self.session).styles.clone()
    }

    // ============ Recipe ============

    /// Requires a confirmed selection and a profile; nothing is sent otherwise
    pub async fn generate_draft(&self, style: &str) -> AppResult<RecipeView> {
        let style = style.trim().to_string();
        let (selected, inventory) = {
            let session = lock(&self.session);
            if session.selected.is_empty() {
                return Err(AppError::NoIngredientsSelected);
            }
            (
                session.selected.clone(),
                session.inventory.raw().cloned(),
            )
        };
        let credentials = lock(&self.users).require_credentials()?;

        {
            let mut session = lock(&self.session);
            session.recipe.begin_draft(&style);
            self.emit_draft(&session);
        }
        info!("[recipe] Generating draft for {}", style);

        let body = json!({
            "style": style,
            "ingredients": selected,
            "profile": self.equipment_profile(),
            "apiId": credentials.api_id,
            "apiKey": credentials.api_key,
            "inventory_data": inventory,
        });
        let result = self
            .api()
            .generate_draft(body)
            .await
            .map(|response| response.draft);

        let mut session = lock(&self.session);
        session.recipe.finish_draft(&result);
        self.emit_draft(&session);
        match result {
            Ok(draft) => {
                info!(
                    "[recipe] Draft ready: {}",
                    draft.name().unwrap_or("(unnamed)")
                );
                Ok(RecipeView::from_draft(&draft))
            }
            Err(e) => {
                error!("[recipe] Draft generation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Re-runs the last requested style after a failure
    pub async fn retry_draft(&self) -> AppResult<RecipeView> {
        let style = lock(&self.session)
            .recipe
            .last_style()
            .map(str::to_string)
            .ok_or(AppError::NoDraft)?;
        self.generate_draft(&style).await
    }

    pub fn recipe_view(&self) -> Option<RecipeView> {
        lock(&self.session).recipe.view()
    }

    pub fn current_draft(&self) -> Option<RecipeDraft> {
        lock(&self.session).recipe.draft().cloned()
    }

    /// Exports the draft as BeerXML into the download directory. The export
    /// button is restored whether or not the export succeeds.
    pub async fn generate_xml(&self) -> AppResult<PathBuf> {
        let credentials = lock(&self.users).require_credentials()?;
        let (draft, selected) = {
            let mut session = lock(&self.session);
            let draft = session.recipe.begin_export()?;
            self.emit_draft(&session);
            (draft, session.selected.clone())
        };

        let body = json!({
            "draft": draft,
            "profile": self.equipment_profile(),
            "apiId": credentials.api_id,
            "apiKey": credentials.api_key,
            "selectedIngredients": selected,
        });
        let outcome = self.export_draft(&draft, body).await;

        {
            let mut session = lock(&self.session);
            session.recipe.finish_export();
            self.emit_draft(&session);
        }

        match &outcome {
            Ok(path) => {
                info!("[recipe] BeerXML written to {:?}", path);
                let file_name = draft.xml_file_name();
                self.emit(BrewerEvent::XmlExported {
                    file_name: file_name.clone(),
                    path: path.to_string_lossy().to_string(),
                });
                self.notify(NoticeLevel::Success, format!("Saved {}", file_name));
            }
            Err(e) => {
                error!("[recipe] BeerXML export failed: {}", e);
                self.notify(NoticeLevel::Error, format!("An error occurred: {}", e));
            }
        }
        outcome
    }

    async fn export_draft(&self, draft: &RecipeDraft, body: Value) -> AppResult<PathBuf> {
        let bytes = self.api().generate_xml(body).await?;
        let dir = match self.config().download_dir {
            Some(dir) => dir,
            None => get_default_download_dir().map_err(AppError::Io)?,
        };
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(draft.xml_file_name());
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Asks the assistant for a revised recipe based on the chat so far.
    /// Returns `None` when the answer held no usable recipe; the draft is then
    /// left as it was and the transcript says why.
    pub async fn update_recipe_from_chat(&self) -> AppResult<Option<RecipeView>> {
        let (draft, messages) = {
            let mut session = lock(&self.session);
            let draft = session.recipe.begin_revision()?;
            self.emit_draft(&session);
            (draft, session.chat.revision_messages())
        };
        info!("[recipe] Requesting revision from chat");

        let body = json!({ "messages": messages, "recipe": draft });
        let result = self.api().discuss(body).await;

        let mut session = lock(&self.session);
        let revised = match result {
            Ok(reply) => match extract_recipe_json(&reply.response) {
                Ok(value) => {
                    session.chat.record_revision(&reply.response);
                    session
                        .chat
                        .notify(Sender::System, prompts::REVISION_APPLIED_NOTICE);
                    Some(RecipeDraft(value))
                }
                Err(e) => {
                    let e = AppError::from(e);
                    warn!("[recipe] Revision abandoned: {}", e);
                    session
                        .chat
                        .notify(Sender::System, &prompts::revision_failed_notice(&e.to_string()));
                    None
                }
            },
            Err(e) => {
                error!("[recipe] Revision request failed: {}", e);
                session
                    .chat
                    .notify(Sender::System, &prompts::revision_failed_notice(&e.to_string()));
                None
            }
        };

        let updated = revised.is_some();
        session.recipe.finish_revision(revised);
        self.emit_draft(&session);
        self.emit_chat(&session);
        Ok(if updated { session.recipe.view() } else { None })
    }

    // ============ Chat ============

    /// Sends one user message with the full history; errors end up in the transcript
    pub async fn send_chat_message(&self, text: &str) -> AppResult<Vec<TranscriptEntry>> {
        let (pending, recipe, inventory) = {
            let mut session = lock(&self.session);
            let recipe = session.recipe.draft().cloned();
            let typed = session.inventory.data().cloned();
            let inventory = session.inventory.raw().cloned();
            let pending =
                match session
                    .chat
                    .begin_message(text, recipe.as_ref(), typed.as_ref())?
                {
                    Some(pending) => pending,
                    None => return Ok(session.chat.transcript().to_vec()),
                };
            debug!("[chat] Sending {} messages", session.chat.history().len());
            self.emit_chat(&session);
            (pending, recipe, inventory)
        };

        let body = json!({
            "messages": pending.messages,
            "recipe": recipe,
            "inventory": inventory,
        });
        let result = self
            .api()
            .discuss(body)
            .await
            .map(|reply| reply.response);
        if let Err(e) = &result {
            error!("[chat] Discuss request failed: {}", e);
        }

        let mut session = lock(&self.session);
        session.chat.complete_message(pending.placeholder_id, &result);
        self.emit_chat(&session);
        Ok(session.chat.transcript().to_vec())
    }

    pub fn chat_transcript(&self) -> Vec<TranscriptEntry> {
        lock(&self.session).chat.transcript().to_vec()
    }

    pub fn clear_chat(&self) -> Vec<TranscriptEntry> {
        let mut session = lock(&self.session);
        session.chat.clear();
        self.emit_chat(&session);
        session.chat.transcript().to_vec()
    }

    // ============ Style browsing ============

    pub async fn style_categories(&self) -> AppResult<Vec<String>> {
        self.api().style_categories().await
    }

    pub async fn filter_styles(&self, filter: &StyleFilter) -> AppResult<Vec<Value>> {
        self.api().filter_styles(filter).await
    }

    pub async fn list_recipes(&self) -> AppResult<Vec<SavedRecipe>> {
        self.api().list_recipes().await
    }

    pub async fn backend_status(&self) -> AppResult<Value> {
        self.api().status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::recording::RecordingSink;
    use crate::models::Role;
    use crate::personality::PERSONALITY_KEY;
    use crate::recipe::{DraftState, XML_BUTTON_LABEL};
    use crate::test_support::spawn_backend;
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        brewer: Brewer,
        sink: Arc<RecordingSink>,
        downloads: tempfile::TempDir,
    }

    fn harness(base_url: &str) -> Harness {
        let downloads = tempfile::tempdir().unwrap();
        let config = AppConfig {
            base_url: base_url.to_string(),
            download_dir: Some(downloads.path().to_path_buf()),
            ..AppConfig::default()
        };
        let store = Arc::new(KvStore::open_in_memory().unwrap());
        let sink = Arc::new(RecordingSink::default());
        let brewer = Brewer::new(config, None, store, sink.clone()).unwrap();
        Harness {
            brewer,
            sink,
            downloads,
        }
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn inventory_body() -> Value {
        json!({
            "fermentables": [
                {"name": "Pilsner", "inventory": 5, "color": 1.6},
                {"name": "Munich", "inventory": 1.2, "color": 9}
            ],
            "hops": [{"name": "Saaz", "inventory": 100, "alpha": 3.5}],
            "yeasts": [{"name": "W-34/70", "inventory": 2}]
        })
    }

    /// Backend that answers every workflow endpoint and counts draft requests
    fn backend(draft_hits: Arc<AtomicUsize>, discuss_reply: &'static str) -> Router {
        backend_with_xml(draft_hits, discuss_reply, true)
    }

    fn backend_with_xml(
        draft_hits: Arc<AtomicUsize>,
        discuss_reply: &'static str,
        xml_ok: bool,
    ) -> Router {
        Router::new()
            .route(
                "/function_a_v2/get-inventory",
                post(|Json(body): Json<Value>| async move {
                    if body["apiId"] == "brewer-id" && body["apiKey"] == "secret" {
                        Json(inventory_body()).into_response()
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad credentials"})))
                            .into_response()
                    }
                }),
            )
            .route(
                "/function_a_v2/suggest-styles",
                post(|Json(body): Json<Value>| async move {
                    let count = body["ingredients"].as_array().map(Vec::len).unwrap_or(0);
                    Json(json!({
                        "styles": format!("For {} ingredients:\n1. German Pilsner\n2. Munich Helles\n", count)
                    }))
                }),
            )
            .route(
                "/function_a_v2/generate-draft",
                post(move |Json(body): Json<Value>| {
                    let hits = draft_hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Json(json!({
                            "draft": {
                                "name": format!("{} Draft", body["style"].as_str().unwrap_or("?")),
                                "og": 1.048,
                                "ibu": 30,
                                "personality": body["personality"],
                                "fermentables": {"Pilsner": [100]},
                                "fermentables_metadata": {},
                                "hops": [],
                                "yeast": {"type": "W-34/70", "amount": 2}
                            }
                        }))
                    }
                }),
            )
            .route(
                "/function_a_v2/discuss",
                post(move || async move { Json(json!({ "response": discuss_reply })) }),
            )
            .route(
                "/function_a_v2/generate-xml",
                post(move || async move {
                    if xml_ok {
                        (
                            [(header::CONTENT_TYPE, "application/xml")],
                            "<RECIPES><RECIPE/></RECIPES>",
                        )
                            .into_response()
                    } else {
                        StatusCode::BAD_GATEWAY.into_response()
                    }
                }),
            )
    }

    async fn ready_brewer(harness: &Harness) {
        harness
            .brewer
            .save_profile("anna", "brewer-id", "secret")
            .unwrap();
        harness.brewer.fetch_inventory().await.unwrap();
        harness
            .brewer
            .toggle_ingredient(&IngredientKey::new(Category::Fermentables, "Pilsner"));
        harness
            .brewer
            .toggle_ingredient(&IngredientKey::new(Category::Hops, "Saaz"));
        harness.brewer.confirm_selection().await.unwrap();
    }

    #[tokio::test]
    async fn empty_selection_sends_no_draft_request() {
        let hits = counter();
        let base = spawn_backend(backend(hits.clone(), "")).await;
        let h = harness(&base);
        h.brewer.save_profile("anna", "brewer-id", "secret").unwrap();
        h.brewer.fetch_inventory().await.unwrap();

        let err = h.brewer.generate_draft("Pilsner").await.unwrap_err();
        assert!(matches!(err, AppError::NoIngredientsSelected));
        assert!(err.is_precondition());
        assert!(matches!(
            h.brewer.confirm_selection().await,
            Err(AppError::NoIngredientsSelected)
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn inventory_requires_profile() {
        let base = spawn_backend(backend(counter(), "")).await;
        let h = harness(&base);
        assert!(matches!(
            h.brewer.fetch_inventory().await,
            Err(AppError::NotAuthenticated)
        ));
        assert_eq!(h.sink.count("inventory-loaded"), 0);
    }

    #[tokio::test]
    async fn selection_flows_into_styles_and_draft() {
        let hits = counter();
        let base = spawn_backend(backend(hits.clone(), "")).await;
        let h = harness(&base);
        ready_brewer(&h).await;

        let picker = h.brewer.picker_state();
        assert_eq!(picker.total_count, 4);
        assert_eq!(picker.selected_count, 2);

        let styles = h.brewer.style_suggestions();
        assert!(styles.text.starts_with("For 2 ingredients"));
        assert_eq!(styles.styles, vec!["German Pilsner", "Munich Helles"]);

        let view = h.brewer.generate_draft(&styles.styles[0]).await.unwrap();
        assert_eq!(view.name, "German Pilsner Draft");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.brewer.current_draft().unwrap().0["personality"],
            "traditionalist"
        );

        let names = h.sink.names();
        assert!(names.contains(&"inventory-loaded"));
        assert!(names.contains(&"ingredients-selected"));
        assert!(names.contains(&"styles-suggested"));
        assert!(names.contains(&"draft-state-changed"));
    }

    #[tokio::test]
    async fn failed_draft_offers_retry() {
        let app = Router::new()
            .route(
                "/function_a_v2/get-inventory",
                post(|| async { Json(inventory_body()) }),
            )
            .route(
                "/function_a_v2/suggest-styles",
                post(|| async { Json(json!({ "styles": "1. Stout" })) }),
            )
            .route(
                "/function_a_v2/generate-draft",
                post(|| async {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "model overloaded" })),
                    )
                }),
            );
        let base = spawn_backend(app).await;
        let h = harness(&base);
        ready_brewer(&h).await;

        let err = h.brewer.generate_draft("Stout").await.unwrap_err();
        assert_eq!(err.to_string(), "API error: model overloaded");
        let last_state = h
            .sink
            .events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                BrewerEvent::DraftStateChanged { state, .. } => Some(state),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            last_state,
            DraftState::Error {
                message: "API error: model overloaded".to_string(),
                retry_style: Some("Stout".to_string()),
            }
        );
        assert!(h.brewer.retry_draft().await.is_err());
    }

    #[tokio::test]
    async fn chat_revision_replaces_draft() {
        let base = spawn_backend(backend(counter(), "Sure:\n```json\n{\"name\":\"X\"}\n```")).await;
        let h = harness(&base);
        ready_brewer(&h).await;
        h.brewer.generate_draft("Pilsner").await.unwrap();

        let view = h.brewer.update_recipe_from_chat().await.unwrap().unwrap();
        assert_eq!(view.name, "X");
        assert_eq!(h.brewer.current_draft().unwrap().0, json!({"name": "X"}));

        let session = lock(&h.brewer.session);
        let tail: Vec<Role> = session.chat.history()[1..].iter().map(|m| m.role).collect();
        assert_eq!(tail, vec![Role::User, Role::Assistant, Role::System]);
    }

    #[tokio::test]
    async fn chat_revision_without_json_keeps_draft() {
        let base = spawn_backend(backend(counter(), "I'd simply add more Saaz late.")).await;
        let h = harness(&base);
        ready_brewer(&h).await;
        h.brewer.generate_draft("Pilsner").await.unwrap();

        let before = h.brewer.current_draft().unwrap().0.to_string();
        let transcript_len = h.brewer.chat_transcript().len();
        let history_len = lock(&h.brewer.session).chat.history().len();

        assert!(h.brewer.update_recipe_from_chat().await.unwrap().is_none());

        assert_eq!(h.brewer.current_draft().unwrap().0.to_string(), before);
        let transcript = h.brewer.chat_transcript();
        assert_eq!(transcript.len(), transcript_len + 1);
        assert_eq!(
            transcript.last().unwrap().text,
            "Could not update the recipe: Malformed AI response: no JSON data found in the AI response"
        );
        assert_eq!(lock(&h.brewer.session).chat.history().len(), history_len);
    }

    #[tokio::test]
    async fn revision_needs_a_draft() {
        let base = spawn_backend(backend(counter(), "")).await;
        let h = harness(&base);
        assert!(matches!(
            h.brewer.update_recipe_from_chat().await,
            Err(AppError::NoDraft)
        ));
    }

    #[tokio::test]
    async fn xml_export_writes_one_file_and_restores_button() {
        let base = spawn_backend(backend(counter(), "")).await;
        let h = harness(&base);
        ready_brewer(&h).await;
        h.brewer.generate_draft("Pilsner").await.unwrap();

        let path = h.brewer.generate_xml().await.unwrap();
        assert_eq!(path.file_name().unwrap(), "Pilsner Draft.xml");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "<RECIPES><RECIPE/></RECIPES>"
        );
        assert_eq!(std::fs::read_dir(h.downloads.path()).unwrap().count(), 1);
        assert_eq!(h.sink.count("xml-exported"), 1);

        let session = lock(&h.brewer.session);
        assert!(session.recipe.xml_button().enabled);
        assert_eq!(session.recipe.xml_button().label, XML_BUTTON_LABEL);
    }

    #[tokio::test]
    async fn failed_xml_export_still_restores_button() {
        let base = spawn_backend(backend_with_xml(counter(), "", false)).await;
        let h = harness(&base);
        ready_brewer(&h).await;
        h.brewer.generate_draft("Pilsner").await.unwrap();

        assert!(h.brewer.generate_xml().await.is_err());
        assert_eq!(std::fs::read_dir(h.downloads.path()).unwrap().count(), 0);
        assert_eq!(h.sink.count("xml-exported"), 0);

        let session = lock(&h.brewer.session);
        assert!(session.recipe.xml_button().enabled);
        assert_eq!(session.recipe.state(), &DraftState::Displayed);
    }

    #[tokio::test]
    async fn chat_message_round_trip() {
        let base = spawn_backend(backend(counter(), "Mash at 65 C.")).await;
        let h = harness(&base);
        ready_brewer(&h).await;

        let transcript = h.brewer.send_chat_message("Mash temperature?").await.unwrap();
        let texts: Vec<&str> = transcript.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![prompts::CHAT_GREETING, "Mash temperature?", "Mash at 65 C."]
        );
        assert!(transcript.iter().all(|e| !e.pending));
        assert!(lock(&h.brewer.session).chat.inventory_context_added());

        let cleared = h.brewer.clear_chat();
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared[0].text, prompts::CHAT_CLEARED_NOTICE);
    }

    #[tokio::test]
    async fn personality_choice_reaches_requests() {
        let app = backend(counter(), "").route(
            "/function_a_v2/personalities",
            get(|| async {
                Json(json!({
                    "traditionalist": {"name": "Harald", "icon": "🏺", "description": "Classic"},
                    "hop_head": {"name": "Helena", "icon": "🌿", "description": "Hops"}
                }))
            }),
        );
        let base = spawn_backend(app).await;
        let h = harness(&base);

        let cards = h.brewer.load_personalities().await.unwrap();
        assert_eq!(cards.len(), 2);

        let picked = h.brewer.select_personality("hop_head").unwrap().unwrap();
        assert_eq!(picked.name, "Helena");
        assert_eq!(h.brewer.personality().id, "hop_head");
        assert!(h.sink.events().contains(&BrewerEvent::notice(
            NoticeLevel::Success,
            "Helena is now helping with your brews!"
        )));

        ready_brewer(&h).await;
        h.brewer.generate_draft("Pilsner").await.unwrap();
        assert_eq!(h.brewer.current_draft().unwrap().0["personality"], "hop_head");
    }

    #[tokio::test]
    async fn saving_config_repoints_client() {
        let base = spawn_backend(
            Router::new().route("/status", get(|| async { Json(json!({"ok": true})) })),
        )
        .await;
        let h = harness("http://127.0.0.1:9");

        let mut config = h.brewer.config();
        config.base_url = format!("{}/", base);
        let saved = h.brewer.save_config(config).unwrap();
        assert_eq!(saved.base_url, base);
        assert_eq!(h.brewer.backend_status().await.unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn draft_request_echoes_inventory_payload() {
        let payload = json!({
            "fermentables": [
                {"name": "Pilsner", "inventory": "5.0", "color": 1.6},
                {"inventory": 3},
                {"name": null, "inventory": 1}
            ],
            "hops": [{"name": "Saaz", "inventory": 100}],
            "miscs": [{"name": "Irish Moss", "inventory": 10}]
        });
        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let served = payload.clone();
        let captured = seen.clone();
        let app = Router::new()
            .route(
                "/function_a_v2/get-inventory",
                post(move || {
                    let served = served.clone();
                    async move { Json(served) }
                }),
            )
            .route(
                "/function_a_v2/suggest-styles",
                post(|| async { Json(json!({ "styles": "1. German Pilsner" })) }),
            )
            .route(
                "/function_a_v2/generate-draft",
                post(move |Json(body): Json<Value>| {
                    let captured = captured.clone();
                    async move {
                        *captured.lock().unwrap() = Some(body);
                        Json(json!({ "draft": { "name": "Pils" } }))
                    }
                }),
            );
        let base = spawn_backend(app).await;
        let h = harness(&base);
        h.brewer.save_profile("anna", "brewer-id", "secret").unwrap();

        let view = h.brewer.fetch_inventory().await.unwrap();
        assert_eq!(view.sections[0].lines.len(), 1);
        assert_eq!(h.brewer.picker_state().total_count, 2);

        h.brewer
            .toggle_ingredient(&IngredientKey::new(Category::Fermentables, "Pilsner"));
        h.brewer.confirm_selection().await.unwrap();
        h.brewer.generate_draft("German Pilsner").await.unwrap();

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["inventory_data"], payload);
    }

    #[tokio::test]
    async fn personality_survives_restart() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let captured = seen.clone();
        let app = Router::new().route(
            "/function_a_v2/discuss",
            post(move |Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    *captured.lock().unwrap() = Some(body);
                    Json(json!({ "response": "Cheers" }))
                }
            }),
        );
        let base = spawn_backend(app).await;
        let config = AppConfig {
            base_url: base,
            ..AppConfig::default()
        };
        let store = Arc::new(KvStore::open_in_memory().unwrap());

        let first = Brewer::new(
            config.clone(),
            None,
            store.clone(),
            Arc::new(RecordingSink::default()),
        )
        .unwrap();
        first.select_personality("hop_head").unwrap();
        drop(first);

        let second =
            Brewer::new(config, None, store.clone(), Arc::new(RecordingSink::default())).unwrap();
        assert_eq!(second.personality().id, "hop_head");
        assert_eq!(store.get(PERSONALITY_KEY).unwrap().as_deref(), Some("hop_head"));

        second.send_chat_message("Which hop for a NEIPA?").await.unwrap();
        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["personality"], "hop_head");
    }

    #[tokio::test]
    async fn failed_inventory_fetch_can_be_retried() {
        let attempts = counter();
        let seen = attempts.clone();
        let app = Router::new().route(
            "/function_a_v2/get-inventory",
            post(move || {
                let seen = seen.clone();
                async move {
                    if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                        (
                            StatusCode::BAD_GATEWAY,
                            Json(json!({ "error": "Brewfather unavailable" })),
                        )
                            .into_response()
                    } else {
                        Json(inventory_body()).into_response()
                    }
                }
            }),
        );
        let base = spawn_backend(app).await;
        let h = harness(&base);
        h.brewer.save_profile("anna", "brewer-id", "secret").unwrap();

        let err = h.brewer.fetch_inventory().await.unwrap_err();
        assert_eq!(err.to_string(), "API error: Brewfather unavailable");
        assert!(!err.is_precondition());
        assert_eq!(h.sink.count("inventory-loaded"), 0);
        assert!(h.brewer.inventory_view().sections.is_empty());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        let view = h.brewer.fetch_inventory().await.unwrap();
        assert_eq!(view.sections.len(), 3);
        assert_eq!(h.sink.count("inventory-loaded"), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
