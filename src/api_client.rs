//! HTTP client for the AIBrewer backend

use crate::error::{AppError, AppResult};
use crate::models::{Credentials, PersonalityPresets, RecipeDraft, SavedRecipe};
use log::{debug, error};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::RwLock;

/// Prefix of the recipe workflow blueprint
pub const WORKFLOW_PREFIX: &str = "function_a_v2";

/// Decoded response, chosen purely by content type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(Value),
    Blob {
        content_type: String,
        bytes: Vec<u8>,
    },
    Raw {
        status: u16,
        content_type: Option<String>,
        body: String,
    },
}

impl ApiResponse {
    pub fn into_json(self) -> AppResult<Value> {
        match self {
            ApiResponse::Json(value) => Ok(value),
            ApiResponse::Blob { content_type, .. } => Err(AppError::Parse(format!(
                "Expected JSON, got {}",
                content_type
            ))),
            ApiResponse::Raw { content_type, .. } => Err(AppError::Parse(format!(
                "Expected JSON, got {}",
                content_type.unwrap_or_else(|| "no content type".to_string())
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleSuggestionResponse {
    #[serde(default)]
    pub styles: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftResponse {
    pub draft: RecipeDraft,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscussResponse {
    #[serde(default)]
    pub response: String,
}

/// Optional bounds for `styles/filter`; only set bounds are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleFilter {
    pub category: Option<String>,
    pub abv_min: Option<f64>,
    pub abv_max: Option<f64>,
    pub ibu_min: Option<f64>,
    pub ibu_max: Option<f64>,
    pub srm_min: Option<f64>,
    pub srm_max: Option<f64>,
    pub og_min: Option<f64>,
    pub og_max: Option<f64>,
    pub fg_min: Option<f64>,
    pub fg_max: Option<f64>,
}

impl StyleFilter {
    pub fn to_query(&self) -> String {
        let mut pairs: Vec<String> = Vec::new();
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            pairs.push(format!("category={}", urlencoding::encode(category.trim())));
        }
        let bounds = [
            ("abv_min", self.abv_min),
            ("abv_max", self.abv_max),
            ("ibu_min", self.ibu_min),
            ("ibu_max", self.ibu_max),
            ("srm_min", self.srm_min),
            ("srm_max", self.srm_max),
            ("og_min", self.og_min),
            ("og_max", self.og_max),
            ("fg_min", self.fg_min),
            ("fg_max", self.fg_max),
        ];
        for (key, value) in bounds {
            if let Some(value) = value {
                pairs.push(format!("{}={}", key, value));
            }
        }
        pairs.join("&")
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    personality: RwLock<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, personality: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: crate::config::normalize_base_url(base_url),
            personality: RwLock::new(personality.to_string()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sets the personality id attached to every outgoing object body
    pub fn set_personality(&self, id: &str) {
        if let Ok(mut current) = self.personality.write() {
            *current = id.to_string();
        }
    }

    pub fn personality(&self) -> String {
        self.personality
            .read()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn workflow_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            WORKFLOW_PREFIX,
            endpoint.trim_start_matches('/')
        )
    }

    pub fn root_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Issues a single request; no retry, no timeout
    pub async fn request(
        &self,
        url: &str,
        method: Method,
        body: Option<Value>,
    ) -> AppResult<ApiResponse> {
        let mut builder = self
            .http
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(mut body) = body {
            if let Value::Object(map) = &mut body {
                map.insert("personality".to_string(), Value::String(self.personality()));
            }
            builder = builder.json(&body);
        }

        debug!("[api] {} {}", method, url);

        let response = builder.send().await.map_err(|e| {
            error!("[api] {} {} failed: {}", method, url, e);
            AppError::from(e)
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        debug!(
            "[api] {} {} -> {} ({})",
            method,
            url,
            status.as_u16(),
            content_type.as_deref().unwrap_or("no content type")
        );

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(status.as_u16(), &text);
            error!("[api] {} {} returned {}: {}", method, url, status.as_u16(), message);
            return Err(AppError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let kind = content_type.as_deref().unwrap_or_default();
        if kind.contains("application/json") {
            let value: Value = response
                .json()
                .await
                .map_err(|e| AppError::Parse(e.to_string()))?;
            Ok(ApiResponse::Json(value))
        } else if kind.contains("application/xml") || kind.contains("text/xml") {
            let bytes = response.bytes().await?;
            Ok(ApiResponse::Blob {
                content_type: kind.to_string(),
                bytes: bytes.to_vec(),
            })
        } else {
            let body = response.text().await?;
            Ok(ApiResponse::Raw {
                status: status.as_u16(),
                content_type,
                body,
            })
        }
    }

    async fn workflow_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> AppResult<T> {
        let url = self.workflow_url(endpoint);
        let value = self.request(&url, Method::POST, Some(body)).await?.into_json()?;
        serde_json::from_value(value).map_err(|e| AppError::Parse(format!("{}: {}", endpoint, e)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        let value = self.request(url, Method::GET, None).await?.into_json()?;
        serde_json::from_value(value).map_err(|e| AppError::Parse(e.to_string()))
    }

    pub async fn get_personalities(&self) -> AppResult<PersonalityPresets> {
        self.get_json(&self.workflow_url("personalities")).await
    }

    /// Returns the inventory payload untouched so it can be echoed back verbatim
    pub async fn get_inventory(&self, credentials: &Credentials) -> AppResult<Value> {
        let inventory: Value = self
            .workflow_json("get-inventory", serde_json::to_value(credentials)?)
            .await?;
        if !inventory.is_object() {
            return Err(AppError::Parse(
                "get-inventory: expected an object keyed by category".to_string(),
            ));
        }
        Ok(inventory)
    }

    pub async fn suggest_styles(&self, body: Value) -> AppResult<StyleSuggestionResponse> {
        self.workflow_json("suggest-styles", body).await
    }

    pub async fn generate_draft(&self, body: Value) -> AppResult<DraftResponse> {
        self.workflow_json("generate-draft", body).await
    }

    /// Returns the BeerXML document bytes
    pub async fn generate_xml(&self, body: Value) -> AppResult<Vec<u8>> {
        let url = self.workflow_url("generate-xml");
        match self.request(&url, Method::POST, Some(body)).await? {
            ApiResponse::Blob { bytes, .. } => Ok(bytes),
            // Some backend versions wrap the document as {"beerxml": "..."}
            ApiResponse::Json(value) => value
                .get("beerxml")
                .and_then(Value::as_str)
                .map(|xml| xml.as_bytes().to_vec())
                .ok_or_else(|| AppError::Parse("generate-xml returned no BeerXML".to_string())),
            ApiResponse::Raw { body, .. } => Ok(body.into_bytes()),
        }
    }

    pub async fn discuss(&self, body: Value) -> AppResult<DiscussResponse> {
        self.workflow_json("discuss", body).await
    }

    pub async fn style_categories(&self) -> AppResult<Vec<String>> {
        let mut categories: Vec<String> = self.get_json(&self.root_url("styles/categories")).await?;
        categories.retain(|c| !c.trim().is_empty());
        categories.sort();
        Ok(categories)
    }

    pub async fn filter_styles(&self, filter: &StyleFilter) -> AppResult<Vec<Value>> {
        let query = filter.to_query();
        let url = if query.is_empty() {
            self.root_url("styles/filter")
        } else {
            format!("{}?{}", self.root_url("styles/filter"), query)
        };
        self.get_json(&url).await
    }

    pub async fn list_recipes(&self) -> AppResult<Vec<SavedRecipe>> {
        self.get_json(&self.root_url("recipes")).await
    }

    pub async fn status(&self) -> AppResult<Value> {
        match self
            .request(&self.root_url("status"), Method::GET, None)
            .await?
        {
            ApiResponse::Json(value) => Ok(value),
            ApiResponse::Raw { status, body, .. } => Ok(json!({ "status": status, "body": body })),
            ApiResponse::Blob { content_type, .. } => Ok(json!({ "content_type": content_type })),
        }
    }
}

/// Message for a failed response: the JSON `error` field, else a generic status message
fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .get("error")
            .and_then(Value::as_str)
            .filter(|msg| !msg.is_empty())
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| format!("API Error: {}", status)),
        Err(_) => format!("HTTP error {}", status),
    }
}
