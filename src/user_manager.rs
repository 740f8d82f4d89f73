//! Brewfather credential profiles persisted in the key-value store

use crate::db::KvStore;
use crate::error::{AppError, AppResult};
use crate::models::{Credentials, UserProfile};
use log::info;
use serde::Serialize;
use std::sync::Arc;

pub const USERS_KEY: &str = "aibrewer_users";
pub const CURRENT_USER_KEY: &str = "aibrewer_current_user";

/// Profile row for the settings panel; the API key is never sent back to the page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileListing {
    pub username: String,
    pub api_id: String,
    pub active: bool,
}

pub struct UserManager {
    store: Arc<KvStore>,
    current: Option<UserProfile>,
}

impl UserManager {
    pub fn load(store: Arc<KvStore>) -> AppResult<Self> {
        let current: Option<UserProfile> = store.get_json(CURRENT_USER_KEY)?;
        if let Some(profile) = &current {
            info!("[users] Active profile: {}", profile.username);
        }
        Ok(Self { store, current })
    }

    pub fn profiles(&self) -> AppResult<Vec<UserProfile>> {
        Ok(self
            .store
            .get_json::<Vec<UserProfile>>(USERS_KEY)?
            .unwrap_or_default())
    }

    pub fn listings(&self) -> AppResult<Vec<ProfileListing>> {
        let active = self.current.as_ref().map(|p| p.username.as_str());
        Ok(self
            .profiles()?
            .into_iter()
            .map(|p| ProfileListing {
                active: Some(p.username.as_str()) == active,
                username: p.username,
                api_id: p.api_id,
            })
            .collect())
    }

    pub fn current(&self) -> Option<&UserProfile> {
        self.current.as_ref()
    }

    /// True iff a current profile with both tokens is set
    pub fn is_authenticated(&self) -> bool {
        self.current
            .as_ref()
            .map(UserProfile::has_credentials)
            .unwrap_or(false)
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.current
            .as_ref()
            .filter(|p| p.has_credentials())
            .map(UserProfile::credentials)
    }

    pub fn require_credentials(&self) -> AppResult<Credentials> {
        self.credentials().ok_or(AppError::NotAuthenticated)
    }

    /// Saves (or replaces by username) a profile and makes it current
    pub fn save_profile(
        &mut self,
        username: &str,
        api_id: &str,
        api_key: &str,
    ) -> AppResult<UserProfile> {
        let (username, api_id, api_key) = (username.trim(), api_id.trim(), api_key.trim());
        if username.is_empty() || api_id.is_empty() || api_key.is_empty() {
            return Err(AppError::InvalidProfile(
                "username, API id and API key are all required".to_string(),
            ));
        }

        let profile = UserProfile {
            username: username.to_string(),
            api_id: api_id.to_string(),
            api_key: api_key.to_string(),
            saved_at: Some(chrono::Utc::now().to_rfc3339()),
        };

        let mut profiles = self.profiles()?;
        match profiles.iter_mut().find(|p| p.username == profile.username) {
            Some(existing) => *existing = profile.clone(),
            None => profiles.push(profile.clone()),
        }
        self.store.set_json(USERS_KEY, &profiles)?;
        self.set_current(Some(profile.clone()))?;

        info!("[users] Saved profile {}", profile.username);
        Ok(profile)
    }

    pub fn select_profile(&mut self, username: &str) -> AppResult<UserProfile> {
        let profile = self
            .profiles()?
            .into_iter()
            .find(|p| p.username == username)
            .ok_or_else(|| AppError::InvalidProfile(format!("no saved profile named {}", username)))?;
        self.set_current(Some(profile.clone()))?;
        info!("[users] Selected profile {}", profile.username);
        Ok(profile)
    }

    /// Removes a profile; deleting the current one promotes the first remaining profile
    pub fn delete_profile(&mut self, username: &str) -> AppResult<()> {
        let mut profiles = self.profiles()?;
        profiles.retain(|p| p.username != username);
        self.store.set_json(USERS_KEY, &profiles)?;

        let was_current = self
            .current
            .as_ref()
            .map(|p| p.username == username)
            .unwrap_or(false);
        if was_current {
            self.set_current(profiles.into_iter().next())?;
        }

        info!("[users] Deleted profile {}", username);
        Ok(())
    }

    fn set_current(&mut self, profile: Option<UserProfile>) -> AppResult<()> {
        match &profile {
            Some(p) => self.store.set_json(CURRENT_USER_KEY, p)?,
            None => self.store.remove(CURRENT_USER_KEY)?,
        }
        self.current = profile;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (Arc<KvStore>, UserManager) {
        let store = Arc::new(KvStore::open_in_memory().unwrap());
        let manager = UserManager::load(store.clone()).unwrap();
        (store, manager)
    }

    #[test]
    fn starts_unauthenticated() {
        let (_, users) = manager();
        assert!(!users.is_authenticated());
        assert!(matches!(users.require_credentials(), Err(AppError::NotAuthenticated)));
    }

    #[test]
    fn save_makes_profile_current_and_persists() {
        let (store, mut users) = manager();
        users.save_profile(" anna ", "id-1", "key-1").unwrap();

        assert!(users.is_authenticated());
        let creds = users.credentials().unwrap();
        assert_eq!(creds.api_id, "id-1");
        assert_eq!(creds.api_key, "key-1");

        let reloaded = UserManager::load(store).unwrap();
        assert_eq!(reloaded.current().unwrap().username, "anna");
    }

    #[test]
    fn save_rejects_blank_fields() {
        let (_, mut users) = manager();
        assert!(matches!(
            users.save_profile("anna", "", "key"),
            Err(AppError::InvalidProfile(_))
        ));
        assert!(users.profiles().unwrap().is_empty());
    }

    #[test]
    fn saving_existing_username_replaces_in_place() {
        let (_, mut users) = manager();
        users.save_profile("anna", "id-1", "key-1").unwrap();
        users.save_profile("bertil", "id-2", "key-2").unwrap();
        users.save_profile("anna", "id-3", "key-3").unwrap();

        let profiles = users.profiles().unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].username, "anna");
        assert_eq!(profiles[0].api_id, "id-3");
    }

    #[test]
    fn select_switches_current() {
        let (_, mut users) = manager();
        users.save_profile("anna", "id-1", "key-1").unwrap();
        users.save_profile("bertil", "id-2", "key-2").unwrap();

        users.select_profile("anna").unwrap();
        assert_eq!(users.credentials().unwrap().api_id, "id-1");

        let listings = users.listings().unwrap();
        assert!(listings.iter().any(|l| l.username == "anna" && l.active));
        assert!(listings.iter().any(|l| l.username == "bertil" && !l.active));

        assert!(users.select_profile("nobody").is_err());
    }

    #[test]
    fn deleting_current_promotes_first_remaining() {
        let (store, mut users) = manager();
        users.save_profile("anna", "id-1", "key-1").unwrap();
        users.save_profile("bertil", "id-2", "key-2").unwrap();

        users.delete_profile("bertil").unwrap();
        assert_eq!(users.current().unwrap().username, "anna");

        users.delete_profile("anna").unwrap();
        assert!(users.current().is_none());
        assert!(!users.is_authenticated());
        assert_eq!(store.get(CURRENT_USER_KEY).unwrap(), None);
    }

    #[test]
    fn deleting_other_profile_keeps_current() {
        let (_, mut users) = manager();
        users.save_profile("anna", "id-1", "key-1").unwrap();
        users.save_profile("bertil", "id-2", "key-2").unwrap();
        users.delete_profile("anna").unwrap();
        assert_eq!(users.current().unwrap().username, "bertil");
        assert_eq!(users.profiles().unwrap().len(), 1);
    }
}
