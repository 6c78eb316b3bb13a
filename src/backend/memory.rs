//! In-memory profile backend for the demo server and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::traits::{CompletionResponse, ProfileBackend, ProfileStatus};
use crate::error::BackendError;

#[derive(Debug, Clone, Default)]
struct StoredProfile {
    username: Option<String>,
    onboarding_complete: bool,
    data: Map<String, Value>,
}

/// Profiles keyed by user id. Usernames are unique case-insensitively.
#[derive(Default)]
pub struct InMemoryBackend {
    profiles: RwLock<HashMap<String, StoredProfile>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile row, e.g. one created at sign-up.
    pub async fn insert_profile(
        &self,
        user_id: &str,
        username: Option<&str>,
        onboarding_complete: bool,
    ) {
        let mut profiles = self.profiles.write().await;
        profiles.insert(
            user_id.to_string(),
            StoredProfile {
                username: username.map(String::from),
                onboarding_complete,
                data: Map::new(),
            },
        );
    }

    /// The last onboarding payload stored for a user.
    pub async fn profile_data(&self, user_id: &str) -> Option<Map<String, Value>> {
        let profiles = self.profiles.read().await;
        profiles.get(user_id).map(|p| p.data.clone())
    }

    fn username_taken_by_other(
        profiles: &HashMap<String, StoredProfile>,
        username: &str,
        except_user: Option<&str>,
    ) -> bool {
        profiles.iter().any(|(id, p)| {
            Some(id.as_str()) != except_user
                && p.username
                    .as_deref()
                    .is_some_and(|u| u.eq_ignore_ascii_case(username))
        })
    }
}

#[async_trait]
impl ProfileBackend for InMemoryBackend {
    async fn check_username_available(&self, username: &str) -> Result<bool, BackendError> {
        let profiles = self.profiles.read().await;
        let available = !Self::username_taken_by_other(&profiles, username, None);
        debug!(username, available, "Username availability checked");
        Ok(available)
    }

    async fn get_profile_status(
        &self,
        user_id: &str,
    ) -> Result<Option<ProfileStatus>, BackendError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(user_id).map(|p| ProfileStatus {
            user_id: user_id.to_string(),
            username: p.username.clone(),
            onboarding_complete: p.onboarding_complete,
        }))
    }

    async fn complete_onboarding(
        &self,
        user_id: &str,
        payload: &Map<String, Value>,
    ) -> Result<CompletionResponse, BackendError> {
        let Some(username) = payload.get("username").and_then(Value::as_str) else {
            return Ok(CompletionResponse::failed("username is required"));
        };

        let mut profiles = self.profiles.write().await;
        if Self::username_taken_by_other(&profiles, username, Some(user_id)) {
            return Ok(CompletionResponse::failed("Username already taken"));
        }

        let profile = profiles.entry(user_id.to_string()).or_default();
        profile.username = Some(username.to_string());
        profile.onboarding_complete = true;
        profile.data = payload.clone();

        info!(user_id, username, "Onboarding completed");
        Ok(CompletionResponse::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(username: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("username".into(), Value::String(username.into()));
        map.insert("birth_date".into(), Value::Null);
        map
    }

    #[tokio::test]
    async fn username_availability_ignores_case() {
        let backend = InMemoryBackend::new();
        backend.insert_profile("u1", Some("Naruto_Fan"), true).await;

        assert!(!backend.check_username_available("naruto_fan").await.unwrap());
        assert!(backend.check_username_available("sasuke").await.unwrap());
    }

    #[tokio::test]
    async fn status_for_missing_profile_is_none() {
        let backend = InMemoryBackend::new();
        assert!(backend.get_profile_status("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn complete_marks_profile_and_stores_payload() {
        let backend = InMemoryBackend::new();
        backend.insert_profile("u1", None, false).await;

        let resp = backend.complete_onboarding("u1", &payload("otaku")).await.unwrap();
        assert!(resp.success);

        let status = backend.get_profile_status("u1").await.unwrap().unwrap();
        assert!(status.onboarding_complete);
        assert_eq!(status.username.as_deref(), Some("otaku"));
        let data = backend.profile_data("u1").await.unwrap();
        assert_eq!(data["birth_date"], Value::Null);
    }

    #[tokio::test]
    async fn complete_rejects_username_of_other_user() {
        let backend = InMemoryBackend::new();
        backend.insert_profile("u1", Some("otaku"), true).await;

        let resp = backend.complete_onboarding("u2", &payload("OTAKU")).await.unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error.unwrap().message, "Username already taken");
        assert!(backend.get_profile_status("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resubmitting_own_username_is_allowed() {
        let backend = InMemoryBackend::new();
        backend.insert_profile("u1", Some("otaku"), false).await;

        let resp = backend.complete_onboarding("u1", &payload("otaku")).await.unwrap();
        assert!(resp.success);
    }
}
