//! `ProfileBackend` trait — single async interface to the hosted profile
//! service used by onboarding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Onboarding-relevant slice of a user's profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStatus {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub onboarding_complete: bool,
}

/// Error detail returned by the completion RPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionError {
    pub message: String,
}

/// Response of the completion RPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CompletionError>,
}

impl CompletionResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(CompletionError {
                message: message.into(),
            }),
        }
    }
}

/// Backend-agnostic interface to profile storage and onboarding RPCs.
#[async_trait]
pub trait ProfileBackend: Send + Sync {
    /// Whether no other profile uses this username.
    async fn check_username_available(&self, username: &str) -> Result<bool, BackendError>;

    /// Profile status for a user, or `None` if no profile row exists yet.
    async fn get_profile_status(&self, user_id: &str)
    -> Result<Option<ProfileStatus>, BackendError>;

    /// Write the onboarding payload and flag the profile as onboarded.
    ///
    /// Application-level failures (e.g. a username conflict) come back as
    /// `Ok` with `success == false`; `Err` is reserved for transport and
    /// protocol problems.
    async fn complete_onboarding(
        &self,
        user_id: &str,
        payload: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<CompletionResponse, BackendError>;
}
