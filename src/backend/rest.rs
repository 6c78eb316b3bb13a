//! REST backend — talks to the hosted backend-as-a-service over its row and
//! RPC endpoints.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::traits::{CompletionResponse, ProfileBackend, ProfileStatus};
use crate::config::BackendConfig;
use crate::error::BackendError;

/// A row of the `profiles` table, as selected by `get_profile_status`.
#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    onboarding_completed: bool,
}

/// HTTP client for the hosted profile service.
pub struct RestBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl RestBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{function}", self.config.base_url)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.base_url)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let key = self.config.api_key.expose_secret();
        builder
            .header("apikey", key)
            .header("Authorization", format!("Bearer {key}"))
    }

    /// Send a request and decode a JSON body, mapping non-2xx to `Status`.
    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        builder: RequestBuilder,
    ) -> Result<T, BackendError> {
        let resp = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| BackendError::request(operation, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(operation, status = status.as_u16(), "Backend call failed");
            return Err(BackendError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| BackendError::invalid_response(operation, e))
    }
}

#[async_trait]
impl ProfileBackend for RestBackend {
    async fn check_username_available(&self, username: &str) -> Result<bool, BackendError> {
        let builder = self
            .client
            .post(self.rpc_url("check_username_available"))
            .json(&serde_json::json!({ "p_username": username }));
        self.send_json("check_username_available", builder).await
    }

    async fn get_profile_status(
        &self,
        user_id: &str,
    ) -> Result<Option<ProfileStatus>, BackendError> {
        let id_filter = format!("eq.{user_id}");
        let builder = self.client.get(self.table_url("profiles")).query(&[
            ("id", id_filter.as_str()),
            ("select", "id,username,onboarding_completed"),
        ]);
        let rows: Vec<ProfileRow> = self.send_json("get_profile_status", builder).await?;

        Ok(rows.into_iter().next().map(|row| ProfileStatus {
            user_id: row.id,
            username: row.username,
            onboarding_complete: row.onboarding_completed,
        }))
    }

    async fn complete_onboarding(
        &self,
        user_id: &str,
        payload: &Map<String, Value>,
    ) -> Result<CompletionResponse, BackendError> {
        let builder = self
            .client
            .post(self.rpc_url("complete_onboarding"))
            .json(&serde_json::json!({
                "p_user_id": user_id,
                "p_data": payload,
            }));
        self.send_json("complete_onboarding", builder).await
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn backend() -> RestBackend {
        RestBackend::new(BackendConfig {
            base_url: "https://db.example.co".into(),
            api_key: SecretString::from("anon"),
        })
    }

    #[test]
    fn builds_endpoint_urls() {
        let backend = backend();
        assert_eq!(
            backend.rpc_url("complete_onboarding"),
            "https://db.example.co/rest/v1/rpc/complete_onboarding"
        );
        assert_eq!(
            backend.table_url("profiles"),
            "https://db.example.co/rest/v1/profiles"
        );
    }

    #[test]
    fn profile_row_tolerates_missing_columns() {
        let row: ProfileRow = serde_json::from_str(r#"{"id": "u1"}"#).unwrap();
        assert_eq!(row.id, "u1");
        assert!(row.username.is_none());
        assert!(!row.onboarding_completed);
    }
}
