//! REST endpoints for onboarding: status, username checks, step table, and
//! server-side completion.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::model::{FieldName, FieldValue, FieldValues};
use super::schema::{FieldValidation, FieldValidator};
use super::state::StepTable;
use super::submission::{self, SubmissionOutcome};
use crate::backend::ProfileBackend;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub backend: Arc<dyn ProfileBackend>,
    pub validator: FieldValidator,
    pub steps: Arc<StepTable>,
}

/// Completion request body. Dates are `YYYY-MM-DD` strings.
#[derive(Debug, Default, Deserialize)]
pub struct OnboardingForm {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub birth_date: Option<String>,
    pub interests: Option<Vec<String>>,
}

impl OnboardingForm {
    /// Convert into field values; an unparseable date is reported as a
    /// field error.
    pub fn into_values(self) -> Result<FieldValues, FieldValidation> {
        let mut values = FieldValues::new();
        let texts = [
            (FieldName::Username, self.username),
            (FieldName::FirstName, self.first_name),
            (FieldName::LastName, self.last_name),
            (FieldName::Bio, self.bio),
            (FieldName::Location, self.location),
        ];
        for (field, text) in texts {
            if let Some(text) = text {
                values.set(field, FieldValue::Text(text));
            }
        }

        if let Some(raw) = self.birth_date.filter(|s| !s.trim().is_empty()) {
            let date = FieldValue::parse_date(&raw).ok_or_else(|| FieldValidation {
                field: FieldName::BirthDate,
                valid: false,
                message: Some("Birth date must be a YYYY-MM-DD date".into()),
            })?;
            values.set(FieldName::BirthDate, date);
        }

        if let Some(interests) = self.interests {
            values.set(FieldName::Interests, FieldValue::List(interests));
        }

        Ok(values)
    }
}

#[derive(Debug, Serialize)]
struct UsernameCheck {
    username: String,
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "anihub-onboarding"
    }))
}

/// GET /api/onboarding/steps
async fn list_steps(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.steps.definitions())
}

/// GET /api/onboarding/status/{user_id}
///
/// Returns 404 if the user has no profile row yet.
async fn get_status(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
) -> Response {
    match state.backend.get_profile_status(&user_id).await {
        Ok(Some(status)) => Json(status).into_response(),
        Ok(None) => error_json(StatusCode::NOT_FOUND, "No profile exists yet"),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Status lookup failed");
            error_json(StatusCode::BAD_GATEWAY, "Profile service unavailable")
        }
    }
}

/// GET /api/onboarding/username/{username}
///
/// Runs the full username rules, including the uniqueness check.
async fn check_username(
    State(state): State<OnboardingRouteState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let values = FieldValues::new().with(FieldName::Username, FieldValue::text(username.clone()));
    let report = state
        .validator
        .validate(&[FieldName::Username], &values)
        .await;
    let result = report.results.into_iter().next();

    Json(UsernameCheck {
        username,
        available: result.as_ref().is_some_and(|r| r.valid),
        message: result.and_then(|r| r.message),
    })
}

/// POST /api/onboarding/{user_id}/complete
///
/// Validates every field, then submits. 422 on validation errors, 409 on a
/// username conflict, 502 on any other backend failure.
async fn complete(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
    Json(form): Json<OnboardingForm>,
) -> Response {
    let values = match form.into_values() {
        Ok(values) => values,
        Err(invalid) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "errors": [invalid] })),
            )
                .into_response();
        }
    };

    let report = state.validator.validate_all(&values).await;
    if !report.is_valid() {
        let errors: Vec<&FieldValidation> = report.results.iter().filter(|r| !r.valid).collect();
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "errors": errors })),
        )
            .into_response();
    }

    let outcome = submission::submit(state.backend.as_ref(), &user_id, &values).await;
    let status = match outcome {
        SubmissionOutcome::Success => StatusCode::OK,
        SubmissionOutcome::FieldConflict { .. } => StatusCode::CONFLICT,
        SubmissionOutcome::GenericFailure { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(outcome)).into_response()
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/onboarding/steps", get(list_steps))
        .route("/api/onboarding/status/{user_id}", get(get_status))
        .route("/api/onboarding/username/{username}", get(check_username))
        .route("/api/onboarding/{user_id}/complete", post(complete))
        .with_state(state)
}
