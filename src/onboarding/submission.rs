//! Submission adapter — turns final field values into the completion
//! payload and interprets the backend's answer.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::model::{DATE_FORMAT, FieldName, FieldValue, FieldValues};
use crate::backend::{CompletionResponse, ProfileBackend};
use crate::error::BackendError;

pub const USERNAME_CONFLICT: &str =
    "This username was taken while you were signing up. Go back to the Account step to choose another.";

/// Result of one submit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Success,
    FieldConflict { field: FieldName, message: String },
    GenericFailure { message: String },
}

/// Calendar-date string sent to the backend. No timezone conversion.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Build the completion payload.
///
/// Absent optional fields are left out, except `birth_date`, which the
/// backend expects as an explicit `null`.
pub fn build_payload(values: &FieldValues) -> Map<String, Value> {
    let mut payload = Map::new();

    for field in FieldName::ALL {
        let value = match values.provided(field) {
            Some(FieldValue::Text(s)) => Value::String(s.trim().to_string()),
            Some(FieldValue::Date(d)) => Value::String(format_date(*d)),
            Some(FieldValue::List(items)) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            None if field == FieldName::BirthDate => Value::Null,
            None => continue,
        };
        payload.insert(field.as_str().to_string(), value);
    }

    payload
}

/// Whether a backend error message reports a username collision.
pub fn is_username_conflict(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already taken")
        || (lower.contains("username") && (lower.contains("duplicate") || lower.contains("unique")))
}

/// Map the backend's answer to an outcome.
pub fn interpret_response(
    result: Result<CompletionResponse, BackendError>,
) -> SubmissionOutcome {
    match result {
        Ok(resp) if resp.success => SubmissionOutcome::Success,
        Ok(resp) => {
            let message = resp
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            if is_username_conflict(&message) {
                SubmissionOutcome::FieldConflict {
                    field: FieldName::Username,
                    message: USERNAME_CONFLICT.to_string(),
                }
            } else {
                SubmissionOutcome::GenericFailure {
                    message: format!("Could not complete onboarding: {message}"),
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "Onboarding completion call failed");
            SubmissionOutcome::GenericFailure {
                message: "Could not complete onboarding. Please try again.".to_string(),
            }
        }
    }
}

/// Package `values` and call the backend once. Never retries.
pub async fn submit(
    backend: &dyn ProfileBackend,
    user_id: &str,
    values: &FieldValues,
) -> SubmissionOutcome {
    let payload = build_payload(values);
    let outcome = interpret_response(backend.complete_onboarding(user_id, &payload).await);
    info!(user_id, outcome = ?outcome, "Onboarding submission finished");
    outcome
}
