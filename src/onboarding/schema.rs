//! Field schema and validator.
//!
//! Every field has a declarative list of synchronous rules. The username
//! additionally needs a remote uniqueness check, which only runs once the
//! synchronous rules pass.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use futures::future::join_all;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use super::model::{FieldName, FieldValue, FieldValues};
use crate::backend::ProfileBackend;
use crate::config::OnboardingConfig;

pub const USERNAME_TAKEN: &str = "Username is already taken";
pub const USERNAME_UNVERIFIED: &str = "Could not verify username availability";

/// A single synchronous check.
#[derive(Debug, Clone)]
pub enum Rule {
    MinChars(usize),
    MaxChars(usize),
    /// Text must match the pattern; the message is shown on mismatch.
    Pattern { regex: Regex, message: String },
    /// Only valid when another field is provided too.
    Requires(FieldName),
    NotInFuture,
    NotBefore(NaiveDate),
    MaxItems(usize),
    /// Every list item must come from this set.
    OneOf(Vec<String>),
}

impl Rule {
    /// `Err(message)` if the (non-blank) value breaks this rule.
    fn check(&self, field: FieldName, value: &FieldValue, values: &FieldValues) -> Result<(), String> {
        match (self, value) {
            (Self::MinChars(min), FieldValue::Text(s)) if s.trim().chars().count() < *min => Err(
                format!("{} must be at least {min} characters", field.label()),
            ),
            (Self::MaxChars(max), FieldValue::Text(s)) if s.trim().chars().count() > *max => Err(
                format!("{} must be at most {max} characters", field.label()),
            ),
            (Self::Pattern { regex, message }, FieldValue::Text(s))
                if !regex.is_match(s.trim()) =>
            {
                Err(message.clone())
            }
            (Self::Requires(other), _) if values.provided(*other).is_none() => Err(format!(
                "Enter a {} before a {}",
                other.label().to_lowercase(),
                field.label().to_lowercase()
            )),
            (Self::NotInFuture, FieldValue::Date(d)) if *d > Local::now().date_naive() => {
                Err(format!("{} cannot be in the future", field.label()))
            }
            (Self::NotBefore(min), FieldValue::Date(d)) if d < min => {
                Err(format!("{} must be on or after {min}", field.label()))
            }
            (Self::MaxItems(max), FieldValue::List(items)) if items.len() > *max => {
                Err(format!("Pick at most {max} {}", field.label().to_lowercase()))
            }
            (Self::OneOf(allowed), FieldValue::List(items)) => {
                match items.iter().find(|item| !allowed.contains(item)) {
                    Some(unknown) => Err(format!("Unknown {}: {unknown}", field.label().to_lowercase())),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }
}

/// Declarative rules for one field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field: FieldName,
    pub required: bool,
    pub rules: Vec<Rule>,
    /// Check the value against the backend once `rules` pass.
    pub unique: bool,
}

impl FieldSpec {
    fn optional(field: FieldName, rules: Vec<Rule>) -> Self {
        Self {
            field,
            required: false,
            rules,
            unique: false,
        }
    }

    fn expected_kind(&self) -> ValueKind {
        match self.field {
            FieldName::BirthDate => ValueKind::Date,
            FieldName::Interests => ValueKind::List,
            _ => ValueKind::Text,
        }
    }

    /// Run the synchronous rules. `Err` carries the first failing message.
    fn check_sync<'v>(&self, values: &'v FieldValues) -> Result<Option<&'v str>, String> {
        let Some(value) = values.provided(self.field) else {
            if self.required {
                return Err(format!("{} is required", self.field.label()));
            }
            return Ok(None);
        };

        if !self.expected_kind().matches(value) {
            return Err(format!("{} has an invalid value", self.field.label()));
        }

        for rule in &self.rules {
            rule.check(self.field, value, values)?;
        }

        Ok(match value {
            FieldValue::Text(s) => Some(s.trim()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum ValueKind {
    Text,
    Date,
    List,
}

impl ValueKind {
    fn matches(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (Self::Text, FieldValue::Text(_))
                | (Self::Date, FieldValue::Date(_))
                | (Self::List, FieldValue::List(_))
        )
    }
}

/// Rules for every wizard field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    specs: HashMap<FieldName, FieldSpec>,
}

impl FieldSchema {
    pub fn from_config(config: &OnboardingConfig) -> Self {
        let username = FieldSpec {
            field: FieldName::Username,
            required: true,
            rules: vec![
                Rule::MinChars(config.username_min_len),
                Rule::MaxChars(config.username_max_len),
                Rule::Pattern {
                    regex: Regex::new(r"^[A-Za-z0-9_]+$").expect("static username regex"),
                    message: "Username can only contain letters, numbers, and underscores"
                        .into(),
                },
            ],
            unique: true,
        };

        let earliest_birth_date = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);

        let specs = [
            username,
            FieldSpec::optional(FieldName::FirstName, vec![Rule::MaxChars(config.name_max_len)]),
            FieldSpec::optional(
                FieldName::LastName,
                vec![
                    Rule::MaxChars(config.name_max_len),
                    Rule::Requires(FieldName::FirstName),
                ],
            ),
            FieldSpec::optional(FieldName::Bio, vec![Rule::MaxChars(config.bio_max_len)]),
            FieldSpec::optional(
                FieldName::Location,
                vec![Rule::MaxChars(config.location_max_len)],
            ),
            FieldSpec::optional(
                FieldName::BirthDate,
                vec![Rule::NotInFuture, Rule::NotBefore(earliest_birth_date)],
            ),
            FieldSpec::optional(
                FieldName::Interests,
                vec![
                    Rule::MaxItems(config.max_interests),
                    Rule::OneOf(config.interest_catalogue.clone()),
                ],
            ),
        ];

        Self {
            specs: specs.into_iter().map(|s| (s.field, s)).collect(),
        }
    }

    pub fn field_spec(&self, field: FieldName) -> Option<&FieldSpec> {
        self.specs.get(&field)
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::from_config(&OnboardingConfig::default())
    }
}

/// Validation result for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValidation {
    pub field: FieldName,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FieldValidation {
    fn ok(field: FieldName) -> Self {
        Self {
            field,
            valid: true,
            message: None,
        }
    }

    fn invalid(field: FieldName, message: impl Into<String>) -> Self {
        Self {
            field,
            valid: false,
            message: Some(message.into()),
        }
    }
}

/// One `FieldValidation` per requested field, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub results: Vec<FieldValidation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|r| r.valid)
    }

    /// `(field, message)` for every failing field.
    pub fn errors(&self) -> impl Iterator<Item = (FieldName, &str)> {
        self.results
            .iter()
            .filter(|r| !r.valid)
            .map(|r| (r.field, r.message.as_deref().unwrap_or("Invalid value")))
    }

    pub fn get(&self, field: FieldName) -> Option<&FieldValidation> {
        self.results.iter().find(|r| r.field == field)
    }
}

/// Validates subsets of fields against the schema and the backend.
#[derive(Clone)]
pub struct FieldValidator {
    schema: Arc<FieldSchema>,
    backend: Arc<dyn ProfileBackend>,
}

impl FieldValidator {
    pub fn new(schema: Arc<FieldSchema>, backend: Arc<dyn ProfileBackend>) -> Self {
        Self { schema, backend }
    }

    /// Validate `fields` concurrently. Does not touch `values`.
    pub async fn validate(&self, fields: &[FieldName], values: &FieldValues) -> ValidationReport {
        let results = join_all(fields.iter().map(|&f| self.validate_field(f, values))).await;
        ValidationReport { results }
    }

    /// Validate every field the schema knows about.
    pub async fn validate_all(&self, values: &FieldValues) -> ValidationReport {
        self.validate(&FieldName::ALL, values).await
    }

    async fn validate_field(&self, field: FieldName, values: &FieldValues) -> FieldValidation {
        let Some(field_spec) = self.schema.field_spec(field) else {
            return FieldValidation::ok(field);
        };

        let text = match field_spec.check_sync(values) {
            Ok(text) => text,
            Err(message) => {
                debug!(field = %field, %message, "Field failed synchronous rules");
                return FieldValidation::invalid(field, message);
            }
        };

        match (field_spec.unique, text) {
            (true, Some(candidate)) => self.check_unique(field, candidate).await,
            _ => FieldValidation::ok(field),
        }
    }

    async fn check_unique(&self, field: FieldName, candidate: &str) -> FieldValidation {
        match self.backend.check_username_available(candidate).await {
            Ok(true) => FieldValidation::ok(field),
            Ok(false) => FieldValidation::invalid(field, USERNAME_TAKEN),
            Err(e) => {
                warn!(field = %field, error = %e, "Uniqueness check failed; treating field as invalid");
                FieldValidation::invalid(field, USERNAME_UNVERIFIED)
            }
        }
    }
}
