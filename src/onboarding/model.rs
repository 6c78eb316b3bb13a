//! Onboarding data models: fields, values, notifications, and the page-side
//! collaborators (session, navigator).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Calendar-date format used on the wire and in date inputs.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A named piece of user input in the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Username,
    FirstName,
    LastName,
    Bio,
    Location,
    BirthDate,
    Interests,
}

impl FieldName {
    pub const ALL: [FieldName; 7] = [
        Self::Username,
        Self::FirstName,
        Self::LastName,
        Self::Bio,
        Self::Location,
        Self::BirthDate,
        Self::Interests,
    ];

    /// Payload key for this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Bio => "bio",
            Self::Location => "location",
            Self::BirthDate => "birth_date",
            Self::Interests => "interests",
        }
    }

    /// Human-readable label, used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Username => "Username",
            Self::FirstName => "First name",
            Self::LastName => "Last name",
            Self::Bio => "Bio",
            Self::Location => "Location",
            Self::BirthDate => "Birth date",
            Self::Interests => "Interests",
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current value of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    List(Vec<String>),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Parse a `YYYY-MM-DD` date input.
    pub fn parse_date(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .ok()
            .map(Self::Date)
    }

    /// Whether this value counts as "not provided".
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Date(_) => false,
            Self::List(items) => items.is_empty(),
        }
    }

    /// Text shown back to the user on the review step.
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Date(d) => d.format(DATE_FORMAT).to_string(),
            Self::List(items) => items.join(", "),
        }
    }
}

/// Mapping from field name to its current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues(BTreeMap<FieldName, FieldValue>);

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, field: FieldName, value: FieldValue) {
        self.0.insert(field, value);
    }

    pub fn get(&self, field: FieldName) -> Option<&FieldValue> {
        self.0.get(&field)
    }

    /// The value, unless absent or blank.
    pub fn provided(&self, field: FieldName) -> Option<&FieldValue> {
        self.get(field).filter(|v| !v.is_blank())
    }

    pub fn text(&self, field: FieldName) -> Option<&str> {
        match self.provided(field)? {
            FieldValue::Text(s) => Some(s.trim()),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &FieldValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    /// Builder-style setter, handy for pre-populated wizards.
    pub fn with(mut self, field: FieldName, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

/// A toast-style notification for the page to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Authenticated-session snapshot supplied by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: Option<String>,
    /// The provider has not resolved the session yet.
    pub loading: bool,
}

impl Session {
    pub fn loading() -> Self {
        Self {
            user_id: None,
            loading: true,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            loading: false,
        }
    }
}

/// Where the page should navigate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Redirect {
    Login,
    AfterOnboarding,
}

/// Page-owned navigation side effect.
pub trait Navigator: Send + Sync {
    fn redirect(&self, target: Redirect);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_display_matches_serde() {
        for field in FieldName::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(format!("\"{field}\""), json, "mismatch for {field:?}");
        }
    }

    #[test]
    fn blank_values() {
        assert!(FieldValue::text("   ").is_blank());
        assert!(FieldValue::List(vec![]).is_blank());
        assert!(!FieldValue::text("x").is_blank());
        assert!(!FieldValue::parse_date("2001-02-03").unwrap().is_blank());
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(FieldValue::parse_date("03/02/2001").is_none());
        assert!(FieldValue::parse_date("2001-02-30").is_none());
    }

    #[test]
    fn last_write_wins() {
        let mut values = FieldValues::new();
        values.set(FieldName::Username, FieldValue::text("first"));
        values.set(FieldName::Username, FieldValue::text("second"));
        assert_eq!(values.text(FieldName::Username), Some("second"));
    }

    #[test]
    fn provided_skips_blank_text() {
        let values = FieldValues::new().with(FieldName::Bio, FieldValue::text("  "));
        assert!(values.get(FieldName::Bio).is_some());
        assert!(values.provided(FieldName::Bio).is_none());
        assert!(values.text(FieldName::Bio).is_none());
    }
}
