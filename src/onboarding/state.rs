//! Wizard steps and position — the fixed step table and where the user is
//! in it.

use serde::Serialize;

use super::model::{FieldName, FieldValues};
use crate::error::ConfigError;

/// The steps of the onboarding wizard.
///
/// Default order: Welcome → Account → Personal → About → Interests → Review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Welcome,
    Account,
    Personal,
    About,
    Interests,
    Review,
}

impl WizardStep {
    /// Fields that must validate before the user may leave this step.
    pub fn required_fields(&self) -> &'static [FieldName] {
        match self {
            Self::Welcome | Self::Review => &[],
            Self::Account => &[FieldName::Username],
            Self::Personal => &[
                FieldName::FirstName,
                FieldName::LastName,
                FieldName::BirthDate,
            ],
            Self::About => &[FieldName::Bio, FieldName::Location],
            Self::Interests => &[FieldName::Interests],
        }
    }

    /// Whether this step submits instead of advancing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Review)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::Account => "Account",
            Self::Personal => "Personal details",
            Self::About => "About you",
            Self::Interests => "Interests",
            Self::Review => "Review",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Welcome => "Set up your profile to start tracking anime, manga, and comics.",
            Self::Account => "Pick the username other readers will see.",
            Self::Personal => "Tell us a little about yourself. Everything here is optional.",
            Self::About => "Add a short bio and where you're watching from.",
            Self::Interests => "Choose the genres you want recommendations for.",
            Self::Review => "Check your answers and finish onboarding.",
        }
    }

    /// Fields shown on this step. The review step shows everything.
    fn displayed_fields(&self) -> &'static [FieldName] {
        match self {
            Self::Review => &FieldName::ALL,
            other => other.required_fields(),
        }
    }

    /// Build the view model the page renders for this step.
    pub fn render(&self, values: &FieldValues) -> StepView {
        StepView {
            step: *self,
            title: self.label(),
            description: self.description(),
            fields: self
                .displayed_fields()
                .iter()
                .map(|&field| FieldView {
                    field,
                    label: field.label(),
                    value: values.provided(field).map(|v| v.display()),
                })
                .collect(),
            terminal: self.is_terminal(),
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::Account => "account",
            Self::Personal => "personal",
            Self::About => "about",
            Self::Interests => "interests",
            Self::Review => "review",
        };
        write!(f, "{s}")
    }
}

/// One field entry of a rendered step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldView {
    pub field: FieldName,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// View model for the active step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step: WizardStep,
    pub title: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldView>,
    pub terminal: bool,
}

/// Static description of a step, as listed by the step table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    pub id: usize,
    pub name: &'static str,
    pub required_fields: &'static [FieldName],
}

/// Ordered, immutable list of wizard steps.
#[derive(Debug, Clone)]
pub struct StepTable {
    steps: Vec<WizardStep>,
}

impl StepTable {
    /// Build a table. It must be non-empty, open on a step with no required
    /// fields, and end on a terminal step.
    pub fn new(steps: Vec<WizardStep>) -> Result<Self, ConfigError> {
        if let Some(first) = steps.first().filter(|s| !s.required_fields().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "steps".into(),
                message: format!("first step must not require fields, got {first}"),
            });
        }
        match steps.last() {
            None => Err(ConfigError::InvalidValue {
                key: "steps".into(),
                message: "wizard needs at least one step".into(),
            }),
            Some(last) if !last.is_terminal() => Err(ConfigError::InvalidValue {
                key: "steps".into(),
                message: format!("last step must be terminal, got {last}"),
            }),
            Some(_) => Ok(Self { steps }),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<WizardStep> {
        self.steps.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = WizardStep> + '_ {
        self.steps.iter().copied()
    }

    pub fn definitions(&self) -> Vec<StepDefinition> {
        self.steps
            .iter()
            .enumerate()
            .map(|(id, step)| StepDefinition {
                id,
                name: step.label(),
                required_fields: step.required_fields(),
            })
            .collect()
    }
}

impl Default for StepTable {
    fn default() -> Self {
        Self {
            steps: vec![
                WizardStep::Welcome,
                WizardStep::Account,
                WizardStep::Personal,
                WizardStep::About,
                WizardStep::Interests,
                WizardStep::Review,
            ],
        }
    }
}

/// Current step index. Invariant: `current < len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WizardPosition {
    current: usize,
    len: usize,
}

impl WizardPosition {
    /// Start at step 0 of a table with `len` steps (`len >= 1`).
    pub fn start(len: usize) -> Self {
        debug_assert!(len > 0, "wizard position over an empty table");
        Self { current: 0, len }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.len
    }

    /// Move forward one step, capped at the last step.
    pub fn advance(&mut self) -> usize {
        if !self.is_last() {
            self.current += 1;
        }
        self.current
    }

    /// Move back one step, stopping at step 0.
    pub fn retreat(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::FieldValue;

    #[test]
    fn default_table_shape() {
        let table = StepTable::default();
        assert_eq!(table.len(), 6);
        assert_eq!(table.get(0), Some(WizardStep::Welcome));
        assert_eq!(table.get(5), Some(WizardStep::Review));
        assert!(table.get(6).is_none());

        let defs = table.definitions();
        assert!(defs[0].required_fields.is_empty());
        assert_eq!(defs[1].required_fields, &[FieldName::Username]);
        assert!(defs[5].required_fields.is_empty());
        assert_eq!(defs[3].id, 3);
    }

    #[test]
    fn only_review_is_terminal() {
        let table = StepTable::default();
        let terminal: Vec<_> = table.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![WizardStep::Review]);
    }

    #[test]
    fn table_rejects_bad_shapes() {
        assert!(StepTable::new(vec![]).is_err());
        assert!(StepTable::new(vec![WizardStep::Welcome, WizardStep::Account]).is_err());
        assert!(StepTable::new(vec![WizardStep::Account, WizardStep::Review]).is_err());
        assert!(StepTable::new(vec![WizardStep::Welcome, WizardStep::Review]).is_ok());
        assert!(StepTable::new(vec![WizardStep::Review]).is_ok());
    }

    #[test]
    fn position_caps_at_both_ends() {
        let mut pos = WizardPosition::start(3);
        assert_eq!(pos.retreat(), 0);
        assert_eq!(pos.advance(), 1);
        assert_eq!(pos.advance(), 2);
        assert!(pos.is_last());
        assert_eq!(pos.advance(), 2);
        assert_eq!(pos.retreat(), 1);
    }

    #[test]
    fn single_step_position_is_first_and_last() {
        let pos = WizardPosition::start(1);
        assert!(pos.is_first());
        assert!(pos.is_last());
    }

    #[test]
    fn render_review_shows_provided_values() {
        let values = FieldValues::new()
            .with(FieldName::Username, FieldValue::text("otaku"))
            .with(FieldName::BirthDate, FieldValue::parse_date("1999-12-31").unwrap())
            .with(
                FieldName::Interests,
                FieldValue::List(vec!["mecha".into(), "isekai".into()]),
            );

        let view = WizardStep::Review.render(&values);
        assert!(view.terminal);
        assert_eq!(view.fields.len(), FieldName::ALL.len());

        let value_of = |field| {
            view.fields
                .iter()
                .find(|f| f.field == field)
                .and_then(|f| f.value.clone())
        };
        assert_eq!(value_of(FieldName::Username).as_deref(), Some("otaku"));
        assert_eq!(value_of(FieldName::BirthDate).as_deref(), Some("1999-12-31"));
        assert_eq!(value_of(FieldName::Interests).as_deref(), Some("mecha, isekai"));
        assert!(value_of(FieldName::Bio).is_none());
    }

    #[test]
    fn render_step_lists_its_fields() {
        let view = WizardStep::Account.render(&FieldValues::new());
        assert_eq!(view.title, "Account");
        assert_eq!(view.fields.len(), 1);
        assert_eq!(view.fields[0].field, FieldName::Username);
        assert!(!view.terminal);
    }
}
