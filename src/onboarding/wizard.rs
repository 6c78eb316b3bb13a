//! OnboardingWizard — the step state machine driving the onboarding form.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::model::{FieldName, FieldValue, FieldValues, Navigator, Notification, Redirect};
use super::schema::{FieldSchema, FieldValidator, ValidationReport};
use super::signals::OnboardingSignals;
use super::state::{StepTable, StepView, WizardPosition, WizardStep};
use super::submission::{self, SubmissionOutcome};
use crate::backend::ProfileBackend;
use crate::config::OnboardingConfig;

pub const FIX_FIELDS_MESSAGE: &str = "Please fix the highlighted fields before continuing";
pub const COMPLETED_MESSAGE: &str = "Welcome aboard! Your profile is ready.";

/// Result of a `next()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextOutcome {
    Advanced { from: usize, to: usize },
    /// Validation failed; the wizard stayed on `step`.
    Blocked {
        step: usize,
        errors: Vec<(FieldName, String)>,
    },
}

/// Result of a `submit()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResult {
    NotOnFinalStep,
    AlreadyCompleted,
    /// Validation failed; nothing was sent.
    Invalid { errors: Vec<(FieldName, String)> },
    Attempted(SubmissionOutcome),
}

/// Collaborators the wizard needs from the surrounding page.
#[derive(Clone)]
pub struct WizardDeps {
    pub backend: Arc<dyn ProfileBackend>,
    pub validator: FieldValidator,
    pub signals: Arc<OnboardingSignals>,
    pub navigator: Arc<dyn Navigator>,
}

impl WizardDeps {
    /// Build the validator and signals from configuration.
    pub fn new(
        config: &OnboardingConfig,
        backend: Arc<dyn ProfileBackend>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let schema = Arc::new(FieldSchema::from_config(config));
        Self {
            validator: FieldValidator::new(schema, Arc::clone(&backend)),
            signals: Arc::new(OnboardingSignals::from_config(config)),
            backend,
            navigator,
        }
    }
}

/// One onboarding form, owned by one mounted page.
pub struct OnboardingWizard {
    user_id: String,
    steps: StepTable,
    position: WizardPosition,
    values: FieldValues,
    errors: BTreeMap<FieldName, String>,
    notifications: Vec<Notification>,
    completed: bool,
    deps: WizardDeps,
}

impl OnboardingWizard {
    pub fn new(user_id: impl Into<String>, steps: StepTable, deps: WizardDeps) -> Self {
        Self::with_values(user_id, steps, deps, FieldValues::new())
    }

    /// Start with pre-populated values (e.g. a username suggested at sign-up).
    pub fn with_values(
        user_id: impl Into<String>,
        steps: StepTable,
        deps: WizardDeps,
        values: FieldValues,
    ) -> Self {
        let position = WizardPosition::start(steps.len());
        Self {
            user_id: user_id.into(),
            steps,
            position,
            values,
            errors: BTreeMap::new(),
            notifications: Vec::new(),
            completed: false,
            deps,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn position(&self) -> WizardPosition {
        self.position
    }

    pub fn current_index(&self) -> usize {
        self.position.current()
    }

    pub fn current_step(&self) -> WizardStep {
        // The table is non-empty and the position never leaves it.
        self.steps
            .get(self.position.current())
            .unwrap_or(WizardStep::Review)
    }

    pub fn current_view(&self) -> StepView {
        self.current_step().render(&self.values)
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn errors(&self) -> &BTreeMap<FieldName, String> {
        &self.errors
    }

    pub fn error_for(&self, field: FieldName) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Drain notifications queued since the last call.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Update one field. Always allowed; does not move the wizard.
    pub fn edit(&mut self, field: FieldName, value: FieldValue) {
        self.values.set(field, value);
        self.errors.remove(&field);
    }

    /// Validate the current step's fields and advance on success.
    pub async fn next(&mut self) -> NextOutcome {
        let from = self.position.current();
        let step = self.current_step();
        let required = step.required_fields();

        if required.is_empty() {
            let to = self.position.advance();
            debug!(user_id = %self.user_id, from, to, "Advanced without validation");
            return NextOutcome::Advanced { from, to };
        }

        let report = self.deps.validator.validate(required, &self.values).await;
        match self.record_report(&report) {
            None => {
                let to = self.position.advance();
                info!(user_id = %self.user_id, step = %step, to, "Onboarding step completed");
                NextOutcome::Advanced { from, to }
            }
            Some(errors) => {
                debug!(user_id = %self.user_id, step = %step, failed = errors.len(), "Step blocked");
                NextOutcome::Blocked { step: from, errors }
            }
        }
    }

    /// Copy a report into the per-field errors. Returns the failures, if
    /// any, after queueing the aggregate notification.
    fn record_report(&mut self, report: &ValidationReport) -> Option<Vec<(FieldName, String)>> {
        for result in &report.results {
            match &result.message {
                Some(message) if !result.valid => {
                    self.errors.insert(result.field, message.clone());
                }
                _ => {
                    self.errors.remove(&result.field);
                }
            }
        }

        if report.is_valid() {
            return None;
        }
        self.notifications.push(Notification::error(FIX_FIELDS_MESSAGE));
        Some(
            report
                .errors()
                .map(|(field, message)| (field, message.to_string()))
                .collect(),
        )
    }

    /// Go back one step without validating.
    pub fn back(&mut self) -> usize {
        self.position.retreat()
    }

    /// Submit from the final step.
    pub async fn submit(&mut self) -> SubmitResult {
        if !self.position.is_last() {
            return SubmitResult::NotOnFinalStep;
        }
        if self.completed {
            return SubmitResult::AlreadyCompleted;
        }

        // Fields stay editable on the review step, so re-check everything.
        let report = self.deps.validator.validate_all(&self.values).await;
        if let Some(errors) = self.record_report(&report) {
            debug!(user_id = %self.user_id, failed = errors.len(), "Submit blocked by invalid fields");
            return SubmitResult::Invalid { errors };
        }

        let token = self.deps.signals.begin().await;
        let outcome =
            submission::submit(self.deps.backend.as_ref(), &self.user_id, &self.values).await;

        match &outcome {
            SubmissionOutcome::Success => {
                self.completed = true;
                self.deps.signals.mark_completed(token).await;
                self.notifications.push(Notification::success(COMPLETED_MESSAGE));
                self.deps.navigator.redirect(Redirect::AfterOnboarding);
            }
            SubmissionOutcome::FieldConflict { field, message } => {
                self.deps.signals.abort(token).await;
                self.errors.insert(*field, message.clone());
                self.notifications.push(Notification::error(message.clone()));
            }
            SubmissionOutcome::GenericFailure { message } => {
                self.deps.signals.abort(token).await;
                self.notifications.push(Notification::error(message.clone()));
            }
        }

        SubmitResult::Attempted(outcome)
    }
}
