//! Onboarding wizard — the multi-step profile setup shown after sign-up.
//!
//! A mount guard decides whether the wizard renders at all. The wizard walks
//! the user through a fixed table of steps, validating only the active
//! step's fields (the username also against the backend), and submits the
//! collected values from the final step. Shared signals keep navigation
//! guards from bouncing the user while a submission settles.

pub mod guard;
pub mod model;
pub mod routes;
pub mod schema;
pub mod signals;
pub mod state;
pub mod submission;
pub mod wizard;

pub use guard::{GuardDecision, GuardOutcome, MountGuard, MountHandle, requires_onboarding};
pub use model::{
    FieldName, FieldValue, FieldValues, Navigator, Notification, NotificationLevel, Redirect,
    Session,
};
pub use routes::{OnboardingForm, OnboardingRouteState, onboarding_routes};
pub use schema::{FieldSchema, FieldValidation, FieldValidator, ValidationReport};
pub use signals::{InFlightToken, OnboardingSignals};
pub use state::{StepDefinition, StepTable, StepView, WizardPosition, WizardStep};
pub use submission::SubmissionOutcome;
pub use wizard::{NextOutcome, OnboardingWizard, SubmitResult, WizardDeps};
