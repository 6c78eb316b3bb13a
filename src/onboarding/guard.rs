//! Mount guard — decides whether the onboarding page renders the wizard,
//! sends the user to login, or skips past onboarding.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::model::{Navigator, Notification, Redirect, Session};
use super::signals::OnboardingSignals;
use crate::backend::{ProfileBackend, ProfileStatus};

pub const STATUS_UNKNOWN_MESSAGE: &str =
    "We couldn't check your onboarding status. You can continue setting up your profile.";

/// What the onboarding page should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    /// The identity provider is still resolving the session.
    Pending,
    RedirectToLogin,
    /// Onboarding is already done.
    SkipOnboarding,
    Render,
}

impl GuardDecision {
    pub fn redirect(&self) -> Option<Redirect> {
        match self {
            Self::RedirectToLogin => Some(Redirect::Login),
            Self::SkipOnboarding => Some(Redirect::AfterOnboarding),
            Self::Pending | Self::Render => None,
        }
    }
}

/// Decision plus an optional non-blocking notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    pub decision: GuardDecision,
    pub notification: Option<Notification>,
}

impl GuardOutcome {
    fn plain(decision: GuardDecision) -> Self {
        Self {
            decision,
            notification: None,
        }
    }
}

/// Mounted flag shared with the page. Cloning shares the flag.
#[derive(Debug, Clone)]
pub struct MountHandle(Arc<AtomicBool>);

impl MountHandle {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn unmount(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Guard for one mounted onboarding page.
pub struct MountGuard {
    backend: Arc<dyn ProfileBackend>,
    signals: Arc<OnboardingSignals>,
    mounted: MountHandle,
    /// Identity the last completed evaluation ran for.
    evaluated_for: Option<Option<String>>,
}

impl MountGuard {
    pub fn new(backend: Arc<dyn ProfileBackend>, signals: Arc<OnboardingSignals>) -> Self {
        Self {
            backend,
            signals,
            mounted: MountHandle::new(),
            evaluated_for: None,
        }
    }

    /// Handle the page flips when it unmounts.
    pub fn handle(&self) -> MountHandle {
        self.mounted.clone()
    }

    /// True on first mount and whenever the session identity changed.
    pub fn needs_evaluation(&self, session: &Session) -> bool {
        if session.loading {
            return true;
        }
        self.evaluated_for.as_ref() != Some(&session.user_id)
    }

    /// Evaluate the guard for `session`.
    ///
    /// Returns `None` when the page unmounted while the status lookup was in
    /// flight; the stale result is dropped.
    pub async fn evaluate(&mut self, session: &Session) -> Option<GuardOutcome> {
        if session.loading {
            return Some(GuardOutcome::plain(GuardDecision::Pending));
        }

        let Some(user_id) = session.user_id.as_deref() else {
            self.evaluated_for = Some(None);
            debug!("No session; redirecting to login");
            return Some(GuardOutcome::plain(GuardDecision::RedirectToLogin));
        };

        if self.signals.recently_completed().await {
            self.evaluated_for = Some(session.user_id.clone());
            return Some(GuardOutcome::plain(GuardDecision::SkipOnboarding));
        }

        let lookup = self.backend.get_profile_status(user_id).await;
        if !self.mounted.is_mounted() {
            debug!(user_id, "Guard unmounted during status lookup; dropping result");
            return None;
        }
        self.evaluated_for = Some(session.user_id.clone());

        let outcome = match lookup {
            Ok(Some(status)) if status.onboarding_complete => {
                info!(user_id, "Onboarding already complete; skipping wizard");
                GuardOutcome::plain(GuardDecision::SkipOnboarding)
            }
            Ok(_) => GuardOutcome::plain(GuardDecision::Render),
            Err(e) => {
                warn!(user_id, error = %e, "Onboarding status lookup failed; allowing access");
                GuardOutcome {
                    decision: GuardDecision::Render,
                    notification: Some(Notification::warning(STATUS_UNKNOWN_MESSAGE)),
                }
            }
        };
        Some(outcome)
    }

    /// Evaluate if needed and perform the redirect, if any.
    pub async fn apply(
        &mut self,
        session: &Session,
        navigator: &dyn Navigator,
    ) -> Option<GuardOutcome> {
        if !self.needs_evaluation(session) {
            return None;
        }
        let outcome = self.evaluate(session).await?;
        if let Some(target) = outcome.decision.redirect() {
            navigator.redirect(target);
        }
        Some(outcome)
    }
}

/// Outer-navigation check: should this user be sent into onboarding?
///
/// An incomplete (or missing) profile requires onboarding unless a
/// submission is in flight or just finished.
pub async fn requires_onboarding(
    status: Option<&ProfileStatus>,
    signals: &OnboardingSignals,
) -> bool {
    let complete = status.is_some_and(|s| s.onboarding_complete);
    if complete {
        return false;
    }
    !signals.suppress_onboarding_redirect().await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Map, Value};

    use super::*;
    use crate::backend::CompletionResponse;
    use crate::error::BackendError;
    use crate::onboarding::wizard::tests::RecordingNavigator;

    enum Script {
        Status(Option<bool>),
        Fail,
    }

    struct StatusBackend {
        script: Script,
        lookups: Mutex<Vec<String>>,
        /// Unmount this handle while the lookup is "in flight".
        unmount_during_lookup: Mutex<Option<MountHandle>>,
    }

    impl StatusBackend {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                lookups: Mutex::new(Vec::new()),
                unmount_during_lookup: Mutex::new(None),
            })
        }

        fn lookup_count(&self) -> usize {
            self.lookups.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ProfileBackend for StatusBackend {
        async fn check_username_available(&self, _username: &str) -> Result<bool, BackendError> {
            Ok(true)
        }

        async fn get_profile_status(
            &self,
            user_id: &str,
        ) -> Result<Option<ProfileStatus>, BackendError> {
            self.lookups.lock().unwrap().push(user_id.to_string());
            if let Some(handle) = self.unmount_during_lookup.lock().unwrap().take() {
                handle.unmount();
            }
            match self.script {
                Script::Status(None) => Ok(None),
                Script::Status(Some(done)) => Ok(Some(ProfileStatus {
                    user_id: user_id.to_string(),
                    username: Some("otaku".into()),
                    onboarding_complete: done,
                })),
                Script::Fail => Err(BackendError::Unavailable("503".into())),
            }
        }

        async fn complete_onboarding(
            &self,
            _user_id: &str,
            _payload: &Map<String, Value>,
        ) -> Result<CompletionResponse, BackendError> {
            Ok(CompletionResponse::ok())
        }
    }

    fn signals() -> Arc<OnboardingSignals> {
        Arc::new(OnboardingSignals::new(Duration::from_secs(10)))
    }

    fn guard(backend: &Arc<StatusBackend>) -> MountGuard {
        MountGuard::new(backend.clone(), signals())
    }

    #[tokio::test]
    async fn loading_session_waits() {
        let backend = StatusBackend::new(Script::Status(None));
        let outcome = guard(&backend).evaluate(&Session::loading()).await.unwrap();
        assert_eq!(outcome.decision, GuardDecision::Pending);
        assert_eq!(backend.lookup_count(), 0);
    }

    #[tokio::test]
    async fn anonymous_goes_to_login() {
        let backend = StatusBackend::new(Script::Status(None));
        let outcome = guard(&backend).evaluate(&Session::anonymous()).await.unwrap();
        assert_eq!(outcome.decision, GuardDecision::RedirectToLogin);
        assert_eq!(outcome.decision.redirect(), Some(Redirect::Login));
        assert_eq!(backend.lookup_count(), 0);
    }

    #[tokio::test]
    async fn completed_profile_skips_onboarding() {
        let backend = StatusBackend::new(Script::Status(Some(true)));
        let outcome = guard(&backend).evaluate(&Session::user("u1")).await.unwrap();
        assert_eq!(outcome.decision, GuardDecision::SkipOnboarding);
    }

    #[tokio::test]
    async fn incomplete_or_missing_profile_renders() {
        for script in [Script::Status(Some(false)), Script::Status(None)] {
            let backend = StatusBackend::new(script);
            let outcome = guard(&backend).evaluate(&Session::user("u1")).await.unwrap();
            assert_eq!(outcome.decision, GuardDecision::Render);
            assert!(outcome.notification.is_none());
        }
    }

    #[tokio::test]
    async fn lookup_failure_fails_open_with_warning() {
        let backend = StatusBackend::new(Script::Fail);
        let outcome = guard(&backend).evaluate(&Session::user("u1")).await.unwrap();
        assert_eq!(outcome.decision, GuardDecision::Render);
        assert_eq!(
            outcome.notification,
            Some(Notification::warning(STATUS_UNKNOWN_MESSAGE))
        );
    }

    #[tokio::test]
    async fn recent_completion_skips_without_lookup() {
        let backend = StatusBackend::new(Script::Status(Some(false)));
        let signals = signals();
        let token = signals.begin().await;
        signals.mark_completed(token).await;

        let mut guard = MountGuard::new(backend.clone(), signals);
        let outcome = guard.evaluate(&Session::user("u1")).await.unwrap();
        assert_eq!(outcome.decision, GuardDecision::SkipOnboarding);
        assert_eq!(backend.lookup_count(), 0);
    }

    #[tokio::test]
    async fn unmount_during_lookup_drops_result() {
        let backend = StatusBackend::new(Script::Status(Some(true)));
        let mut guard = guard(&backend);
        *backend.unmount_during_lookup.lock().unwrap() = Some(guard.handle());

        let navigator = RecordingNavigator::default();
        assert!(guard.apply(&Session::user("u1"), &navigator).await.is_none());
        assert_eq!(backend.lookup_count(), 1);
        assert!(navigator.taken().is_empty());
        assert!(!guard.handle().is_mounted());
    }

    #[tokio::test]
    async fn apply_runs_once_per_identity() {
        let backend = StatusBackend::new(Script::Status(Some(true)));
        let mut guard = guard(&backend);
        let navigator = RecordingNavigator::default();

        let first = guard.apply(&Session::user("u1"), &navigator).await;
        assert_eq!(first.unwrap().decision, GuardDecision::SkipOnboarding);
        assert!(guard.apply(&Session::user("u1"), &navigator).await.is_none());
        assert_eq!(backend.lookup_count(), 1);

        // Identity changed: evaluate again.
        assert!(guard.needs_evaluation(&Session::user("u2")));
        guard.apply(&Session::user("u2"), &navigator).await;
        assert_eq!(backend.lookup_count(), 2);
        assert_eq!(
            navigator.taken(),
            vec![Redirect::AfterOnboarding, Redirect::AfterOnboarding]
        );

        // Signing out is an identity change too.
        let out = guard.apply(&Session::anonymous(), &navigator).await.unwrap();
        assert_eq!(out.decision, GuardDecision::RedirectToLogin);
        assert_eq!(navigator.taken().last(), Some(&Redirect::Login));
    }

    #[tokio::test]
    async fn outer_navigation_respects_signals() {
        let signals = signals();
        let incomplete = ProfileStatus {
            user_id: "u1".into(),
            username: None,
            onboarding_complete: false,
        };
        assert!(requires_onboarding(Some(&incomplete), &signals).await);
        assert!(requires_onboarding(None, &signals).await);

        let token = signals.begin().await;
        assert!(!requires_onboarding(Some(&incomplete), &signals).await);
        signals.mark_completed(token).await;
        assert!(!requires_onboarding(Some(&incomplete), &signals).await);

        let complete = ProfileStatus {
            onboarding_complete: true,
            ..incomplete
        };
        assert!(!requires_onboarding(Some(&complete), &signals).await);
    }
}
