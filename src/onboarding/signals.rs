//! Onboarding signals shared between the wizard and navigation guards.
//!
//! While a submission is in flight, and for a short window after it
//! succeeds, the backend may already report the profile as onboarded (or
//! not yet). Guards read these signals so they don't bounce the user
//! between the wizard and the rest of the app during that window.

use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::config::OnboardingConfig;

/// Token for one in-flight submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightToken(Uuid);

#[derive(Debug, Default)]
struct SignalState {
    in_flight: Option<Uuid>,
    completed_at: Option<Instant>,
}

/// Shared onboarding signals. Hold in an `Arc`, one per user session.
#[derive(Debug)]
pub struct OnboardingSignals {
    window: Duration,
    state: RwLock<SignalState>,
}

impl OnboardingSignals {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: RwLock::new(SignalState::default()),
        }
    }

    /// Signals using the configured completion window.
    pub fn from_config(config: &OnboardingConfig) -> Self {
        Self::new(config.completion_window)
    }

    /// Mark a submission as started. A newer token replaces an older one.
    pub async fn begin(&self) -> InFlightToken {
        let token = Uuid::new_v4();
        self.state.write().await.in_flight = Some(token);
        debug!(token = %token, "Onboarding submission started");
        InFlightToken(token)
    }

    /// Clear the in-flight marker after a failed submission.
    pub async fn abort(&self, token: InFlightToken) {
        let mut state = self.state.write().await;
        if state.in_flight == Some(token.0) {
            state.in_flight = None;
        }
    }

    /// Record a successful submission and start the suppression window.
    pub async fn mark_completed(&self, token: InFlightToken) {
        let mut state = self.state.write().await;
        if state.in_flight == Some(token.0) {
            state.in_flight = None;
        }
        state.completed_at = Some(Instant::now());
        debug!(token = %token.0, "Onboarding marked completed");
    }

    pub async fn is_in_progress(&self) -> bool {
        self.state.read().await.in_flight.is_some()
    }

    /// Whether a submission succeeded within the window.
    pub async fn recently_completed(&self) -> bool {
        self.state
            .read()
            .await
            .completed_at
            .is_some_and(|at| at.elapsed() < self.window)
    }

    /// Whether outer guards should hold off redirecting into onboarding.
    pub async fn suppress_onboarding_redirect(&self) -> bool {
        self.is_in_progress().await || self.recently_completed().await
    }
}
