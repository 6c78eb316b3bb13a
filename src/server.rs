//! HTTP server wiring for the onboarding routes.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::backend::{InMemoryBackend, ProfileBackend, RestBackend};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::onboarding::{
    FieldSchema, FieldValidator, OnboardingRouteState, StepTable, onboarding_routes,
};

/// Pick the backend named by the configuration.
pub fn build_backend(config: &ServerConfig) -> Arc<dyn ProfileBackend> {
    match config.backend.clone() {
        Some(backend_config) => {
            info!(base_url = %backend_config.base_url, "Using hosted profile backend");
            Arc::new(RestBackend::new(backend_config))
        }
        None => {
            info!("Using in-memory profile backend");
            Arc::new(InMemoryBackend::new())
        }
    }
}

/// Build the full application router.
pub fn build_app(config: &ServerConfig, backend: Arc<dyn ProfileBackend>) -> Router {
    let schema = Arc::new(FieldSchema::from_config(&config.onboarding));
    let state = OnboardingRouteState {
        backend: Arc::clone(&backend),
        validator: FieldValidator::new(schema, backend),
        steps: Arc::new(StepTable::default()),
    };
    onboarding_routes(state).layer(CorsLayer::permissive())
}

/// Load `ANIHUB_*` configuration and serve.
pub async fn run_from_env() -> Result<()> {
    let config = ServerConfig::from_env()?;
    print_banner(&config);
    run(config).await
}

fn print_banner(config: &ServerConfig) {
    eprintln!("anihub onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://{}/api/onboarding", config.bind_addr);
    match &config.backend {
        Some(backend) => eprintln!("   Backend: {}", backend.base_url),
        None => eprintln!("   Backend: in-memory (set ANIHUB_BACKEND_URL to use the hosted service)"),
    }
}

/// Bind and serve until the process is stopped.
pub async fn run(config: ServerConfig) -> Result<()> {
    let backend = build_backend(&config);
    let app = build_app(&config, backend);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Onboarding server started");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::OnboardingConfig;

    fn config() -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            backend: None,
            onboarding: OnboardingConfig::default(),
        }
    }

    #[tokio::test]
    async fn bad_env_surfaces_as_config_error() {
        // SAFETY: no other test in this crate reads ANIHUB_PORT.
        unsafe { std::env::set_var("ANIHUB_PORT", "not-a-port") };
        let err = run_from_env().await.unwrap_err();
        unsafe { std::env::remove_var("ANIHUB_PORT") };
        assert!(matches!(err, crate::error::Error::Config(_)));
    }

    #[tokio::test]
    async fn app_serves_health_with_in_memory_backend() {
        let config = config();
        let app = build_app(&config, build_backend(&config));
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn username_rules_follow_config() {
        let mut config = config();
        config.onboarding.username_min_len = 6;
        let app = build_app(&config, build_backend(&config));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/onboarding/username/short")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["available"], false);
    }
}
