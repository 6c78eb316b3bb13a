//! Configuration types.

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Genres a user can pick as interests during onboarding.
pub const DEFAULT_INTEREST_CATALOGUE: &[&str] = &[
    "action",
    "adventure",
    "comedy",
    "drama",
    "fantasy",
    "horror",
    "isekai",
    "mecha",
    "mystery",
    "psychological",
    "romance",
    "sci-fi",
    "seinen",
    "shojo",
    "shonen",
    "slice-of-life",
    "sports",
    "supernatural",
    "thriller",
];

/// Onboarding wizard configuration.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Minimum username length (characters).
    pub username_min_len: usize,
    /// Maximum username length (characters).
    pub username_max_len: usize,
    /// Maximum length of first and last names.
    pub name_max_len: usize,
    /// Maximum bio length.
    pub bio_max_len: usize,
    /// Maximum location length.
    pub location_max_len: usize,
    /// Maximum number of selected interests.
    pub max_interests: usize,
    /// Allowed interest values.
    pub interest_catalogue: Vec<String>,
    /// How long after a completed submission outer guards must not send the
    /// user back into onboarding.
    pub completion_window: Duration,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            username_min_len: 3,
            username_max_len: 20,
            name_max_len: 50,
            bio_max_len: 500,
            location_max_len: 100,
            max_interests: 10,
            interest_catalogue: DEFAULT_INTEREST_CATALOGUE
                .iter()
                .map(|s| s.to_string())
                .collect(),
            completion_window: Duration::from_secs(10),
        }
    }
}

/// Connection settings for the hosted profile backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.example.co`.
    pub base_url: String,
    /// Anonymous API key sent with every request.
    pub api_key: SecretString,
}

/// Server binary configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// `None` runs against the in-memory backend.
    pub backend: Option<BackendConfig>,
    pub onboarding: OnboardingConfig,
}

impl ServerConfig {
    /// Load from `ANIHUB_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = match lookup("ANIHUB_PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "ANIHUB_PORT".into(),
                message: format!("{raw:?} is not a port number: {e}"),
            })?,
            None => 8080,
        };

        let backend = match lookup("ANIHUB_BACKEND_URL") {
            Some(url) => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::InvalidValue {
                        key: "ANIHUB_BACKEND_URL".into(),
                        message: format!("{url:?} must start with http:// or https://"),
                    });
                }
                let key = lookup("ANIHUB_BACKEND_KEY")
                    .ok_or_else(|| ConfigError::MissingEnvVar("ANIHUB_BACKEND_KEY".into()))?;
                Some(BackendConfig {
                    base_url: url.trim_end_matches('/').to_string(),
                    api_key: SecretString::from(key),
                })
            }
            None => None,
        };

        let mut onboarding = OnboardingConfig::default();
        if let Some(raw) = lookup("ANIHUB_COMPLETION_WINDOW_SECS") {
            let secs: u64 = raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "ANIHUB_COMPLETION_WINDOW_SECS".into(),
                message: format!("{raw:?}: {e}"),
            })?;
            onboarding.completion_window = Duration::from_secs(secs);
        }

        Ok(Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            backend,
            onboarding,
        })
    }
}
