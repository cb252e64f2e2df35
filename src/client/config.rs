use std::env;
use std::time::Duration;

/// Connection settings for the attendance service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_prefix: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_prefix: "/api".to_string(),
            token: None,
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Reads `POINTAGE_BASE_URL`, `POINTAGE_TOKEN`, `API_PREFIX` and
    /// `POINTAGE_TIMEOUT_SECS`.
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("POINTAGE_BASE_URL").ok()?;
        let mut config = Self::new(base_url);
        config.token = env::var("POINTAGE_TOKEN").ok();
        if let Ok(prefix) = env::var("API_PREFIX") {
            config.api_prefix = prefix;
        }
        if let Some(secs) = env::var("POINTAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        Some(config)
    }
}
