use std::env;
use std::time::Duration;

use dotenvy::dotenv;

use super::error::ClientError;

const DEFAULT_API_URL: &str = "http://localhost:3001";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Reads `ATS_API_URL` and `ATS_API_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenv().ok();

        let base_url = env::var("ATS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let timeout = match env::var("ATS_API_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| {
                ClientError::Validation(format!("Invalid value for ATS_API_TIMEOUT_SECS: {}", e))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self::new(base_url).with_timeout(Duration::from_secs(timeout)))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
