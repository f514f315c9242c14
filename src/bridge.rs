use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, TypistError};
use crate::settings::Settings;

pub const DEFAULT_HELPER_URL: &str = "http://127.0.0.1:8765";

const REQUEST_TIMEOUT_MS: u64 = 3_000;

/// Status payload from the helper's `GET /status`.
#[derive(Debug, Clone, Deserialize)]
pub struct HelperStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub is_typing: bool,
    #[serde(default)]
    pub uptime_seconds: Option<f64>,
}

impl HelperStatus {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

#[derive(Debug, Deserialize)]
struct HelperFailure {
    error: String,
}

/// HTTP client for the native automation helper. Every failure is an
/// ordinary `ExternalBridge` result value; nothing here panics and nothing
/// is retried automatically.
pub struct HelperBridge {
    base_url: String,
    client: reqwest::Client,
}

impl HelperBridge {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(REQUEST_TIMEOUT_MS))
            .build()
            .map_err(|e| TypistError::bridge(format!("failed to build HTTP client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> Result<HelperStatus> {
        let url = format!("{}/status", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TypistError::bridge(format!("helper unreachable at {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(TypistError::bridge(format!(
                "helper status probe returned HTTP {}",
                response.status()
            )));
        }
        response
            .json::<HelperStatus>()
            .await
            .map_err(|e| TypistError::bridge(format!("malformed helper status payload: {e}")))
    }

    /// Soft probe: any fault reads as offline.
    pub async fn is_online(&self) -> bool {
        matches!(self.status().await, Ok(status) if status.is_online())
    }

    /// Asks the helper to type `text` with the given settings. The helper
    /// refuses with HTTP 400 while it is already typing.
    pub async fn start_typing(&self, text: &str, settings: &Settings) -> Result<()> {
        let url = format!("{}/type", self.base_url);
        let payload = serde_json::json!({ "text": text, "settings": settings });
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TypistError::bridge(format!("helper unreachable at {url}: {e}")))?;
        Self::ack(response, "start typing").await
    }

    pub async fn stop_typing(&self) -> Result<()> {
        let url = format!("{}/stop", self.base_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| TypistError::bridge(format!("helper unreachable at {url}: {e}")))?;
        Self::ack(response, "stop typing").await
    }

    async fn ack(response: reqwest::Response, action: &str) -> Result<()> {
        let http_status = response.status();
        if http_status.is_success() {
            return Ok(());
        }
        let reason = response
            .json::<HelperFailure>()
            .await
            .map(|failure| failure.error)
            .unwrap_or_else(|_| "no reason given".to_string());
        Err(TypistError::bridge(format!(
            "helper refused to {action} (HTTP {http_status}): {reason}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::{HelperBridge, HelperStatus};

    #[test]
    fn status_payload_parses_with_missing_optionals() {
        let full: HelperStatus = serde_json::from_str(
            r#"{"status":"online","version":"1.2.0","is_typing":true,"uptime_seconds":42.5}"#,
        )
        .unwrap();
        assert!(full.is_online());
        assert!(full.is_typing);
        assert_eq!(full.version.as_deref(), Some("1.2.0"));

        let bare: HelperStatus = serde_json::from_str(r#"{"status":"starting"}"#).unwrap();
        assert!(!bare.is_online());
        assert!(!bare.is_typing);
        assert_eq!(bare.uptime_seconds, None);
    }

    #[test]
    fn trailing_slashes_are_trimmed_from_the_base_url() {
        let bridge = HelperBridge::new("http://127.0.0.1:8765/").unwrap();
        assert_eq!(bridge.base_url(), "http://127.0.0.1:8765");
    }
}
