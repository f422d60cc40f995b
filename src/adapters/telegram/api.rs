//! Telegram Bot API client.
//!
//! Thin JSON wrapper over `https://api.telegram.org/bot<token>/<method>`.
//! Every response arrives in the same envelope: `ok` plus either `result`
//! or `description`.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramApiError {
    #[error("telegram network failure: {0}")]
    Network(String),

    /// Telegram answered `ok: false`.
    #[error("telegram api error: {0}")]
    Api(String),

    #[error("telegram response could not be parsed: {0}")]
    Protocol(String),
}

/// Standard Bot API response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramApi {
    http_client: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
}

impl TelegramApi {
    pub fn new(bot_token: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            base_url: "https://api.telegram.org".to_string(),
            bot_token: SecretString::new(bot_token.into()),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Invoke one Bot API method with a JSON body.
    pub async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<R, TelegramApiError> {
        let url = format!(
            "{}/bot{}/{}",
            self.base_url,
            self.bot_token.expose_secret(),
            method
        );

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TelegramApiError::Network(e.to_string()))?;

        let envelope: Envelope<R> = response
            .json()
            .await
            .map_err(|e| TelegramApiError::Protocol(e.to_string()))?;

        if !envelope.ok {
            return Err(TelegramApiError::Api(
                envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            ));
        }

        envelope
            .result
            .ok_or_else(|| TelegramApiError::Protocol("ok response without result".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_success() {
        let json = r#"{"ok":true,"result":{"invite_link":"https://t.me/+abc"}}"#;
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(envelope.ok);
        assert!(envelope.result.is_some());
    }

    #[test]
    fn envelope_parses_failure() {
        let json = r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(!envelope.ok);
        assert_eq!(
            envelope.description.as_deref(),
            Some("Bad Request: chat not found")
        );
    }
}
