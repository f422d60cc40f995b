//! Error taxonomy for webhook intake.
//!
//! Only two classes of failure may produce a non-success response to the
//! billing provider: verification failures (here) and persistence failures
//! (`EngineError`). Everything downstream of a durable persist is best-effort.

use axum::http::StatusCode;
use thiserror::Error;

/// Failures while authenticating and parsing an inbound webhook call.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No signing secret is configured; the verifier fails closed.
    #[error("webhook signing secret not configured")]
    SecretUnconfigured,

    /// HMAC comparison failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// Signed timestamp is older than the replay tolerance window.
    #[error("signature timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp is in the future beyond clock-skew tolerance.
    #[error("signature timestamp in the future")]
    InvalidTimestamp,

    /// Signature header or JSON body could not be parsed.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl WebhookError {
    /// HTTP status returned to the provider. Non-2xx here is deliberate:
    /// a forged or unparseable delivery should not be acknowledged.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::SecretUnconfigured
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidTimestamp | WebhookError::Malformed(_) => StatusCode::BAD_REQUEST,
        }
    }
}
