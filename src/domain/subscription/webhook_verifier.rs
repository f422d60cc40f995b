//! Webhook signature verification.
//!
//! Authenticates inbound billing events using the provider's
//! `t=<timestamp>,v1=<hex hmac-sha256>` header scheme, with timestamp
//! validation against replays and constant-time signature comparison.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::billing_event::BillingEvent;
use super::webhook_errors::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a signed event (replay window).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Tolerance for signatures timestamped slightly in the future.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components of the signature header.
///
/// Format: `t=<timestamp>,v1=<signature>[,v0=<legacy>]`; unknown keys are
/// skipped for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp = None;
        let mut v1_signature = None;

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                return Err(WebhookError::Malformed(
                    "signature header element without '='".into(),
                ));
            };
            match key {
                "t" => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        WebhookError::Malformed("non-numeric signature timestamp".into())
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex::decode(value).map_err(|_| {
                        WebhookError::Malformed("v1 signature is not valid hex".into())
                    })?);
                }
                _ => {}
            }
        }

        match (timestamp, v1_signature) {
            (Some(timestamp), Some(v1_signature)) => Ok(Self {
                timestamp,
                v1_signature,
            }),
            (None, _) => Err(WebhookError::Malformed(
                "signature header missing timestamp".into(),
            )),
            (_, None) => Err(WebhookError::Malformed(
                "signature header missing v1 signature".into(),
            )),
        }
    }
}

/// Verifier gating every event before it reaches the reconciliation engine.
pub struct BillingWebhookVerifier {
    secret: SecretString,
}

impl BillingWebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
        }
    }

    /// Verify the signature header against the raw payload and parse the
    /// event.
    ///
    /// # Errors
    ///
    /// - `SecretUnconfigured` when the secret is empty (fail closed)
    /// - `InvalidSignature` when the HMAC does not match
    /// - `TimestampOutOfRange` / `InvalidTimestamp` for replays / skew
    /// - `Malformed` when the header or JSON body cannot be parsed
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<BillingEvent, WebhookError> {
        if self.secret.expose_secret().is_empty() {
            return Err(WebhookError::SecretUnconfigured);
        }

        let header = SignatureHeader::parse(signature_header)?;
        self.validate_timestamp(header.timestamp)?;

        let expected = self.compute_signature(header.timestamp, payload);
        if !constant_time_eq(&expected, &header.v1_signature) {
            return Err(WebhookError::InvalidSignature);
        }

        serde_json::from_slice(payload).map_err(|e| WebhookError::Malformed(e.to_string()))
    }

    fn validate_timestamp(&self, timestamp: i64) -> Result<(), WebhookError> {
        let age = chrono::Utc::now().timestamp() - timestamp;
        if age > MAX_EVENT_AGE_SECS {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }
        Ok(())
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(signed_payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a valid signature for test fixtures.
#[cfg(test)]
pub fn sign_test_payload(secret: &str, timestamp: i64, payload: &str) -> String {
    let signed_payload = format!("{}.{}", timestamp, payload);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "whsec_verifier_test_secret";

    fn signed_header(secret: &str, payload: &str) -> String {
        let timestamp = chrono::Utc::now().timestamp();
        format!(
            "t={},v1={}",
            timestamp,
            sign_test_payload(secret, timestamp, payload)
        )
    }

    #[test]
    fn parse_header_with_v1() {
        let header = SignatureHeader::parse(&format!("t=1234567890,v1={}", "ab".repeat(32)))
            .unwrap();
        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.v1_signature.len(), 32);
    }

    #[test]
    fn parse_header_ignores_unknown_keys() {
        let header =
            SignatureHeader::parse(&format!("t=1,v1={},v0=dead,scheme=x", "ab".repeat(32)))
                .unwrap();
        assert_eq!(header.timestamp, 1);
    }

    #[test]
    fn parse_header_missing_parts_fails() {
        assert!(matches!(
            SignatureHeader::parse("v1=abcd"),
            Err(WebhookError::Malformed(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("t=123"),
            Err(WebhookError::Malformed(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("t=abc,v1=abcd"),
            Err(WebhookError::Malformed(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("garbage"),
            Err(WebhookError::Malformed(_))
        ));
    }

    #[test]
    fn valid_signature_parses_event() {
        let verifier = BillingWebhookVerifier::new(TEST_SECRET);
        let payload = r#"{"id":"evt_1","type":"invoice.payment_succeeded","created":1704067200,"data":{"object":{"subscription":"sub_1"}}}"#;

        let event = verifier
            .verify_and_parse(payload.as_bytes(), &signed_header(TEST_SECRET, payload))
            .unwrap();

        assert_eq!(event.id, "evt_1");
        assert_eq!(event.subscription_id(), Some("sub_1".to_string()));
    }

    #[test]
    fn wrong_secret_is_rejected_even_for_valid_payload() {
        let verifier = BillingWebhookVerifier::new(TEST_SECRET);
        let payload = r#"{"id":"evt_1","type":"invoice.paid","created":1,"data":{"object":{}}}"#;

        let result = verifier
            .verify_and_parse(payload.as_bytes(), &signed_header("whsec_other", payload));

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let verifier = BillingWebhookVerifier::new(TEST_SECRET);
        let signed = r#"{"id":"evt_1"}"#;
        let tampered = r#"{"id":"evt_2"}"#;

        let result =
            verifier.verify_and_parse(tampered.as_bytes(), &signed_header(TEST_SECRET, signed));

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn unconfigured_secret_fails_closed() {
        let verifier = BillingWebhookVerifier::new("");
        let payload = r#"{"id":"evt_1","type":"x","created":1,"data":{"object":{}}}"#;

        let result =
            verifier.verify_and_parse(payload.as_bytes(), &signed_header("whatever", payload));

        assert!(matches!(result, Err(WebhookError::SecretUnconfigured)));
    }

    #[test]
    fn old_timestamp_is_rejected() {
        let verifier = BillingWebhookVerifier::new(TEST_SECRET);
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp() - 600;
        let header = format!(
            "t={},v1={}",
            timestamp,
            sign_test_payload(TEST_SECRET, timestamp, payload)
        );

        let result = verifier.verify_and_parse(payload.as_bytes(), &header);

        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    #[test]
    fn boundary_timestamp_is_accepted() {
        let verifier = BillingWebhookVerifier::new(TEST_SECRET);
        assert!(verifier
            .validate_timestamp(chrono::Utc::now().timestamp() - MAX_EVENT_AGE_SECS)
            .is_ok());
    }

    #[test]
    fn future_timestamp_beyond_skew_is_rejected() {
        let verifier = BillingWebhookVerifier::new(TEST_SECRET);
        let result = verifier.validate_timestamp(chrono::Utc::now().timestamp() + 120);
        assert!(matches!(result, Err(WebhookError::InvalidTimestamp)));
    }

    #[test]
    fn future_timestamp_within_skew_is_accepted() {
        let verifier = BillingWebhookVerifier::new(TEST_SECRET);
        assert!(verifier
            .validate_timestamp(chrono::Utc::now().timestamp() + 30)
            .is_ok());
    }

    #[test]
    fn invalid_json_with_valid_signature_is_malformed() {
        let verifier = BillingWebhookVerifier::new(TEST_SECRET);
        let payload = "not json at all";

        let result =
            verifier.verify_and_parse(payload.as_bytes(), &signed_header(TEST_SECRET, payload));

        assert!(matches!(result, Err(WebhookError::Malformed(_))));
    }
}
