//! Admin query surface configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Admin API configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Shared key required on every `/admin` request via `X-Admin-Key`
    pub api_key: String,
}

impl AdminConfig {
    /// Validate admin configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("ADMIN__API_KEY"));
        }
        if self.api_key.len() < 16 {
            return Err(ValidationError::AdminKeyTooShort);
        }
        Ok(())
    }
}
