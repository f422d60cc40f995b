//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `VIPGATE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use vip_gate::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod admin;
mod billing;
mod error;
mod server;
mod storage;
mod telegram;

pub use admin::AdminConfig;
pub use billing::BillingConfig;
pub use error::{ConfigError, ValidationError};
pub use server::ServerConfig;
pub use storage::StorageConfig;
pub use telegram::TelegramConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, timeouts)
    #[serde(default)]
    pub server: ServerConfig,

    /// Billing provider configuration (Stripe)
    pub billing: BillingConfig,

    /// Telegram bot and group configuration
    pub telegram: TelegramConfig,

    /// Admin query surface configuration
    pub admin: AdminConfig,

    /// Subscription store configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `VIPGATE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `VIPGATE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `VIPGATE__BILLING__STRIPE_API_KEY=sk_...` -> `billing.stripe_api_key`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().prefix("VIPGATE").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.billing.validate()?;
        self.telegram.validate()?;
        self.admin.validate()?;
        Ok(())
    }
}
