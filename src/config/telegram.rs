//! Telegram configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Telegram bot and group configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token (`<numeric id>:<secret>`)
    pub bot_token: String,

    /// Chat id of the restricted group the bot administers
    pub group_chat_id: i64,

    /// Static invite link handed out when minting a single-use one fails.
    /// Optional; without it a failed mint becomes a "grant unavailable"
    /// message to the subscriber.
    pub fallback_invite_link: Option<String>,
}

impl TelegramConfig {
    /// Validate Telegram configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bot_token.is_empty() {
            return Err(ValidationError::MissingRequired("TELEGRAM__BOT_TOKEN"));
        }

        // Bot tokens look like "123456789:AAxxxx"; a missing colon means a
        // pasted secret from the wrong console field.
        let numeric_prefix = self
            .bot_token
            .split_once(':')
            .map(|(id, rest)| id.chars().all(|c| c.is_ascii_digit()) && !rest.is_empty())
            .unwrap_or(false);
        if !numeric_prefix {
            return Err(ValidationError::InvalidBotToken);
        }

        if self.group_chat_id == 0 {
            return Err(ValidationError::MissingGroupChatId);
        }

        Ok(())
    }
}
