//! Telegram Access Controller Adapter
//!
//! Grants access by minting a fresh single-use invite link to the VIP
//! group, and revokes it by kicking the member: a ban followed by an
//! immediate unban, so the subscriber can be re-invited after a future
//! purchase without moderator intervention.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::subscription::SubscriberId;
use crate::ports::{AccessController, AccessError, AccessToken};

use super::api::{TelegramApi, TelegramApiError};

#[derive(Debug, Deserialize)]
struct ChatInviteLink {
    invite_link: String,
}

pub struct TelegramAccessController {
    api: TelegramApi,
    group_chat_id: i64,

    /// Static invite link used when minting fails. Not single-use, so it is
    /// strictly a degraded mode.
    fallback_invite_link: Option<String>,
}

impl TelegramAccessController {
    pub fn new(api: TelegramApi, group_chat_id: i64, fallback_invite_link: Option<String>) -> Self {
        Self {
            api,
            group_chat_id,
            fallback_invite_link,
        }
    }

    async fn mint_invite(&self) -> Result<String, TelegramApiError> {
        let link: ChatInviteLink = self
            .api
            .call(
                "createChatInviteLink",
                &json!({
                    "chat_id": self.group_chat_id,
                    "member_limit": 1,
                }),
            )
            .await?;
        Ok(link.invite_link)
    }
}

fn map_api_error(err: TelegramApiError) -> AccessError {
    match err {
        TelegramApiError::Api(description) => AccessError::Rejected(description),
        TelegramApiError::Network(e) | TelegramApiError::Protocol(e) => {
            AccessError::Unavailable(e)
        }
    }
}

#[async_trait]
impl AccessController for TelegramAccessController {
    async fn grant(&self, subscriber: &SubscriberId) -> Result<AccessToken, AccessError> {
        match self.mint_invite().await {
            Ok(invite_link) => Ok(AccessToken {
                invite_link,
                single_use: true,
            }),
            Err(err) => match &self.fallback_invite_link {
                Some(fallback) => {
                    tracing::warn!(
                        subscriber_id = %subscriber,
                        error = %err,
                        "invite mint failed, handing out fallback link"
                    );
                    Ok(AccessToken {
                        invite_link: fallback.clone(),
                        single_use: false,
                    })
                }
                None => Err(map_api_error(err)),
            },
        }
    }

    async fn revoke(&self, subscriber: &SubscriberId) -> Result<(), AccessError> {
        let user_id = subscriber
            .as_chat_id()
            .ok_or_else(|| AccessError::Rejected(format!("non-numeric subscriber id {subscriber}")))?;

        let _: serde_json::Value = self
            .api
            .call(
                "banChatMember",
                &json!({
                    "chat_id": self.group_chat_id,
                    "user_id": user_id,
                }),
            )
            .await
            .map_err(map_api_error)?;

        // Lift the ban straight away; we only wanted the kick.
        let _: serde_json::Value = self
            .api
            .call(
                "unbanChatMember",
                &json!({
                    "chat_id": self.group_chat_id,
                    "user_id": user_id,
                    "only_if_banned": true,
                }),
            )
            .await
            .map_err(map_api_error)?;

        Ok(())
    }
}
