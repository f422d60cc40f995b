//! Telegram Notifier Adapter
//!
//! Direct messages to subscribers about their subscription lifecycle.
//! Message text is rendered from fixed templates; anything optional in the
//! context simply drops out of the message.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::subscription::SubscriberId;
use crate::ports::{NotificationContext, NotificationKind, Notifier, NotifyError};

use super::api::{TelegramApi, TelegramApiError};

pub struct TelegramNotifier {
    api: TelegramApi,
}

impl TelegramNotifier {
    pub fn new(api: TelegramApi) -> Self {
        Self { api }
    }
}

/// Render the message body for one notification.
fn render_message(kind: NotificationKind, context: &NotificationContext) -> String {
    let plan = context
        .plan
        .map(|p| p.to_string())
        .unwrap_or_else(|| "VIP".to_string());

    match kind {
        NotificationKind::Confirmed => {
            let mut text = format!(
                "✅ Payment confirmed! Your {plan} subscription is now active."
            );
            if let Some(link) = &context.invite_link {
                text.push_str(&format!("\n\nJoin the VIP group here: {link}"));
                text.push_str("\nThis link admits one person and expires after use.");
            }
            text
        }
        NotificationKind::GrantUnavailable => format!(
            "✅ Payment confirmed! Your {plan} subscription is active, but we \
             could not create your invite link automatically. Please contact \
             support and we will add you to the group."
        ),
        NotificationKind::Renewed => {
            let mut text = format!("🔄 Your {plan} subscription has renewed.");
            if let Some(until) = context.period_end.and_then(format_date) {
                text.push_str(&format!(" You are covered until {until}."));
            }
            text
        }
        NotificationKind::AccessRemoved => {
            "Your subscription has ended and your VIP group access has been \
             removed. You can resubscribe at any time to rejoin."
                .to_string()
        }
    }
}

fn format_date(epoch_secs: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(epoch_secs, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(
        &self,
        subscriber: &SubscriberId,
        kind: NotificationKind,
        context: &NotificationContext,
    ) -> Result<(), NotifyError> {
        let chat_id = subscriber.as_chat_id().ok_or_else(|| {
            NotifyError::BadRecipient(format!("non-numeric subscriber id {subscriber}"))
        })?;

        let text = render_message(kind, context);

        let _: serde_json::Value = self
            .api
            .call(
                "sendMessage",
                &json!({
                    "chat_id": chat_id,
                    "text": text,
                    "disable_web_page_preview": true,
                }),
            )
            .await
            .map_err(|err| match err {
                TelegramApiError::Api(description) => NotifyError::BadRecipient(description),
                TelegramApiError::Network(e) | TelegramApiError::Protocol(e) => {
                    NotifyError::DeliveryFailed(e)
                }
            })?;

        Ok(())
    }
}
