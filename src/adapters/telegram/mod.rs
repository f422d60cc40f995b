//! Telegram adapters: the Bot API client plus the access controller and
//! notifier built on it.

mod access;
mod api;
mod notifier;

pub use access::TelegramAccessController;
pub use api::{TelegramApi, TelegramApiError};
pub use notifier::TelegramNotifier;
