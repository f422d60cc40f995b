//! Adapters: concrete implementations of the ports against real
//! infrastructure (HTTP server, Stripe API, Telegram Bot API, storage).

pub mod http;
pub mod storage;
pub mod stripe;
pub mod telegram;
