//! vip-gate: subscription-gated Telegram group access driven by Stripe
//! webhooks.
//!
//! The crate is organized hexagonally:
//!
//! - [`domain`] - the event model, subscription record, webhook verifier,
//!   and the reconciliation engine. Pure logic, no I/O.
//! - [`ports`] - trait boundaries the engine talks through.
//! - [`adapters`] - Stripe, Telegram, storage, and HTTP implementations.
//! - [`config`] - environment-driven configuration.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
