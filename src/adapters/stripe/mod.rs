//! Stripe adapters: REST gateway for subscription lookups and checkout
//! session creation.

mod gateway;
mod wire;

pub use gateway::{StripeGateway, StripeGatewayConfig};
