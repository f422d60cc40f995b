//! HTTP adapter: axum routes, handlers, and DTOs.

pub mod dto;
mod handlers;
mod routes;

pub use handlers::{ApiError, AppState};
pub use routes::app_router;
