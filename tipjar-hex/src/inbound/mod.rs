//! Inbound HTTP adapter (Axum server).

pub mod auth;
pub mod handlers;
pub mod rate_limit;
pub mod server;

pub use handlers::{ApiError, AppState};
pub use server::HttpServer;
