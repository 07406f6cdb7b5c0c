//! # Tipjar Hex
//!
//! Application service layer and HTTP adapter for the tipjar platform.
//!
//! ## Architecture
//!
//! - `service` - Application service (orchestrates domain operations)
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: PlatformRepository` and
//! `G: PaymentGateway`, allowing different repository and gateway
//! implementations to be injected.

pub mod inbound;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::TipService;
