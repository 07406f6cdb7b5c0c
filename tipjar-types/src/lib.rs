//! # Tipjar Types
//!
//! Domain types and port traits for the tipjar donation platform.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Member, Donation, Exchange, Payment)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    AccountStatus, BankAccount, Donation, DonationId, DonationStatus, Exchange, ExchangeId,
    ExchangeStatus, Member, MemberId, Message, Payment, PaymentId, PaymentStatus, YearMonth,
    REFUND_GUARANTEE_DAYS,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError};
pub use ports::{AccountInfo, GatewayError, PaymentGateway, PaymentInfo, PlatformRepository};
