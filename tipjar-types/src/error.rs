//! Error types for the tipjar platform.
//!
//! Every domain error carries a stable string code that is part of the HTTP
//! contract; clients dispatch on the code, not the message.

use crate::domain::{ExchangeStatus, MemberId};

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Page name must be 3-20 lowercase letters, digits, '-' or '_'")]
    PageNameValidation,

    #[error("Nickname must be 2-20 characters")]
    NicknameValidation,

    #[error("Bio must be at most 500 characters")]
    BioValidation,

    #[error("Page name is already taken")]
    DuplicatePageName,

    #[error("Already registered with this email")]
    AlreadyRegistered { link_token: String },

    #[error("Bank account could not be verified")]
    AccountInvalid,

    #[error("Bank account is not registered")]
    AccountNotRegistered,

    #[error("Donation not found")]
    DonationNotFound,

    #[error("Point amount must be positive, got {0}")]
    PointNotPositive(i64),

    #[error("No exchange is waiting for approval")]
    ExchangeNotFound,

    #[error("Exchange was already processed: {0}")]
    ExchangeAlreadyProcessed(ExchangeStatus),

    #[error("An exchange request is already waiting")]
    ExchangeAlreadyRequested,

    #[error("There are no points to exchange")]
    NothingToExchange,

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("Payment verification mismatch: {0}")]
    PaymentMismatch(String),

    #[error("Refund guarantee duration has passed")]
    RefundGuaranteeExpired,

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl DomainError {
    /// Stable error code exposed on the HTTP surface.
    pub fn error_code(&self) -> &'static str {
        match self {
            DomainError::MemberNotFound(_) => "member-001",
            DomainError::PageNameValidation => "member-002",
            DomainError::NicknameValidation => "member-003",
            DomainError::BioValidation => "member-004",
            DomainError::DuplicatePageName => "member-005",
            DomainError::AccountInvalid => "member-006",
            DomainError::AccountNotRegistered => "member-007",
            DomainError::PageNotFound(_) => "member-008",
            DomainError::AlreadyRegistered { .. } => "auth-004",
            DomainError::DonationNotFound => "donation-001",
            DomainError::PointNotPositive(_) => "donation-002",
            DomainError::ExchangeNotFound => "exchange-001",
            DomainError::ExchangeAlreadyProcessed(_) => "exchange-002",
            DomainError::ExchangeAlreadyRequested => "exchange-003",
            DomainError::NothingToExchange => "exchange-004",
            DomainError::PaymentNotFound => "payment-001",
            DomainError::PaymentMismatch(_) => "payment-002",
            DomainError::RefundGuaranteeExpired => "refund-003",
            DomainError::Gateway(_) => "error-002",
            DomainError::Validation(_) => "request-001",
        }
    }
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes; every `Domain` variant becomes a 4xx
/// body of the form `{"errorCode": ..., "message": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable error code exposed on the HTTP surface.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Domain(e) => e.error_code(),
            AppError::BadRequest(_) => "request-001",
            AppError::Unauthorized(_) => "auth-001",
            AppError::NotFound(_) => "request-002",
            AppError::Internal(_) => "error-001",
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => AppError::Domain(e),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::BadRequest(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(DomainError::PageNameValidation.error_code(), "member-002");
        assert_eq!(DomainError::RefundGuaranteeExpired.error_code(), "refund-003");
        assert_eq!(
            DomainError::AlreadyRegistered {
                link_token: "t".into()
            }
            .error_code(),
            "auth-004"
        );
        assert_eq!(DomainError::Gateway("503".into()).error_code(), "error-002");
    }

    #[test]
    fn test_repo_error_maps_to_app_error() {
        let err: AppError = RepoError::Domain(DomainError::ExchangeNotFound).into();
        assert!(matches!(err, AppError::Domain(DomainError::ExchangeNotFound)));
        assert_eq!(err.error_code(), "exchange-001");

        let err: AppError = RepoError::Database("disk full".into()).into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
