//! Payment domain model (external gateway transaction record).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::DomainError;

/// Days after payment within which a refund may be requested.
pub const REFUND_GUARANTEE_DAYS: i64 = 7;

/// Unique identifier for a Payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new random PaymentId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a PaymentId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gateway-side status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Created locally, not yet confirmed by the gateway
    Ready,
    /// Confirmed paid by the gateway
    Paid,
    /// Refunded
    Cancelled,
    /// Verification failed
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Ready => write!(f, "READY"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Cancelled => write!(f, "CANCELLED"),
            PaymentStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// A point top-up transaction settled through the external payment gateway.
///
/// Immutable once settled, except for the refund transition within the
/// guarantee window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Merchant-side UID handed to the gateway
    pub merchant_uid: Uuid,
    /// Price of the purchased item, in the platform's currency unit
    pub item_price: i64,
    /// Name of the purchased item
    pub item_name: String,
    /// Gateway-side status
    pub status: PaymentStatus,
    /// Gateway transaction id, known after verification
    pub imp_uid: Option<String>,
    /// When the payment record was created
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new unverified payment with a fresh merchant UID.
    pub fn new(item_price: i64, item_name: String) -> Result<Self, DomainError> {
        if item_price <= 0 {
            return Err(DomainError::PointNotPositive(item_price));
        }

        Ok(Self {
            id: PaymentId::new(),
            merchant_uid: Uuid::new_v4(),
            item_price,
            item_name,
            status: PaymentStatus::Ready,
            imp_uid: None,
            created_at: Utc::now(),
        })
    }

    /// Reconstructs a payment from database fields.
    pub fn from_parts(
        id: PaymentId,
        merchant_uid: Uuid,
        item_price: i64,
        item_name: String,
        status: PaymentStatus,
        imp_uid: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            merchant_uid,
            item_price,
            item_name,
            status,
            imp_uid,
            created_at,
        }
    }

    /// Whether a refund request at `now` still falls inside the guarantee
    /// window. Checked before any outbound gateway call.
    pub fn within_guarantee_window(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at <= chrono::Duration::days(REFUND_GUARANTEE_DAYS)
    }
}

// Payments are compared by surrogate id only.
impl PartialEq for Payment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Payment {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_payment_creation() {
        let payment = Payment::new(10_000, "10000 points".to_string()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Ready);
        assert!(payment.imp_uid.is_none());
    }

    #[test]
    fn test_non_positive_price_rejected() {
        assert!(Payment::new(0, "free".to_string()).is_err());
    }

    #[test]
    fn test_guarantee_window() {
        let payment = Payment::new(1000, "1000 points".to_string()).unwrap();

        let day_seven = payment.created_at + Duration::days(7);
        let day_eight = payment.created_at + Duration::days(8);

        assert!(payment.within_guarantee_window(day_seven));
        assert!(!payment.within_guarantee_window(day_eight));
    }
}
