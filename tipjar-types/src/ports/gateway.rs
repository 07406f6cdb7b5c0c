//! Payment gateway port.
//!
//! Outbound contract against the external payment provider (IamPort).
//! Implementations are HTTP clients or mocks for tests.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::PaymentStatus;
use crate::error::DomainError;

/// Error type for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 404 from the account-holder lookup: the account does not exist.
    #[error("Bank account not found at gateway")]
    InvalidAccount,

    /// Any other non-2xx from the gateway; carries the raw status code.
    #[error("Gateway returned status {status}")]
    Upstream { status: u16 },

    /// Transport failure before a status code was received.
    #[error("Gateway unreachable: {0}")]
    Transport(String),

    /// 2xx response whose body could not be interpreted.
    #[error("Malformed gateway response: {0}")]
    Malformed(String),
}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidAccount => DomainError::AccountInvalid,
            GatewayError::Upstream { status } => {
                DomainError::Gateway(format!("account/payment API status {}", status))
            }
            GatewayError::Transport(e) => DomainError::Gateway(e),
            GatewayError::Malformed(e) => DomainError::Gateway(e),
        }
    }
}

/// Payment details as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub merchant_uid: Uuid,
    pub status: PaymentStatus,
    pub amount: i64,
    pub item_name: String,
    /// Gateway-side transaction id
    pub imp_uid: String,
}

/// Bank-account holder details as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub bank_holder: String,
}

/// Outbound port to the payment gateway.
///
/// There is no retry logic anywhere; failures surface to the caller as
/// mapped domain errors.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Looks up a payment by merchant UID.
    async fn request_payment_info(&self, merchant_uid: Uuid) -> Result<PaymentInfo, GatewayError>;

    /// Cancels (refunds) a payment by merchant UID.
    async fn request_payment_refund(&self, merchant_uid: Uuid)
    -> Result<PaymentInfo, GatewayError>;

    /// Looks up the holder name of a bank account.
    async fn request_holder_name(
        &self,
        bank_code: &str,
        bank_num: &str,
    ) -> Result<AccountInfo, GatewayError>;
}
