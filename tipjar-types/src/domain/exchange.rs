//! Exchange (payout request) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::member::MemberId;
use super::month::YearMonth;
use crate::error::DomainError;

/// Unique identifier for an Exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ExchangeId(Uuid);

impl ExchangeId {
    /// Creates a new random ExchangeId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an ExchangeId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ExchangeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// State of a payout request.
///
/// `Waiting` is the only non-terminal state. `Approved` and `Rejected` are
/// terminal; a member whose exchange was rejected may create a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeStatus {
    Waiting,
    Approved,
    Rejected,
}

impl std::fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeStatus::Waiting => write!(f, "WAITING"),
            ExchangeStatus::Approved => write!(f, "APPROVED"),
            ExchangeStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A creator's request to convert accumulated points into a bank transfer.
///
/// `amount` is a snapshot of the eligible waiting donations at request time;
/// approval re-aggregates against the approval-month cutoff, so the settled
/// amount can differ from the requested one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    /// Unique identifier
    pub id: ExchangeId,
    /// Requesting creator
    pub member_id: MemberId,
    /// Requested point amount, snapshot at request time
    pub amount: i64,
    /// Settlement window the request was made for
    pub month: YearMonth,
    /// Current state
    pub status: ExchangeStatus,
    /// Reason recorded on rejection
    pub reject_reason: Option<String>,
    /// When the request was made
    pub created_at: DateTime<Utc>,
    /// When an admin approved or rejected it
    pub processed_at: Option<DateTime<Utc>>,
}

impl Exchange {
    /// Creates a new waiting exchange request.
    pub fn new(member_id: MemberId, amount: i64, month: YearMonth) -> Self {
        Self {
            id: ExchangeId::new(),
            member_id,
            amount,
            month,
            status: ExchangeStatus::Waiting,
            reject_reason: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Reconstructs an exchange from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: ExchangeId,
        member_id: MemberId,
        amount: i64,
        month: YearMonth,
        status: ExchangeStatus,
        reject_reason: Option<String>,
        created_at: DateTime<Utc>,
        processed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            member_id,
            amount,
            month,
            status,
            reject_reason,
            created_at,
            processed_at,
        }
    }

    /// Approves the exchange, settling it at `settled_amount`.
    ///
    /// Only a waiting exchange can be approved.
    pub fn approve(&mut self, settled_amount: i64) -> Result<(), DomainError> {
        self.ensure_waiting()?;
        self.amount = settled_amount;
        self.status = ExchangeStatus::Approved;
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    /// Rejects the exchange, recording the reason.
    ///
    /// Only a waiting exchange can be rejected.
    pub fn reject(&mut self, reason: String) -> Result<(), DomainError> {
        self.ensure_waiting()?;
        self.status = ExchangeStatus::Rejected;
        self.reject_reason = Some(reason);
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    fn ensure_waiting(&self) -> Result<(), DomainError> {
        if self.status != ExchangeStatus::Waiting {
            return Err(DomainError::ExchangeAlreadyProcessed(self.status));
        }
        Ok(())
    }
}

// Exchanges are compared by surrogate id only.
impl PartialEq for Exchange {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Exchange {}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiting_exchange() -> Exchange {
        Exchange::new(MemberId::new(), 3000, "2024-01".parse().unwrap())
    }

    #[test]
    fn test_approve_waiting() {
        let mut exchange = waiting_exchange();
        exchange.approve(2500).unwrap();

        assert_eq!(exchange.status, ExchangeStatus::Approved);
        assert_eq!(exchange.amount, 2500);
        assert!(exchange.processed_at.is_some());
    }

    #[test]
    fn test_reject_waiting() {
        let mut exchange = waiting_exchange();
        exchange.reject("missing bankbook image".to_string()).unwrap();

        assert_eq!(exchange.status, ExchangeStatus::Rejected);
        assert_eq!(
            exchange.reject_reason.as_deref(),
            Some("missing bankbook image")
        );
    }

    #[test]
    fn test_terminal_states_stay_terminal() {
        let mut approved = waiting_exchange();
        approved.approve(3000).unwrap();
        assert!(matches!(
            approved.approve(3000),
            Err(DomainError::ExchangeAlreadyProcessed(ExchangeStatus::Approved))
        ));
        assert!(approved.reject("too late".to_string()).is_err());

        let mut rejected = waiting_exchange();
        rejected.reject("no".to_string()).unwrap();
        assert!(rejected.approve(3000).is_err());
        assert!(rejected.reject("again".to_string()).is_err());
    }
}
