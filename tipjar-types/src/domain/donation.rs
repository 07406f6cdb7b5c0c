//! Donation domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::member::MemberId;
use crate::error::DomainError;

/// Unique identifier for a Donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct DonationId(Uuid);

impl DonationId {
    /// Creates a new random DonationId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a DonationId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DonationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DonationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DonationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Settlement state of a donation.
///
/// A donation starts waiting and moves to `Exchanged` exactly once, when an
/// admin approves the owning creator's exchange. A rejected exchange leaves
/// its donations waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DonationStatus {
    WaitingForExchange,
    Exchanged,
}

impl std::fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DonationStatus::WaitingForExchange => write!(f, "WAITING_FOR_EXCHANGE"),
            DonationStatus::Exchanged => write!(f, "EXCHANGED"),
        }
    }
}

/// Message a donator attaches to a donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// Display name chosen by the donator
    pub name: String,
    /// Message body
    pub text: String,
    /// Secret messages are visible only to the receiving creator
    pub secret: bool,
}

impl Message {
    pub fn new(name: String, text: String, secret: bool) -> Self {
        Self { name, text, secret }
    }
}

/// A single point transfer from a donator to a creator.
///
/// The point amount is fixed at creation and never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    /// Unique identifier
    pub id: DonationId,
    /// Receiving creator
    pub creator_id: MemberId,
    /// Sending member; None for anonymous donations
    pub donator_id: Option<MemberId>,
    /// Donated points (positive)
    pub point: i64,
    /// Optional attached message
    pub message: Option<Message>,
    /// Settlement state
    pub status: DonationStatus,
    /// When the donation was made
    pub created_at: DateTime<Utc>,
}

impl Donation {
    /// Creates a new waiting donation.
    ///
    /// # Validation
    /// - point must be positive
    pub fn new(
        creator_id: MemberId,
        donator_id: Option<MemberId>,
        point: i64,
        message: Option<Message>,
    ) -> Result<Self, DomainError> {
        if point <= 0 {
            return Err(DomainError::PointNotPositive(point));
        }

        Ok(Self {
            id: DonationId::new(),
            creator_id,
            donator_id,
            point,
            message,
            status: DonationStatus::WaitingForExchange,
            created_at: Utc::now(),
        })
    }

    /// Reconstructs a donation from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: DonationId,
        creator_id: MemberId,
        donator_id: Option<MemberId>,
        point: i64,
        message: Option<Message>,
        status: DonationStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            creator_id,
            donator_id,
            point,
            message,
            status,
            created_at,
        }
    }

    /// Marks the donation settled. Part of the exchange approval transition.
    pub fn to_exchanged(&mut self) {
        self.status = DonationStatus::Exchanged;
    }
}

// Donations are compared by surrogate id only.
impl PartialEq for Donation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Donation {}
