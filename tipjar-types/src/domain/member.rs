//! Member domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::DomainError;

/// Unique identifier for a Member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct MemberId(Uuid);

impl MemberId {
    /// Creates a new random MemberId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a MemberId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MemberId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Review state of a creator's bank account registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// No account submitted yet
    Unregistered,
    /// Submitted, waiting for admin review
    Requesting,
    /// Approved by an admin; the member may request exchanges
    Registered,
    /// Rejected by an admin; the member may submit again
    Rejected,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Unregistered => write!(f, "UNREGISTERED"),
            AccountStatus::Requesting => write!(f, "REQUESTING"),
            AccountStatus::Registered => write!(f, "REGISTERED"),
            AccountStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Bank account details submitted by a creator for payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BankAccount {
    /// Account holder name as registered at the bank
    pub holder: String,
    /// Account number
    pub number: String,
    /// Bank code understood by the payment gateway
    pub bank_code: String,
    /// Uploaded bankbook image, stored externally
    pub bankbook_image_url: Option<String>,
}

/// A platform member. Creators and donators share the same aggregate;
/// any member with a page name can receive donations.
///
/// The point balance is derived from donation sums and never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Unique identifier
    pub id: MemberId,
    /// Email from the external OAuth2 identity
    pub email: String,
    /// Display name
    pub nickname: String,
    /// Unique public URL slug of the member's page
    pub page_name: String,
    /// Free-form page description
    pub bio: Option<String>,
    /// Profile image, stored externally
    pub profile_image_url: Option<String>,
    /// Payout bank account, if submitted
    pub account: Option<BankAccount>,
    /// Review state of the bank account
    pub account_status: AccountStatus,
    /// Reason recorded when the account was rejected
    pub account_reject_reason: Option<String>,
    /// When the member signed up
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// Creates a new member with no bank account.
    ///
    /// # Validation
    /// - page name: 3-20 chars, lowercase ascii letters, digits, `-` or `_`
    /// - nickname: 2-20 chars
    /// - bio: at most 500 chars
    pub fn new(
        email: String,
        nickname: String,
        page_name: String,
    ) -> Result<Self, DomainError> {
        validate_page_name(&page_name)?;
        validate_nickname(&nickname)?;

        Ok(Self {
            id: MemberId::new(),
            email,
            nickname,
            page_name,
            bio: None,
            profile_image_url: None,
            account: None,
            account_status: AccountStatus::Unregistered,
            account_reject_reason: None,
            created_at: Utc::now(),
        })
    }

    /// Reconstructs a member from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: MemberId,
        email: String,
        nickname: String,
        page_name: String,
        bio: Option<String>,
        profile_image_url: Option<String>,
        account: Option<BankAccount>,
        account_status: AccountStatus,
        account_reject_reason: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            nickname,
            page_name,
            bio,
            profile_image_url,
            account,
            account_status,
            account_reject_reason,
            created_at,
        }
    }

    /// Whether the member may request an exchange.
    pub fn can_exchange(&self) -> bool {
        self.account_status == AccountStatus::Registered
    }
}

// Members are compared by surrogate id only.
impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Member {}

/// Validates a public page name.
pub fn validate_page_name(page_name: &str) -> Result<(), DomainError> {
    let len = page_name.chars().count();
    let well_formed = page_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

    if !(3..=20).contains(&len) || !well_formed {
        return Err(DomainError::PageNameValidation);
    }
    Ok(())
}

/// Validates a display nickname.
pub fn validate_nickname(nickname: &str) -> Result<(), DomainError> {
    let len = nickname.trim().chars().count();
    if !(2..=20).contains(&len) {
        return Err(DomainError::NicknameValidation);
    }
    Ok(())
}

/// Validates a page bio.
pub fn validate_bio(bio: &str) -> Result<(), DomainError> {
    if bio.chars().count() > 500 {
        return Err(DomainError::BioValidation);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_creation() {
        let member = Member::new(
            "creator@test.com".to_string(),
            "Creator".to_string(),
            "creator-page".to_string(),
        )
        .unwrap();

        assert_eq!(member.page_name, "creator-page");
        assert_eq!(member.account_status, AccountStatus::Unregistered);
        assert!(member.account.is_none());
        assert!(!member.can_exchange());
    }

    #[test]
    fn test_page_name_rules() {
        assert!(validate_page_name("my-page_1").is_ok());
        assert!(validate_page_name("ab").is_err());
        assert!(validate_page_name("UpperCase").is_err());
        assert!(validate_page_name("has space").is_err());
        assert!(validate_page_name(&"x".repeat(21)).is_err());
    }

    #[test]
    fn test_nickname_rules() {
        assert!(validate_nickname("ok").is_ok());
        assert!(validate_nickname("x").is_err());
        assert!(validate_nickname(&"n".repeat(21)).is_err());
    }

    #[test]
    fn test_bio_limit() {
        assert!(validate_bio(&"b".repeat(500)).is_ok());
        assert!(validate_bio(&"b".repeat(501)).is_err());
    }

    #[test]
    fn test_equality_is_by_id() {
        let a = Member::new(
            "a@test.com".to_string(),
            "Alice".to_string(),
            "alice".to_string(),
        )
        .unwrap();
        let mut b = a.clone();
        b.nickname = "Renamed".to_string();

        assert_eq!(a, b);
    }
}
