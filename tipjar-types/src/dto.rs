//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    AccountStatus, DonationId, DonationStatus, ExchangeId, ExchangeStatus, Member, MemberId,
    PaymentStatus, YearMonth,
};

// ─────────────────────────────────────────────────────────────────────────────
// Member DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to sign up a member (identity comes from the OAuth2 provider).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    /// Email from the OAuth2 identity
    #[schema(example = "creator@example.com")]
    pub email: String,
    /// Display name
    #[schema(example = "Creator")]
    pub nickname: String,
    /// Unique public URL slug
    #[schema(example = "creator-page")]
    pub page_name: String,
}

/// Response after signup. The access token is shown only once.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupResponse {
    pub member_id: MemberId,
    pub page_name: String,
    /// Bearer token for authenticated endpoints (shown only once)
    pub access_token: String,
}

/// Public view of a member's page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    pub page_name: String,
    pub nickname: String,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
}

impl From<&Member> for MemberResponse {
    fn from(member: &Member) -> Self {
        Self {
            page_name: member.page_name.clone(),
            nickname: member.nickname.clone(),
            bio: member.bio.clone(),
            profile_image_url: member.profile_image_url.clone(),
        }
    }
}

/// Private view of the authenticated member.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberDetailResponse {
    pub email: String,
    pub nickname: String,
    pub page_name: String,
    pub bio: Option<String>,
    pub account_status: AccountStatus,
    pub account_reject_reason: Option<String>,
}

impl From<&Member> for MemberDetailResponse {
    fn from(member: &Member) -> Self {
        Self {
            email: member.email.clone(),
            nickname: member.nickname.clone(),
            page_name: member.page_name.clone(),
            bio: member.bio.clone(),
            account_status: member.account_status,
            account_reject_reason: member.account_reject_reason.clone(),
        }
    }
}

/// Current exchangeable point balance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PointResponse {
    /// Sum of donations waiting for exchange
    #[schema(example = 12000)]
    pub point: i64,
}

/// Request to update the member's profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Request to register a payout bank account (goes into admin review).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountRegisterRequest {
    /// Account holder name as registered at the bank
    pub holder: String,
    /// Account number
    pub number: String,
    /// Bank code understood by the payment gateway
    pub bank_code: String,
    /// Uploaded bankbook image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bankbook_image_url: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Donation DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to donate points to a creator's page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DonationRequest {
    /// Target creator's page name
    #[schema(example = "creator-page")]
    pub page_name: String,
    /// Points to donate
    #[schema(example = 1000)]
    pub point: i64,
    /// Optional message attached at creation time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<DonationMessageRequest>,
}

/// Message attached to a donation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DonationMessageRequest {
    /// Display name chosen by the donator
    #[schema(example = "fan")]
    pub name: String,
    /// Message body
    #[schema(example = "thank you for the videos!")]
    pub text: String,
    /// Secret messages are visible only to the creator
    #[serde(default)]
    pub secret: bool,
}

/// A donation as seen on a creator's page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DonationResponse {
    pub donation_id: DonationId,
    pub point: i64,
    pub status: DonationStatus,
    /// Masked for secret messages when the viewer is not the creator
    pub message: Option<DonationMessageRequest>,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Exchange DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request a payout of accumulated points.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ExchangeRequest {
    /// Settlement month; defaults to the current UTC month
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<YearMonth>,
}

/// A payout request as seen by its owner or an admin.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExchangeResponse {
    pub exchange_id: ExchangeId,
    pub amount: i64,
    pub month: YearMonth,
    pub status: ExchangeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Admin view of a waiting exchange, including what it would settle at today.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminExchangeResponse {
    pub exchange_id: ExchangeId,
    pub page_name: String,
    pub nickname: String,
    /// Amount requested by the creator
    pub requested_amount: i64,
    /// Amount that would settle under the approval-month cutoff
    pub settlement_amount: i64,
    pub month: YearMonth,
    pub created_at: DateTime<Utc>,
}

/// Per-exchange settlement amount under an approval-month cutoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementAmount {
    pub exchange_id: ExchangeId,
    pub amount: i64,
}

/// Admin request to approve a waiting exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ExchangeApproveRequest {
    /// Approval month; defaults to the current UTC month
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<YearMonth>,
}

/// Admin request to reject a waiting exchange.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExchangeRejectRequest {
    /// Creator's page name
    pub page_name: String,
    /// Reason shown to the creator
    pub reason: String,
}

/// Admin request to reject an account registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountRejectRequest {
    /// Reason shown to the creator
    pub reason: String,
}

/// Admin view of a pending bank-account registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestingAccountResponse {
    pub member_id: MemberId,
    pub email: String,
    pub nickname: String,
    pub page_name: String,
    pub account_holder: String,
    pub account_number: String,
    pub bank: String,
    pub bankbook_image_url: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to start a point top-up payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentRequest {
    /// Item price in the platform's currency unit
    #[schema(example = 10000)]
    pub item_price: i64,
    /// Item name shown at the gateway
    #[schema(example = "10000 points")]
    pub item_name: String,
}

/// A payment record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub merchant_uid: Uuid,
    pub item_price: i64,
    pub item_name: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Request to verify a payment against the gateway after client-side checkout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentVerifyRequest {
    pub merchant_uid: Uuid,
}

/// Request to refund a payment within the guarantee window.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefundRequest {
    pub merchant_uid: Uuid,
}

// ─────────────────────────────────────────────────────────────────────────────
// Error body
// ─────────────────────────────────────────────────────────────────────────────

/// Uniform error body. `token` is present only for the OAuth2 linking flow
/// (`auth-004`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[schema(example = "member-002")]
    pub error_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}
