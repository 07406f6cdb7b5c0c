//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, InMemory) will implement this trait.

use uuid::Uuid;

use crate::domain::{
    AccountStatus, BankAccount, Donation, DonationId, Exchange, ExchangeId, Member, MemberId,
    Message, Payment, PaymentStatus, YearMonth,
};
use crate::dto::SettlementAmount;
use crate::error::RepoError;

/// The main repository port for the tipjar platform.
///
/// All status transitions MUST be atomic. Implementations should use database
/// transactions; in particular, approving an exchange flips its donations and
/// the exchange row in one transaction.
#[async_trait::async_trait]
pub trait PlatformRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Member Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Persists a new member and issues an access token.
    /// Returns the member and the raw token (stored hashed, shown once).
    async fn create_member(&self, member: Member) -> Result<(Member, String), RepoError>;

    /// Gets a member by id.
    async fn find_member(&self, id: MemberId) -> Result<Option<Member>, RepoError>;

    /// Gets a member by page name.
    async fn find_member_by_page_name(&self, page_name: &str)
    -> Result<Option<Member>, RepoError>;

    /// Gets a member by email.
    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, RepoError>;

    /// Resolves a hashed access token to its member.
    async fn verify_access_token_hash(&self, token_hash: &str)
    -> Result<Option<Member>, RepoError>;

    /// Updates nickname and/or bio.
    async fn update_profile(
        &self,
        id: MemberId,
        nickname: Option<String>,
        bio: Option<String>,
    ) -> Result<Member, RepoError>;

    /// Stores submitted bank account details and moves the member to
    /// `Requesting`.
    async fn submit_account(&self, id: MemberId, account: BankAccount) -> Result<(), RepoError>;

    /// Moves a member's account review state; `reason` is recorded on
    /// rejection.
    async fn update_account_status(
        &self,
        id: MemberId,
        status: AccountStatus,
        reason: Option<String>,
    ) -> Result<(), RepoError>;

    /// Members whose bank account is waiting for admin review.
    async fn list_requesting_accounts(&self) -> Result<Vec<Member>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Donation Operations & Aggregation
    // ─────────────────────────────────────────────────────────────────────────

    /// Persists a donation.
    async fn create_donation(&self, donation: Donation) -> Result<Donation, RepoError>;

    /// Gets a donation by id.
    async fn find_donation(&self, id: DonationId) -> Result<Option<Donation>, RepoError>;

    /// Attaches (or replaces) the message on a donation.
    async fn add_donation_message(&self, id: DonationId, message: Message)
    -> Result<(), RepoError>;

    /// All donations addressed to a creator, newest first.
    async fn list_donations_for_creator(
        &self,
        creator_id: MemberId,
    ) -> Result<Vec<Donation>, RepoError>;

    /// Sum of waiting donation points for a creator; 0 when none.
    async fn waiting_total_point(&self, creator_id: MemberId) -> Result<i64, RepoError>;

    /// Sum of exchanged donation points for a creator; 0 when none.
    async fn exchanged_total_point(&self, creator_id: MemberId) -> Result<i64, RepoError>;

    /// Waiting donations created strictly before the first instant of the
    /// month after `month` (request-time cutoff).
    async fn find_donations_to_exchange(
        &self,
        creator_id: MemberId,
        month: YearMonth,
    ) -> Result<Vec<Donation>, RepoError>;

    /// Sum of the `find_donations_to_exchange` set; 0 when empty.
    async fn exchange_amount_from_donations(
        &self,
        creator_id: MemberId,
        month: YearMonth,
    ) -> Result<i64, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Exchange Operations (approval MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────

    /// Persists a new waiting exchange.
    async fn create_exchange(&self, exchange: Exchange) -> Result<Exchange, RepoError>;

    /// The waiting exchange of a member, if any (at most one exists).
    async fn find_waiting_exchange(
        &self,
        member_id: MemberId,
    ) -> Result<Option<Exchange>, RepoError>;

    /// All waiting exchanges, oldest first.
    async fn list_waiting_exchanges(&self) -> Result<Vec<Exchange>, RepoError>;

    /// For every waiting exchange: the sum of its owner's waiting donations
    /// created strictly before the first instant of `approve_on` itself
    /// (approval-time cutoff; deliberately not the same boundary as the
    /// request-time one).
    async fn pending_settlement_amounts(
        &self,
        approve_on: YearMonth,
    ) -> Result<Vec<SettlementAmount>, RepoError>;

    /// Approves a waiting exchange: flips its approval-window donations to
    /// `Exchanged` and settles the exchange at their sum, in one transaction.
    /// Fails with a domain error if the exchange is not waiting.
    async fn approve_exchange(
        &self,
        id: ExchangeId,
        approve_on: YearMonth,
    ) -> Result<Exchange, RepoError>;

    /// Rejects a waiting exchange, leaving its donations untouched.
    /// Fails with a domain error if the exchange is not waiting.
    async fn reject_exchange(&self, id: ExchangeId, reason: String)
    -> Result<Exchange, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Payment Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Persists a payment record.
    async fn create_payment(&self, payment: Payment) -> Result<Payment, RepoError>;

    /// Gets a payment by merchant UID.
    async fn find_payment_by_merchant_uid(
        &self,
        merchant_uid: Uuid,
    ) -> Result<Option<Payment>, RepoError>;

    /// Updates the gateway-side status (and transaction id, when known).
    async fn update_payment_status(
        &self,
        merchant_uid: Uuid,
        status: PaymentStatus,
        imp_uid: Option<String>,
    ) -> Result<Payment, RepoError>;
}
