//! Shared database types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use tipjar_types::{
    AccountStatus, BankAccount, Donation, DonationId, DonationStatus, Exchange, ExchangeId,
    ExchangeStatus, Member, MemberId, Message, Payment, PaymentId, PaymentStatus, RepoError,
    SettlementAmount, YearMonth,
};

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, Utc};
#[cfg(not(feature = "sqlite"))]
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Member row from database.
#[derive(FromRow)]
pub struct DbMember {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub email: String,
    pub nickname: String,
    pub page_name: String,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,

    pub account_holder: Option<String>,
    pub account_number: Option<String>,
    pub account_bank_code: Option<String>,
    pub bankbook_image_url: Option<String>,
    pub account_status: String,
    pub account_reject_reason: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

/// Donation row from database.
#[derive(FromRow)]
pub struct DbDonation {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    #[cfg(not(feature = "sqlite"))]
    pub creator_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub creator_id: String,

    #[cfg(not(feature = "sqlite"))]
    pub donator_id: Option<Uuid>,
    #[cfg(feature = "sqlite")]
    pub donator_id: Option<String>,

    pub point: i64,

    pub message_name: Option<String>,
    pub message_text: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub message_secret: bool,
    #[cfg(feature = "sqlite")]
    pub message_secret: i64,

    pub status: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

/// Exchange row from database.
#[derive(FromRow)]
pub struct DbExchange {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    #[cfg(not(feature = "sqlite"))]
    pub member_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub member_id: String,

    pub amount: i64,
    pub month: String,
    pub status: String,
    pub reject_reason: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub processed_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub processed_at: Option<String>,
}

/// Payment row from database.
#[derive(FromRow)]
pub struct DbPayment {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    #[cfg(not(feature = "sqlite"))]
    pub merchant_uid: Uuid,
    #[cfg(feature = "sqlite")]
    pub merchant_uid: String,

    pub item_price: i64,
    pub item_name: String,
    pub status: String,
    pub imp_uid: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

/// Aggregate-sum row for point total queries.
#[derive(FromRow)]
pub struct DbTotal {
    pub total: i64,
}

/// Per-exchange settlement sum row.
#[derive(FromRow)]
pub struct DbSettlement {
    #[cfg(not(feature = "sqlite"))]
    pub exchange_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub exchange_id: String,

    pub amount: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_account_status(s: &str) -> Result<AccountStatus, RepoError> {
    match s {
        "UNREGISTERED" => Ok(AccountStatus::Unregistered),
        "REQUESTING" => Ok(AccountStatus::Requesting),
        "REGISTERED" => Ok(AccountStatus::Registered),
        "REJECTED" => Ok(AccountStatus::Rejected),
        _ => Err(RepoError::Database(format!(
            "Unknown account status: {}",
            s
        ))),
    }
}

pub fn parse_donation_status(s: &str) -> Result<DonationStatus, RepoError> {
    match s {
        "WAITING_FOR_EXCHANGE" => Ok(DonationStatus::WaitingForExchange),
        "EXCHANGED" => Ok(DonationStatus::Exchanged),
        _ => Err(RepoError::Database(format!(
            "Unknown donation status: {}",
            s
        ))),
    }
}

pub fn parse_exchange_status(s: &str) -> Result<ExchangeStatus, RepoError> {
    match s {
        "WAITING" => Ok(ExchangeStatus::Waiting),
        "APPROVED" => Ok(ExchangeStatus::Approved),
        "REJECTED" => Ok(ExchangeStatus::Rejected),
        _ => Err(RepoError::Database(format!(
            "Unknown exchange status: {}",
            s
        ))),
    }
}

pub fn parse_payment_status(s: &str) -> Result<PaymentStatus, RepoError> {
    match s {
        "READY" => Ok(PaymentStatus::Ready),
        "PAID" => Ok(PaymentStatus::Paid),
        "CANCELLED" => Ok(PaymentStatus::Cancelled),
        "FAILED" => Ok(PaymentStatus::Failed),
        _ => Err(RepoError::Database(format!("Unknown payment status: {}", s))),
    }
}

pub fn parse_month(s: &str) -> Result<YearMonth, RepoError> {
    s.parse::<YearMonth>()
        .map_err(|e| RepoError::Database(e.to_string()))
}

#[cfg(feature = "sqlite")]
pub fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

#[cfg(feature = "sqlite")]
pub fn parse_datetime(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion (feature-gated implementations)
// ─────────────────────────────────────────────────────────────────────────────

impl DbMember {
    /// Convert database row to domain Member.
    pub fn into_domain(self) -> Result<Member, RepoError> {
        let account_status = parse_account_status(&self.account_status)?;

        // All three core fields are written together; a partial account row
        // is treated as no account.
        let account = match (self.account_holder, self.account_number, self.account_bank_code) {
            (Some(holder), Some(number), Some(bank_code)) => Some(BankAccount {
                holder,
                number,
                bank_code,
                bankbook_image_url: self.bankbook_image_url,
            }),
            _ => None,
        };

        #[cfg(not(feature = "sqlite"))]
        let (id, created_at) = (MemberId::from_uuid(self.id), self.created_at);

        #[cfg(feature = "sqlite")]
        let (id, created_at) = (
            MemberId::from_uuid(parse_uuid(&self.id)?),
            parse_datetime(&self.created_at)?,
        );

        Ok(Member::from_parts(
            id,
            self.email,
            self.nickname,
            self.page_name,
            self.bio,
            self.profile_image_url,
            account,
            account_status,
            self.account_reject_reason,
            created_at,
        ))
    }
}

impl DbDonation {
    /// Convert database row to domain Donation.
    pub fn into_domain(self) -> Result<Donation, RepoError> {
        let status = parse_donation_status(&self.status)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, creator_id, donator_id, secret, created_at) = (
            DonationId::from_uuid(self.id),
            MemberId::from_uuid(self.creator_id),
            self.donator_id.map(MemberId::from_uuid),
            self.message_secret,
            self.created_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, creator_id, donator_id, secret, created_at) = {
            let donator_id = self
                .donator_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(MemberId::from_uuid);

            (
                DonationId::from_uuid(parse_uuid(&self.id)?),
                MemberId::from_uuid(parse_uuid(&self.creator_id)?),
                donator_id,
                self.message_secret != 0,
                parse_datetime(&self.created_at)?,
            )
        };

        let message = match (self.message_name, self.message_text) {
            (Some(name), Some(text)) => Some(Message::new(name, text, secret)),
            _ => None,
        };

        Ok(Donation::from_parts(
            id,
            creator_id,
            donator_id,
            self.point,
            message,
            status,
            created_at,
        ))
    }
}

impl DbExchange {
    /// Convert database row to domain Exchange.
    pub fn into_domain(self) -> Result<Exchange, RepoError> {
        let status = parse_exchange_status(&self.status)?;
        let month = parse_month(&self.month)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, member_id, created_at, processed_at) = (
            ExchangeId::from_uuid(self.id),
            MemberId::from_uuid(self.member_id),
            self.created_at,
            self.processed_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, member_id, created_at, processed_at) = (
            ExchangeId::from_uuid(parse_uuid(&self.id)?),
            MemberId::from_uuid(parse_uuid(&self.member_id)?),
            parse_datetime(&self.created_at)?,
            self.processed_at.as_deref().map(parse_datetime).transpose()?,
        );

        Ok(Exchange::from_parts(
            id,
            member_id,
            self.amount,
            month,
            status,
            self.reject_reason,
            created_at,
            processed_at,
        ))
    }
}

impl DbPayment {
    /// Convert database row to domain Payment.
    pub fn into_domain(self) -> Result<Payment, RepoError> {
        let status = parse_payment_status(&self.status)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, merchant_uid, created_at) = (
            PaymentId::from_uuid(self.id),
            self.merchant_uid,
            self.created_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, merchant_uid, created_at) = (
            PaymentId::from_uuid(parse_uuid(&self.id)?),
            parse_uuid(&self.merchant_uid)?,
            parse_datetime(&self.created_at)?,
        );

        Ok(Payment::from_parts(
            id,
            merchant_uid,
            self.item_price,
            self.item_name,
            status,
            self.imp_uid,
            created_at,
        ))
    }
}

impl DbSettlement {
    /// Convert settlement-sum row to the admin DTO.
    pub fn into_domain(self) -> Result<SettlementAmount, RepoError> {
        #[cfg(not(feature = "sqlite"))]
        let exchange_id = ExchangeId::from_uuid(self.exchange_id);

        #[cfg(feature = "sqlite")]
        let exchange_id = ExchangeId::from_uuid(parse_uuid(&self.exchange_id)?);

        Ok(SettlementAmount {
            exchange_id,
            amount: self.amount,
        })
    }
}
