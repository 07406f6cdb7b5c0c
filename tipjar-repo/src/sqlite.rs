//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;
use uuid::Uuid;

use tipjar_types::{
    AccountStatus, BankAccount, Donation, DonationId, Exchange, ExchangeId, Member, MemberId,
    Message, Payment, PaymentStatus, PlatformRepository, RepoError, SettlementAmount, YearMonth,
};

use crate::security;
use crate::types::{DbDonation, DbExchange, DbMember, DbPayment, DbSettlement, DbTotal};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
///
/// Timestamps are stored as RFC 3339 TEXT; all cutoff comparisons are
/// lexicographic, which is order-preserving for this format.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        // Run migration from migration file
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn fetch_member(&self, id_str: &str) -> Result<Option<Member>, RepoError> {
        let row: Option<DbMember> = sqlx::query_as(
            r#"SELECT id, email, nickname, page_name, bio, profile_image_url,
                      account_holder, account_number, account_bank_code, bankbook_image_url,
                      account_status, account_reject_reason, created_at
               FROM members WHERE id = ?"#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbMember::into_domain).transpose()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl PlatformRepository for SqliteRepo {
    async fn create_member(&self, member: Member) -> Result<(Member, String), RepoError> {
        let raw_token = security::generate_access_token();
        let token_hash = security::hash_access_token(&raw_token);

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO members (id, email, nickname, page_name, bio, profile_image_url, account_status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(member.id.to_string())
        .bind(&member.email)
        .bind(&member.nickname)
        .bind(&member.page_name)
        .bind(&member.bio)
        .bind(&member.profile_image_url)
        .bind(member.account_status.to_string())
        .bind(member.created_at.to_rfc3339())
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO access_tokens (id, member_id, token_hash, created_at) VALUES (?, ?, ?, ?)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(member.id.to_string())
        .bind(&token_hash)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok((member, raw_token))
    }

    async fn find_member(&self, id: MemberId) -> Result<Option<Member>, RepoError> {
        self.fetch_member(&id.to_string()).await
    }

    async fn find_member_by_page_name(
        &self,
        page_name: &str,
    ) -> Result<Option<Member>, RepoError> {
        let row: Option<DbMember> = sqlx::query_as(
            r#"SELECT id, email, nickname, page_name, bio, profile_image_url,
                      account_holder, account_number, account_bank_code, bankbook_image_url,
                      account_status, account_reject_reason, created_at
               FROM members WHERE page_name = ?"#,
        )
        .bind(page_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbMember::into_domain).transpose()
    }

    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, RepoError> {
        let row: Option<DbMember> = sqlx::query_as(
            r#"SELECT id, email, nickname, page_name, bio, profile_image_url,
                      account_holder, account_number, account_bank_code, bankbook_image_url,
                      account_status, account_reject_reason, created_at
               FROM members WHERE email = ?"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbMember::into_domain).transpose()
    }

    async fn verify_access_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Member>, RepoError> {
        let row: Option<DbMember> = sqlx::query_as(
            r#"SELECT m.id, m.email, m.nickname, m.page_name, m.bio, m.profile_image_url,
                      m.account_holder, m.account_number, m.account_bank_code, m.bankbook_image_url,
                      m.account_status, m.account_reject_reason, m.created_at
               FROM members m
               JOIN access_tokens t ON t.member_id = m.id
               WHERE t.token_hash = ?"#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbMember::into_domain).transpose()
    }

    async fn update_profile(
        &self,
        id: MemberId,
        nickname: Option<String>,
        bio: Option<String>,
    ) -> Result<Member, RepoError> {
        let id_str = id.to_string();

        let result = sqlx::query(
            r#"UPDATE members
               SET nickname = COALESCE(?, nickname), bio = COALESCE(?, bio)
               WHERE id = ?"#,
        )
        .bind(&nickname)
        .bind(&bio)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        self.fetch_member(&id_str).await?.ok_or(RepoError::NotFound)
    }

    async fn submit_account(&self, id: MemberId, account: BankAccount) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE members
               SET account_holder = ?, account_number = ?, account_bank_code = ?,
                   bankbook_image_url = ?, account_status = 'REQUESTING',
                   account_reject_reason = NULL
               WHERE id = ?"#,
        )
        .bind(&account.holder)
        .bind(&account.number)
        .bind(&account.bank_code)
        .bind(&account.bankbook_image_url)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn update_account_status(
        &self,
        id: MemberId,
        status: AccountStatus,
        reason: Option<String>,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE members SET account_status = ?, account_reject_reason = ? WHERE id = ?"#,
        )
        .bind(status.to_string())
        .bind(&reason)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_requesting_accounts(&self) -> Result<Vec<Member>, RepoError> {
        let rows: Vec<DbMember> = sqlx::query_as(
            r#"SELECT id, email, nickname, page_name, bio, profile_image_url,
                      account_holder, account_number, account_bank_code, bankbook_image_url,
                      account_status, account_reject_reason, created_at
               FROM members WHERE account_status = 'REQUESTING'
               ORDER BY created_at ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbMember::into_domain).collect()
    }

    async fn create_donation(&self, donation: Donation) -> Result<Donation, RepoError> {
        let (message_name, message_text, message_secret) = match &donation.message {
            Some(m) => (Some(m.name.clone()), Some(m.text.clone()), m.secret as i64),
            None => (None, None, 0),
        };

        sqlx::query(
            r#"INSERT INTO donations (id, creator_id, donator_id, point, message_name, message_text, message_secret, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(donation.id.to_string())
        .bind(donation.creator_id.to_string())
        .bind(donation.donator_id.map(|d| d.to_string()))
        .bind(donation.point)
        .bind(&message_name)
        .bind(&message_text)
        .bind(message_secret)
        .bind(donation.status.to_string())
        .bind(donation.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(donation)
    }

    async fn find_donation(&self, id: DonationId) -> Result<Option<Donation>, RepoError> {
        let row: Option<DbDonation> = sqlx::query_as(
            r#"SELECT id, creator_id, donator_id, point, message_name, message_text, message_secret, status, created_at
               FROM donations WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbDonation::into_domain).transpose()
    }

    async fn add_donation_message(
        &self,
        id: DonationId,
        message: Message,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE donations SET message_name = ?, message_text = ?, message_secret = ? WHERE id = ?"#,
        )
        .bind(&message.name)
        .bind(&message.text)
        .bind(message.secret as i64)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_donations_for_creator(
        &self,
        creator_id: MemberId,
    ) -> Result<Vec<Donation>, RepoError> {
        let rows: Vec<DbDonation> = sqlx::query_as(
            r#"SELECT id, creator_id, donator_id, point, message_name, message_text, message_secret, status, created_at
               FROM donations WHERE creator_id = ?
               ORDER BY created_at DESC"#,
        )
        .bind(creator_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbDonation::into_domain).collect()
    }

    async fn waiting_total_point(&self, creator_id: MemberId) -> Result<i64, RepoError> {
        let row: DbTotal = sqlx::query_as(
            r#"SELECT COALESCE(SUM(point), 0) AS total FROM donations
               WHERE creator_id = ? AND status = 'WAITING_FOR_EXCHANGE'"#,
        )
        .bind(creator_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.total)
    }

    async fn exchanged_total_point(&self, creator_id: MemberId) -> Result<i64, RepoError> {
        let row: DbTotal = sqlx::query_as(
            r#"SELECT COALESCE(SUM(point), 0) AS total FROM donations
               WHERE creator_id = ? AND status = 'EXCHANGED'"#,
        )
        .bind(creator_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.total)
    }

    async fn find_donations_to_exchange(
        &self,
        creator_id: MemberId,
        month: YearMonth,
    ) -> Result<Vec<Donation>, RepoError> {
        // Request-time cutoff: first instant of the month after `month`.
        let cutoff = month.start_of_next().to_rfc3339();

        let rows: Vec<DbDonation> = sqlx::query_as(
            r#"SELECT id, creator_id, donator_id, point, message_name, message_text, message_secret, status, created_at
               FROM donations
               WHERE creator_id = ? AND status = 'WAITING_FOR_EXCHANGE' AND created_at < ?
               ORDER BY created_at ASC"#,
        )
        .bind(creator_id.to_string())
        .bind(&cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbDonation::into_domain).collect()
    }

    async fn exchange_amount_from_donations(
        &self,
        creator_id: MemberId,
        month: YearMonth,
    ) -> Result<i64, RepoError> {
        let cutoff = month.start_of_next().to_rfc3339();

        let row: DbTotal = sqlx::query_as(
            r#"SELECT COALESCE(SUM(point), 0) AS total FROM donations
               WHERE creator_id = ? AND status = 'WAITING_FOR_EXCHANGE' AND created_at < ?"#,
        )
        .bind(creator_id.to_string())
        .bind(&cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.total)
    }

    async fn create_exchange(&self, exchange: Exchange) -> Result<Exchange, RepoError> {
        sqlx::query(
            r#"INSERT INTO exchanges (id, member_id, amount, month, status, reject_reason, created_at, processed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(exchange.id.to_string())
        .bind(exchange.member_id.to_string())
        .bind(exchange.amount)
        .bind(exchange.month.to_string())
        .bind(exchange.status.to_string())
        .bind(&exchange.reject_reason)
        .bind(exchange.created_at.to_rfc3339())
        .bind(exchange.processed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(exchange)
    }

    async fn find_waiting_exchange(
        &self,
        member_id: MemberId,
    ) -> Result<Option<Exchange>, RepoError> {
        let row: Option<DbExchange> = sqlx::query_as(
            r#"SELECT id, member_id, amount, month, status, reject_reason, created_at, processed_at
               FROM exchanges WHERE member_id = ? AND status = 'WAITING'
               LIMIT 1"#,
        )
        .bind(member_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbExchange::into_domain).transpose()
    }

    async fn list_waiting_exchanges(&self) -> Result<Vec<Exchange>, RepoError> {
        let rows: Vec<DbExchange> = sqlx::query_as(
            r#"SELECT id, member_id, amount, month, status, reject_reason, created_at, processed_at
               FROM exchanges WHERE status = 'WAITING'
               ORDER BY created_at ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbExchange::into_domain).collect()
    }

    async fn pending_settlement_amounts(
        &self,
        approve_on: YearMonth,
    ) -> Result<Vec<SettlementAmount>, RepoError> {
        // Approval-time cutoff: first instant of the approval month itself.
        let cutoff = approve_on.start().to_rfc3339();

        let rows: Vec<DbSettlement> = sqlx::query_as(
            r#"SELECT e.id AS exchange_id, COALESCE(SUM(d.point), 0) AS amount
               FROM exchanges e
               LEFT JOIN donations d
                 ON d.creator_id = e.member_id
                AND d.status = 'WAITING_FOR_EXCHANGE'
                AND d.created_at < ?
               WHERE e.status = 'WAITING'
               GROUP BY e.id
               ORDER BY e.created_at ASC"#,
        )
        .bind(&cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbSettlement::into_domain).collect()
    }

    async fn approve_exchange(
        &self,
        id: ExchangeId,
        approve_on: YearMonth,
    ) -> Result<Exchange, RepoError> {
        let id_str = id.to_string();
        let cutoff = approve_on.start().to_rfc3339();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        let row: Option<DbExchange> = sqlx::query_as(
            r#"SELECT id, member_id, amount, month, status, reject_reason, created_at, processed_at
               FROM exchanges WHERE id = ?"#,
        )
        .bind(&id_str)
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let mut exchange = row.ok_or(RepoError::NotFound)?.into_domain()?;
        let member_id_str = exchange.member_id.to_string();

        let settled: DbTotal = sqlx::query_as(
            r#"SELECT COALESCE(SUM(point), 0) AS total FROM donations
               WHERE creator_id = ? AND status = 'WAITING_FOR_EXCHANGE' AND created_at < ?"#,
        )
        .bind(&member_id_str)
        .bind(&cutoff)
        .fetch_one(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        // Domain transition first; rejects non-waiting exchanges.
        exchange.approve(settled.total).map_err(RepoError::Domain)?;

        sqlx::query(
            r#"UPDATE donations SET status = 'EXCHANGED'
               WHERE creator_id = ? AND status = 'WAITING_FOR_EXCHANGE' AND created_at < ?"#,
        )
        .bind(&member_id_str)
        .bind(&cutoff)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        sqlx::query(
            r#"UPDATE exchanges SET status = 'APPROVED', amount = ?, processed_at = ? WHERE id = ?"#,
        )
        .bind(exchange.amount)
        .bind(exchange.processed_at.map(|dt| dt.to_rfc3339()))
        .bind(&id_str)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(exchange)
    }

    async fn reject_exchange(
        &self,
        id: ExchangeId,
        reason: String,
    ) -> Result<Exchange, RepoError> {
        let id_str = id.to_string();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        let row: Option<DbExchange> = sqlx::query_as(
            r#"SELECT id, member_id, amount, month, status, reject_reason, created_at, processed_at
               FROM exchanges WHERE id = ?"#,
        )
        .bind(&id_str)
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let mut exchange = row.ok_or(RepoError::NotFound)?.into_domain()?;
        exchange.reject(reason).map_err(RepoError::Domain)?;

        sqlx::query(
            r#"UPDATE exchanges SET status = 'REJECTED', reject_reason = ?, processed_at = ? WHERE id = ?"#,
        )
        .bind(&exchange.reject_reason)
        .bind(exchange.processed_at.map(|dt| dt.to_rfc3339()))
        .bind(&id_str)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(exchange)
    }

    async fn create_payment(&self, payment: Payment) -> Result<Payment, RepoError> {
        sqlx::query(
            r#"INSERT INTO payments (id, merchant_uid, item_price, item_name, status, imp_uid, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(payment.id.to_string())
        .bind(payment.merchant_uid.to_string())
        .bind(payment.item_price)
        .bind(&payment.item_name)
        .bind(payment.status.to_string())
        .bind(&payment.imp_uid)
        .bind(payment.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(payment)
    }

    async fn find_payment_by_merchant_uid(
        &self,
        merchant_uid: Uuid,
    ) -> Result<Option<Payment>, RepoError> {
        let row: Option<DbPayment> = sqlx::query_as(
            r#"SELECT id, merchant_uid, item_price, item_name, status, imp_uid, created_at
               FROM payments WHERE merchant_uid = ?"#,
        )
        .bind(merchant_uid.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbPayment::into_domain).transpose()
    }

    async fn update_payment_status(
        &self,
        merchant_uid: Uuid,
        status: PaymentStatus,
        imp_uid: Option<String>,
    ) -> Result<Payment, RepoError> {
        let merchant_uid_str = merchant_uid.to_string();

        let result = sqlx::query(
            r#"UPDATE payments SET status = ?, imp_uid = COALESCE(?, imp_uid) WHERE merchant_uid = ?"#,
        )
        .bind(status.to_string())
        .bind(&imp_uid)
        .bind(&merchant_uid_str)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        let row: Option<DbPayment> = sqlx::query_as(
            r#"SELECT id, merchant_uid, item_price, item_name, status, imp_uid, created_at
               FROM payments WHERE merchant_uid = ?"#,
        )
        .bind(&merchant_uid_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.ok_or(RepoError::NotFound)?.into_domain()
    }
}
