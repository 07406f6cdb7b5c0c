//! Tipjar Application Service
//!
//! Orchestrates domain operations through the repository and gateway ports.
//! Contains NO infrastructure logic - pure business orchestration.

use std::collections::HashMap;

use chrono::Utc;
use tipjar_types::{
    AccountRegisterRequest, AccountStatus, AdminExchangeResponse, AppError, BankAccount, Donation,
    DonationId, DonationMessageRequest, DonationRequest, DonationResponse, DomainError, Exchange,
    ExchangeApproveRequest, ExchangeRejectRequest, ExchangeRequest, ExchangeResponse, Member,
    MemberDetailResponse, MemberId, MemberResponse, Message, Payment, PaymentGateway,
    PaymentRequest, PaymentResponse, PaymentStatus, PaymentVerifyRequest, PlatformRepository,
    PointResponse, RefundRequest, RequestingAccountResponse, SignupRequest, SignupResponse,
    UpdateProfileRequest, YearMonth,
    domain::member::{validate_bio, validate_nickname},
};

use tipjar_repo::security;

/// Application service for the tipjar platform.
///
/// Generic over `R: PlatformRepository` and `G: PaymentGateway` - the adapters
/// are injected at compile time. This enables:
/// - Swapping repositories without code changes
/// - Testing with in-memory repo and a mock gateway
/// - Compile-time checks for port implementation
pub struct TipService<R: PlatformRepository, G: PaymentGateway> {
    repo: R,
    gateway: G,
    link_token_secret: String,
}

impl<R: PlatformRepository, G: PaymentGateway> TipService<R, G> {
    /// Creates a new service with the given adapters.
    pub fn new(repo: R, gateway: G, link_token_secret: impl Into<String>) -> Self {
        Self {
            repo,
            gateway,
            link_token_secret: link_token_secret.into(),
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Returns a reference to the underlying payment gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Member Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Signs up a new member and issues an access token.
    ///
    /// An email that is already registered fails with a linking token so the
    /// client can attach the new OAuth2 identity to the existing member.
    pub async fn signup(&self, req: SignupRequest) -> Result<SignupResponse, AppError> {
        if self.repo.find_member_by_email(&req.email).await?.is_some() {
            let link_token = security::sign_link_token(&req.email, &self.link_token_secret);
            return Err(DomainError::AlreadyRegistered { link_token }.into());
        }

        if self
            .repo
            .find_member_by_page_name(&req.page_name)
            .await?
            .is_some()
        {
            return Err(DomainError::DuplicatePageName.into());
        }

        let member = Member::new(req.email, req.nickname, req.page_name)?;
        let (member, access_token) = self.repo.create_member(member).await?;

        Ok(SignupResponse {
            member_id: member.id,
            page_name: member.page_name,
            access_token,
        })
    }

    /// Public view of a creator's page.
    pub async fn member_page(&self, page_name: &str) -> Result<MemberResponse, AppError> {
        let member = self.find_by_page_name(page_name).await?;
        Ok(MemberResponse::from(&member))
    }

    /// Updates the authenticated member's nickname and/or bio.
    pub async fn update_profile(
        &self,
        member_id: MemberId,
        req: UpdateProfileRequest,
    ) -> Result<MemberDetailResponse, AppError> {
        if let Some(nickname) = &req.nickname {
            validate_nickname(nickname)?;
        }
        if let Some(bio) = &req.bio {
            validate_bio(bio)?;
        }

        let member = self
            .repo
            .update_profile(member_id, req.nickname, req.bio)
            .await?;
        Ok(MemberDetailResponse::from(&member))
    }

    /// Current exchangeable point balance of a member.
    pub async fn my_point(&self, member_id: MemberId) -> Result<PointResponse, AppError> {
        let point = self.repo.waiting_total_point(member_id).await?;
        Ok(PointResponse { point })
    }

    /// Submits a payout bank account for admin review.
    ///
    /// The holder name is checked against the gateway before anything is
    /// stored.
    pub async fn register_account(
        &self,
        member_id: MemberId,
        req: AccountRegisterRequest,
    ) -> Result<(), AppError> {
        let info = self
            .gateway
            .request_holder_name(&req.bank_code, &req.number)
            .await
            .map_err(DomainError::from)?;

        if info.bank_holder != req.holder {
            return Err(DomainError::AccountInvalid.into());
        }

        let account = BankAccount {
            holder: req.holder,
            number: req.number,
            bank_code: req.bank_code,
            bankbook_image_url: req.bankbook_image_url,
        };

        self.repo.submit_account(member_id, account).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Donation Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Donates points to a creator's page. The donator is optional so
    /// anonymous visitors can donate too.
    pub async fn donate(
        &self,
        req: DonationRequest,
        donator_id: Option<MemberId>,
    ) -> Result<DonationResponse, AppError> {
        let creator = self.find_by_page_name(&req.page_name).await?;

        let message = req
            .message
            .map(|m| Message::new(m.name, m.text, m.secret));

        let donation = Donation::new(creator.id, donator_id, req.point, message)?;
        let donation = self.repo.create_donation(donation).await?;

        Ok(donation_response(&donation, true))
    }

    /// Attaches a message to an existing donation.
    pub async fn add_donation_message(
        &self,
        donation_id: DonationId,
        req: DonationMessageRequest,
    ) -> Result<(), AppError> {
        if self.repo.find_donation(donation_id).await?.is_none() {
            return Err(DomainError::DonationNotFound.into());
        }

        let message = Message::new(req.name, req.text, req.secret);
        self.repo.add_donation_message(donation_id, message).await?;
        Ok(())
    }

    /// Donations shown on a creator's page, newest first.
    ///
    /// Secret messages are stripped unless the viewer is the creator.
    pub async fn page_donations(
        &self,
        page_name: &str,
        viewer_id: Option<MemberId>,
    ) -> Result<Vec<DonationResponse>, AppError> {
        let creator = self.find_by_page_name(page_name).await?;
        let is_owner = viewer_id == Some(creator.id);

        let donations = self.repo.list_donations_for_creator(creator.id).await?;

        Ok(donations
            .iter()
            .map(|d| donation_response(d, is_owner))
            .collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Exchange Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Requests a payout of the member's accumulated points.
    pub async fn request_exchange(
        &self,
        member: &Member,
        req: ExchangeRequest,
    ) -> Result<ExchangeResponse, AppError> {
        if !member.can_exchange() {
            return Err(DomainError::AccountNotRegistered.into());
        }

        if self.repo.find_waiting_exchange(member.id).await?.is_some() {
            return Err(DomainError::ExchangeAlreadyRequested.into());
        }

        let month = req
            .month
            .unwrap_or_else(|| YearMonth::containing(Utc::now()));

        let amount = self
            .repo
            .exchange_amount_from_donations(member.id, month)
            .await?;
        if amount <= 0 {
            return Err(DomainError::NothingToExchange.into());
        }

        let exchange = Exchange::new(member.id, amount, month);
        let exchange = self.repo.create_exchange(exchange).await?;

        Ok(exchange_response(&exchange))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admin Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Bank-account registrations waiting for review.
    pub async fn requesting_accounts(
        &self,
    ) -> Result<Vec<RequestingAccountResponse>, AppError> {
        let members = self.repo.list_requesting_accounts().await?;

        Ok(members
            .into_iter()
            .filter_map(|m| {
                let account = m.account?;
                Some(RequestingAccountResponse {
                    member_id: m.id,
                    email: m.email,
                    nickname: m.nickname,
                    page_name: m.page_name,
                    account_holder: account.holder,
                    account_number: account.number,
                    bank: account.bank_code,
                    bankbook_image_url: account.bankbook_image_url,
                })
            })
            .collect())
    }

    /// Approves a pending bank-account registration.
    pub async fn approve_account(&self, member_id: MemberId) -> Result<(), AppError> {
        self.repo
            .update_account_status(member_id, AccountStatus::Registered, None)
            .await?;
        Ok(())
    }

    /// Rejects a pending bank-account registration with a reason.
    pub async fn reject_account(
        &self,
        member_id: MemberId,
        reason: String,
    ) -> Result<(), AppError> {
        self.repo
            .update_account_status(member_id, AccountStatus::Rejected, Some(reason))
            .await?;
        Ok(())
    }

    /// Waiting payout requests, annotated with what each would settle at
    /// under the current month's approval cutoff.
    pub async fn waiting_exchanges(&self) -> Result<Vec<AdminExchangeResponse>, AppError> {
        let approve_on = YearMonth::containing(Utc::now());

        let exchanges = self.repo.list_waiting_exchanges().await?;
        let settlements: HashMap<_, _> = self
            .repo
            .pending_settlement_amounts(approve_on)
            .await?
            .into_iter()
            .map(|s| (s.exchange_id, s.amount))
            .collect();

        let mut out = Vec::with_capacity(exchanges.len());
        for exchange in exchanges {
            let member = self
                .repo
                .find_member(exchange.member_id)
                .await?
                .ok_or(DomainError::MemberNotFound(exchange.member_id))?;

            out.push(AdminExchangeResponse {
                exchange_id: exchange.id,
                page_name: member.page_name,
                nickname: member.nickname,
                requested_amount: exchange.amount,
                settlement_amount: settlements.get(&exchange.id).copied().unwrap_or(0),
                month: exchange.month,
                created_at: exchange.created_at,
            });
        }
        Ok(out)
    }

    /// Approves a creator's waiting exchange, settling it under the approval
    /// month's cutoff.
    pub async fn approve_exchange(
        &self,
        page_name: &str,
        req: ExchangeApproveRequest,
    ) -> Result<ExchangeResponse, AppError> {
        let member = self.find_by_page_name(page_name).await?;
        let exchange = self
            .repo
            .find_waiting_exchange(member.id)
            .await?
            .ok_or(DomainError::ExchangeNotFound)?;

        let approve_on = req
            .month
            .unwrap_or_else(|| YearMonth::containing(Utc::now()));

        let exchange = self.repo.approve_exchange(exchange.id, approve_on).await?;

        tracing::info!(
            exchange_id = %exchange.id,
            amount = exchange.amount,
            "Exchange approved"
        );
        Ok(exchange_response(&exchange))
    }

    /// Rejects a creator's waiting exchange, leaving donations untouched.
    pub async fn reject_exchange(
        &self,
        req: ExchangeRejectRequest,
    ) -> Result<ExchangeResponse, AppError> {
        let member = self.find_by_page_name(&req.page_name).await?;
        let exchange = self
            .repo
            .find_waiting_exchange(member.id)
            .await?
            .ok_or(DomainError::ExchangeNotFound)?;

        let exchange = self.repo.reject_exchange(exchange.id, req.reason).await?;
        Ok(exchange_response(&exchange))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payment Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts a point top-up payment; the merchant UID is handed to the
    /// client for gateway checkout.
    pub async fn create_payment(&self, req: PaymentRequest) -> Result<PaymentResponse, AppError> {
        let payment = Payment::new(req.item_price, req.item_name)?;
        let payment = self.repo.create_payment(payment).await?;
        Ok(payment_response(&payment))
    }

    /// Verifies a payment against the gateway after client-side checkout.
    ///
    /// Amount or status mismatches mark the payment failed.
    pub async fn verify_payment(
        &self,
        req: PaymentVerifyRequest,
    ) -> Result<PaymentResponse, AppError> {
        let payment = self
            .repo
            .find_payment_by_merchant_uid(req.merchant_uid)
            .await?
            .ok_or(DomainError::PaymentNotFound)?;

        let info = self
            .gateway
            .request_payment_info(req.merchant_uid)
            .await
            .map_err(DomainError::from)?;

        if info.status != PaymentStatus::Paid || info.amount != payment.item_price {
            self.repo
                .update_payment_status(req.merchant_uid, PaymentStatus::Failed, Some(info.imp_uid))
                .await?;
            return Err(DomainError::PaymentMismatch(format!(
                "gateway reports {} at {}, expected PAID at {}",
                info.status, info.amount, payment.item_price
            ))
            .into());
        }

        let payment = self
            .repo
            .update_payment_status(req.merchant_uid, PaymentStatus::Paid, Some(info.imp_uid))
            .await?;
        Ok(payment_response(&payment))
    }

    /// Refunds a payment. The guarantee window is checked before any
    /// outbound gateway call.
    pub async fn refund_payment(&self, req: RefundRequest) -> Result<PaymentResponse, AppError> {
        let payment = self
            .repo
            .find_payment_by_merchant_uid(req.merchant_uid)
            .await?
            .ok_or(DomainError::PaymentNotFound)?;

        if !payment.within_guarantee_window(Utc::now()) {
            return Err(DomainError::RefundGuaranteeExpired.into());
        }

        let info = self
            .gateway
            .request_payment_refund(req.merchant_uid)
            .await
            .map_err(DomainError::from)?;

        let payment = self
            .repo
            .update_payment_status(req.merchant_uid, PaymentStatus::Cancelled, Some(info.imp_uid))
            .await?;
        Ok(payment_response(&payment))
    }

    // ─────────────────────────────────────────────────────────────────────────

    async fn find_by_page_name(&self, page_name: &str) -> Result<Member, AppError> {
        self.repo
            .find_member_by_page_name(page_name)
            .await?
            .ok_or_else(|| DomainError::PageNotFound(page_name.to_string()).into())
    }
}

fn donation_response(donation: &Donation, is_owner: bool) -> DonationResponse {
    let message = donation.message.as_ref().and_then(|m| {
        // Secret messages are visible to the creator only.
        if m.secret && !is_owner {
            return None;
        }
        Some(DonationMessageRequest {
            name: m.name.clone(),
            text: m.text.clone(),
            secret: m.secret,
        })
    });

    DonationResponse {
        donation_id: donation.id,
        point: donation.point,
        status: donation.status,
        message,
        created_at: donation.created_at,
    }
}

fn exchange_response(exchange: &Exchange) -> ExchangeResponse {
    ExchangeResponse {
        exchange_id: exchange.id,
        amount: exchange.amount,
        month: exchange.month,
        status: exchange.status,
        reject_reason: exchange.reject_reason.clone(),
        created_at: exchange.created_at,
    }
}

fn payment_response(payment: &Payment) -> PaymentResponse {
    PaymentResponse {
        merchant_uid: payment.merchant_uid,
        item_price: payment.item_price,
        item_name: payment.item_name.clone(),
        status: payment.status,
        created_at: payment.created_at,
    }
}
