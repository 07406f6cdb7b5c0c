//! TipService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration;
    use uuid::Uuid;

    use tipjar_repo::security;
    use tipjar_types::{
        AccountInfo, AccountRegisterRequest, AccountStatus, AppError, BankAccount, Donation,
        DonationId, DonationMessageRequest, DonationRequest, DomainError, Exchange, ExchangeId,
        ExchangeRejectRequest, ExchangeRequest, GatewayError, Member, MemberId, Message, Payment,
        PaymentGateway, PaymentInfo, PaymentRequest, PaymentStatus, PaymentVerifyRequest,
        PlatformRepository, RefundRequest, RepoError, SettlementAmount, SignupRequest,
        UpdateProfileRequest, YearMonth,
    };

    use crate::TipService;

    /// Simple in-memory repository for testing the service layer.
    pub struct MockRepo {
        members: Mutex<HashMap<MemberId, Member>>,
        tokens: Mutex<HashMap<String, MemberId>>,
        donations: Mutex<Vec<Donation>>,
        exchanges: Mutex<Vec<Exchange>>,
        payments: Mutex<Vec<Payment>>,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self {
                members: Mutex::new(HashMap::new()),
                tokens: Mutex::new(HashMap::new()),
                donations: Mutex::new(Vec::new()),
                exchanges: Mutex::new(Vec::new()),
                payments: Mutex::new(Vec::new()),
            }
        }

        /// Shifts a payment's creation time into the past.
        pub fn backdate_payment(&self, merchant_uid: Uuid, days: i64) {
            let mut payments = self.payments.lock().unwrap();
            if let Some(p) = payments.iter_mut().find(|p| p.merchant_uid == merchant_uid) {
                p.created_at -= Duration::days(days);
            }
        }
    }

    #[async_trait]
    impl PlatformRepository for MockRepo {
        async fn create_member(&self, member: Member) -> Result<(Member, String), RepoError> {
            let token = security::generate_access_token();
            self.tokens
                .lock()
                .unwrap()
                .insert(security::hash_access_token(&token), member.id);
            self.members
                .lock()
                .unwrap()
                .insert(member.id, member.clone());
            Ok((member, token))
        }

        async fn find_member(&self, id: MemberId) -> Result<Option<Member>, RepoError> {
            Ok(self.members.lock().unwrap().get(&id).cloned())
        }

        async fn find_member_by_page_name(
            &self,
            page_name: &str,
        ) -> Result<Option<Member>, RepoError> {
            Ok(self
                .members
                .lock()
                .unwrap()
                .values()
                .find(|m| m.page_name == page_name)
                .cloned())
        }

        async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, RepoError> {
            Ok(self
                .members
                .lock()
                .unwrap()
                .values()
                .find(|m| m.email == email)
                .cloned())
        }

        async fn verify_access_token_hash(
            &self,
            token_hash: &str,
        ) -> Result<Option<Member>, RepoError> {
            let id = self.tokens.lock().unwrap().get(token_hash).copied();
            match id {
                Some(id) => self.find_member(id).await,
                None => Ok(None),
            }
        }

        async fn update_profile(
            &self,
            id: MemberId,
            nickname: Option<String>,
            bio: Option<String>,
        ) -> Result<Member, RepoError> {
            let mut members = self.members.lock().unwrap();
            let member = members.get_mut(&id).ok_or(RepoError::NotFound)?;
            if let Some(nickname) = nickname {
                member.nickname = nickname;
            }
            if let Some(bio) = bio {
                member.bio = Some(bio);
            }
            Ok(member.clone())
        }

        async fn submit_account(
            &self,
            id: MemberId,
            account: BankAccount,
        ) -> Result<(), RepoError> {
            let mut members = self.members.lock().unwrap();
            let member = members.get_mut(&id).ok_or(RepoError::NotFound)?;
            member.account = Some(account);
            member.account_status = AccountStatus::Requesting;
            member.account_reject_reason = None;
            Ok(())
        }

        async fn update_account_status(
            &self,
            id: MemberId,
            status: AccountStatus,
            reason: Option<String>,
        ) -> Result<(), RepoError> {
            let mut members = self.members.lock().unwrap();
            let member = members.get_mut(&id).ok_or(RepoError::NotFound)?;
            member.account_status = status;
            member.account_reject_reason = reason;
            Ok(())
        }

        async fn list_requesting_accounts(&self) -> Result<Vec<Member>, RepoError> {
            Ok(self
                .members
                .lock()
                .unwrap()
                .values()
                .filter(|m| m.account_status == AccountStatus::Requesting)
                .cloned()
                .collect())
        }

        async fn create_donation(&self, donation: Donation) -> Result<Donation, RepoError> {
            self.donations.lock().unwrap().push(donation.clone());
            Ok(donation)
        }

        async fn find_donation(&self, id: DonationId) -> Result<Option<Donation>, RepoError> {
            Ok(self
                .donations
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.id == id)
                .cloned())
        }

        async fn add_donation_message(
            &self,
            id: DonationId,
            message: Message,
        ) -> Result<(), RepoError> {
            let mut donations = self.donations.lock().unwrap();
            let donation = donations
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or(RepoError::NotFound)?;
            donation.message = Some(message);
            Ok(())
        }

        async fn list_donations_for_creator(
            &self,
            creator_id: MemberId,
        ) -> Result<Vec<Donation>, RepoError> {
            let mut out: Vec<_> = self
                .donations
                .lock()
                .unwrap()
                .iter()
                .filter(|d| d.creator_id == creator_id)
                .cloned()
                .collect();
            out.reverse();
            Ok(out)
        }

        async fn waiting_total_point(&self, creator_id: MemberId) -> Result<i64, RepoError> {
            Ok(self
                .donations
                .lock()
                .unwrap()
                .iter()
                .filter(|d| {
                    d.creator_id == creator_id
                        && d.status == tipjar_types::DonationStatus::WaitingForExchange
                })
                .map(|d| d.point)
                .sum())
        }

        async fn exchanged_total_point(&self, creator_id: MemberId) -> Result<i64, RepoError> {
            Ok(self
                .donations
                .lock()
                .unwrap()
                .iter()
                .filter(|d| {
                    d.creator_id == creator_id
                        && d.status == tipjar_types::DonationStatus::Exchanged
                })
                .map(|d| d.point)
                .sum())
        }

        async fn find_donations_to_exchange(
            &self,
            creator_id: MemberId,
            month: YearMonth,
        ) -> Result<Vec<Donation>, RepoError> {
            let cutoff = month.start_of_next();
            Ok(self
                .donations
                .lock()
                .unwrap()
                .iter()
                .filter(|d| {
                    d.creator_id == creator_id
                        && d.status == tipjar_types::DonationStatus::WaitingForExchange
                        && d.created_at < cutoff
                })
                .cloned()
                .collect())
        }

        async fn exchange_amount_from_donations(
            &self,
            creator_id: MemberId,
            month: YearMonth,
        ) -> Result<i64, RepoError> {
            Ok(self
                .find_donations_to_exchange(creator_id, month)
                .await?
                .iter()
                .map(|d| d.point)
                .sum())
        }

        async fn create_exchange(&self, exchange: Exchange) -> Result<Exchange, RepoError> {
            self.exchanges.lock().unwrap().push(exchange.clone());
            Ok(exchange)
        }

        async fn find_waiting_exchange(
            &self,
            member_id: MemberId,
        ) -> Result<Option<Exchange>, RepoError> {
            Ok(self
                .exchanges
                .lock()
                .unwrap()
                .iter()
                .find(|e| {
                    e.member_id == member_id
                        && e.status == tipjar_types::ExchangeStatus::Waiting
                })
                .cloned())
        }

        async fn list_waiting_exchanges(&self) -> Result<Vec<Exchange>, RepoError> {
            Ok(self
                .exchanges
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.status == tipjar_types::ExchangeStatus::Waiting)
                .cloned()
                .collect())
        }

        async fn pending_settlement_amounts(
            &self,
            approve_on: YearMonth,
        ) -> Result<Vec<SettlementAmount>, RepoError> {
            let cutoff = approve_on.start();
            let donations = self.donations.lock().unwrap();
            Ok(self
                .exchanges
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.status == tipjar_types::ExchangeStatus::Waiting)
                .map(|e| SettlementAmount {
                    exchange_id: e.id,
                    amount: donations
                        .iter()
                        .filter(|d| {
                            d.creator_id == e.member_id
                                && d.status == tipjar_types::DonationStatus::WaitingForExchange
                                && d.created_at < cutoff
                        })
                        .map(|d| d.point)
                        .sum(),
                })
                .collect())
        }

        async fn approve_exchange(
            &self,
            id: ExchangeId,
            approve_on: YearMonth,
        ) -> Result<Exchange, RepoError> {
            let cutoff = approve_on.start();
            let mut exchanges = self.exchanges.lock().unwrap();
            let exchange = exchanges
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or(RepoError::NotFound)?;

            let mut donations = self.donations.lock().unwrap();
            let settled: i64 = donations
                .iter()
                .filter(|d| {
                    d.creator_id == exchange.member_id
                        && d.status == tipjar_types::DonationStatus::WaitingForExchange
                        && d.created_at < cutoff
                })
                .map(|d| d.point)
                .sum();

            exchange.approve(settled).map_err(RepoError::Domain)?;

            for d in donations.iter_mut() {
                if d.creator_id == exchange.member_id
                    && d.status == tipjar_types::DonationStatus::WaitingForExchange
                    && d.created_at < cutoff
                {
                    d.status = tipjar_types::DonationStatus::Exchanged;
                }
            }
            Ok(exchange.clone())
        }

        async fn reject_exchange(
            &self,
            id: ExchangeId,
            reason: String,
        ) -> Result<Exchange, RepoError> {
            let mut exchanges = self.exchanges.lock().unwrap();
            let exchange = exchanges
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or(RepoError::NotFound)?;
            exchange.reject(reason).map_err(RepoError::Domain)?;
            Ok(exchange.clone())
        }

        async fn create_payment(&self, payment: Payment) -> Result<Payment, RepoError> {
            self.payments.lock().unwrap().push(payment.clone());
            Ok(payment)
        }

        async fn find_payment_by_merchant_uid(
            &self,
            merchant_uid: Uuid,
        ) -> Result<Option<Payment>, RepoError> {
            Ok(self
                .payments
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.merchant_uid == merchant_uid)
                .cloned())
        }

        async fn update_payment_status(
            &self,
            merchant_uid: Uuid,
            status: PaymentStatus,
            imp_uid: Option<String>,
        ) -> Result<Payment, RepoError> {
            let mut payments = self.payments.lock().unwrap();
            let payment = payments
                .iter_mut()
                .find(|p| p.merchant_uid == merchant_uid)
                .ok_or(RepoError::NotFound)?;
            payment.status = status;
            if imp_uid.is_some() {
                payment.imp_uid = imp_uid;
            }
            Ok(payment.clone())
        }
    }

    /// Scripted gateway; counts outbound calls so tests can prove a
    /// short-circuit never left the process.
    pub struct MockGateway {
        holder_name: String,
        payment_status: PaymentStatus,
        payment_amount: i64,
        calls: AtomicUsize,
    }

    impl MockGateway {
        pub fn new(holder_name: &str, payment_status: PaymentStatus, payment_amount: i64) -> Self {
            Self {
                holder_name: holder_name.to_string(),
                payment_status,
                payment_amount,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn request_payment_info(
            &self,
            merchant_uid: Uuid,
        ) -> Result<PaymentInfo, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PaymentInfo {
                merchant_uid,
                status: self.payment_status,
                amount: self.payment_amount,
                item_name: "points".to_string(),
                imp_uid: "imp_test_1".to_string(),
            })
        }

        async fn request_payment_refund(
            &self,
            merchant_uid: Uuid,
        ) -> Result<PaymentInfo, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PaymentInfo {
                merchant_uid,
                status: PaymentStatus::Cancelled,
                amount: self.payment_amount,
                item_name: "points".to_string(),
                imp_uid: "imp_test_1".to_string(),
            })
        }

        async fn request_holder_name(
            &self,
            _bank_code: &str,
            _bank_num: &str,
        ) -> Result<AccountInfo, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccountInfo {
                bank_holder: self.holder_name.clone(),
            })
        }
    }

    fn service() -> TipService<MockRepo, MockGateway> {
        service_with_gateway(MockGateway::new("Holder", PaymentStatus::Paid, 10_000))
    }

    fn service_with_gateway(gateway: MockGateway) -> TipService<MockRepo, MockGateway> {
        TipService::new(MockRepo::new(), gateway, "test-link-secret")
    }

    fn signup_req(page_name: &str) -> SignupRequest {
        SignupRequest {
            email: format!("{page_name}@example.com"),
            nickname: "Creator".to_string(),
            page_name: page_name.to_string(),
        }
    }

    async fn registered_creator(
        service: &TipService<MockRepo, MockGateway>,
        page_name: &str,
    ) -> Member {
        let resp = service.signup(signup_req(page_name)).await.unwrap();
        service
            .register_account(
                resp.member_id,
                AccountRegisterRequest {
                    holder: "Holder".to_string(),
                    number: "110-123-456789".to_string(),
                    bank_code: "004".to_string(),
                    bankbook_image_url: None,
                },
            )
            .await
            .unwrap();
        service.approve_account(resp.member_id).await.unwrap();
        service
            .repo()
            .find_member(resp.member_id)
            .await
            .unwrap()
            .unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Signup
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_signup_issues_token() {
        let service = service();

        let resp = service.signup(signup_req("alice")).await.unwrap();

        assert_eq!(resp.page_name, "alice");
        assert!(resp.access_token.starts_with("tk_"));
    }

    #[tokio::test]
    async fn test_signup_duplicate_email_carries_link_token() {
        let service = service();
        service.signup(signup_req("alice")).await.unwrap();

        let mut req = signup_req("alice-two");
        req.email = "alice@example.com".to_string();
        let err = service.signup(req).await.unwrap_err();

        assert_eq!(err.error_code(), "auth-004");
        match err {
            AppError::Domain(DomainError::AlreadyRegistered { link_token }) => {
                assert!(!link_token.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_signup_duplicate_page_name_fails() {
        let service = service();
        service.signup(signup_req("alice")).await.unwrap();

        let mut req = signup_req("alice");
        req.email = "other@example.com".to_string();
        let err = service.signup(req).await.unwrap_err();

        assert_eq!(err.error_code(), "member-005");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Profile & account
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_update_profile_rejects_long_bio() {
        let service = service();
        let resp = service.signup(signup_req("alice")).await.unwrap();

        let err = service
            .update_profile(
                resp.member_id,
                UpdateProfileRequest {
                    nickname: None,
                    bio: Some("x".repeat(501)),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "member-004");
    }

    #[tokio::test]
    async fn test_register_account_holder_mismatch_fails() {
        let service = service();
        let resp = service.signup(signup_req("alice")).await.unwrap();

        let err = service
            .register_account(
                resp.member_id,
                AccountRegisterRequest {
                    holder: "Somebody Else".to_string(),
                    number: "110-123-456789".to_string(),
                    bank_code: "004".to_string(),
                    bankbook_image_url: None,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "member-006");
    }

    #[tokio::test]
    async fn test_account_review_round_trip() {
        let service = service();
        let creator = registered_creator(&service, "alice").await;

        assert_eq!(creator.account_status, AccountStatus::Registered);
        assert!(creator.can_exchange());

        // Approved accounts no longer show up in the review queue.
        assert!(service.requesting_accounts().await.unwrap().is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Donations
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_donate_unknown_page_fails() {
        let service = service();

        let err = service
            .donate(
                DonationRequest {
                    page_name: "nobody".to_string(),
                    point: 1000,
                    message: None,
                },
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "member-008");
    }

    #[tokio::test]
    async fn test_donate_accumulates_points() {
        let service = service();
        let creator = registered_creator(&service, "alice").await;

        for point in [1000, 2500] {
            service
                .donate(
                    DonationRequest {
                        page_name: "alice".to_string(),
                        point,
                        message: None,
                    },
                    None,
                )
                .await
                .unwrap();
        }

        let balance = service.my_point(creator.id).await.unwrap();
        assert_eq!(balance.point, 3500);
    }

    #[tokio::test]
    async fn test_secret_message_masked_for_visitors() {
        let service = service();
        let creator = registered_creator(&service, "alice").await;

        service
            .donate(
                DonationRequest {
                    page_name: "alice".to_string(),
                    point: 1000,
                    message: Some(DonationMessageRequest {
                        name: "fan".to_string(),
                        text: "for your eyes only".to_string(),
                        secret: true,
                    }),
                },
                None,
            )
            .await
            .unwrap();

        let public = service.page_donations("alice", None).await.unwrap();
        assert_eq!(public.len(), 1);
        assert!(public[0].message.is_none());

        let own = service
            .page_donations("alice", Some(creator.id))
            .await
            .unwrap();
        assert_eq!(
            own[0].message.as_ref().map(|m| m.text.as_str()),
            Some("for your eyes only")
        );
    }

    #[tokio::test]
    async fn test_add_message_to_missing_donation_fails() {
        let service = service();

        let err = service
            .add_donation_message(
                DonationId::new(),
                DonationMessageRequest {
                    name: "fan".to_string(),
                    text: "hello".to_string(),
                    secret: false,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "donation-001");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Exchanges
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_exchange_requires_registered_account() {
        let service = service();
        let resp = service.signup(signup_req("alice")).await.unwrap();
        let member = service
            .repo()
            .find_member(resp.member_id)
            .await
            .unwrap()
            .unwrap();

        let err = service
            .request_exchange(&member, ExchangeRequest::default())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "member-007");
    }

    #[tokio::test]
    async fn test_exchange_with_no_points_fails() {
        let service = service();
        let creator = registered_creator(&service, "alice").await;

        let err = service
            .request_exchange(&creator, ExchangeRequest::default())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "exchange-004");
    }

    #[tokio::test]
    async fn test_second_waiting_exchange_fails() {
        let service = service();
        let creator = registered_creator(&service, "alice").await;
        service
            .donate(
                DonationRequest {
                    page_name: "alice".to_string(),
                    point: 3000,
                    message: None,
                },
                None,
            )
            .await
            .unwrap();

        service
            .request_exchange(&creator, ExchangeRequest::default())
            .await
            .unwrap();
        let err = service
            .request_exchange(&creator, ExchangeRequest::default())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "exchange-003");
    }

    #[tokio::test]
    async fn test_reject_exchange_records_reason() {
        let service = service();
        let creator = registered_creator(&service, "alice").await;
        service
            .donate(
                DonationRequest {
                    page_name: "alice".to_string(),
                    point: 3000,
                    message: None,
                },
                None,
            )
            .await
            .unwrap();
        service
            .request_exchange(&creator, ExchangeRequest::default())
            .await
            .unwrap();

        let rejected = service
            .reject_exchange(ExchangeRejectRequest {
                page_name: "alice".to_string(),
                reason: "missing paperwork".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(rejected.reject_reason.as_deref(), Some("missing paperwork"));
        // The donation stays exchangeable after a rejection.
        assert_eq!(service.my_point(creator.id).await.unwrap().point, 3000);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_verify_payment_success() {
        let service = service();
        let payment = service
            .create_payment(PaymentRequest {
                item_price: 10_000,
                item_name: "10000 points".to_string(),
            })
            .await
            .unwrap();

        let verified = service
            .verify_payment(PaymentVerifyRequest {
                merchant_uid: payment.merchant_uid,
            })
            .await
            .unwrap();

        assert_eq!(verified.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_verify_payment_amount_mismatch_marks_failed() {
        let service = service_with_gateway(MockGateway::new("Holder", PaymentStatus::Paid, 999));
        let payment = service
            .create_payment(PaymentRequest {
                item_price: 10_000,
                item_name: "10000 points".to_string(),
            })
            .await
            .unwrap();

        let err = service
            .verify_payment(PaymentVerifyRequest {
                merchant_uid: payment.merchant_uid,
            })
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "payment-002");
        let stored = service
            .repo()
            .find_payment_by_merchant_uid(payment.merchant_uid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_refund_inside_guarantee_window() {
        let service = service();
        let payment = service
            .create_payment(PaymentRequest {
                item_price: 10_000,
                item_name: "10000 points".to_string(),
            })
            .await
            .unwrap();

        let refunded = service
            .refund_payment(RefundRequest {
                merchant_uid: payment.merchant_uid,
            })
            .await
            .unwrap();

        assert_eq!(refunded.status, PaymentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_refund_after_guarantee_never_reaches_gateway() {
        let gateway = MockGateway::new("Holder", PaymentStatus::Paid, 10_000);
        let service = service_with_gateway(gateway);
        let payment = service
            .create_payment(PaymentRequest {
                item_price: 10_000,
                item_name: "10000 points".to_string(),
            })
            .await
            .unwrap();
        service.repo().backdate_payment(payment.merchant_uid, 8);

        let err = service
            .refund_payment(RefundRequest {
                merchant_uid: payment.merchant_uid,
            })
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "refund-003");
        assert_eq!(service.gateway().calls(), 0);
    }
}
