//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use tipjar_types::{
        AccountStatus, BankAccount, Donation, DonationId, DonationStatus, DomainError, Exchange,
        Member, MemberId, Message, Payment, PaymentStatus, PlatformRepository, RepoError,
        YearMonth,
    };

    use crate::SqliteRepo;
    use crate::security;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    async fn create_member(repo: &SqliteRepo, page_name: &str) -> Member {
        let member = Member::new(
            format!("{}@test.com", page_name),
            "Creator".to_string(),
            page_name.to_string(),
        )
        .unwrap();

        let (member, _) = repo.create_member(member).await.unwrap();
        member
    }

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse::<DateTime<Utc>>().unwrap()
    }

    /// Inserts a waiting donation backdated to a specific instant.
    async fn donate_at(repo: &SqliteRepo, creator: MemberId, point: i64, at: &str) -> Donation {
        let donation = Donation::from_parts(
            DonationId::new(),
            creator,
            None,
            point,
            None,
            DonationStatus::WaitingForExchange,
            ts(at),
        );
        repo.create_donation(donation).await.unwrap()
    }

    fn month(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Members
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_member_issues_token() {
        let repo = setup_repo().await;

        let member = Member::new(
            "alice@test.com".to_string(),
            "Alice".to_string(),
            "alice".to_string(),
        )
        .unwrap();

        let (created, raw_token) = repo.create_member(member).await.unwrap();

        assert!(raw_token.starts_with("tk_"));

        let hash = security::hash_access_token(&raw_token);
        let resolved = repo.verify_access_token_hash(&hash).await.unwrap().unwrap();
        assert_eq!(resolved.id, created.id);

        let wrong = security::hash_access_token("tk_wrong");
        assert!(repo.verify_access_token_hash(&wrong).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_member_by_page_name() {
        let repo = setup_repo().await;
        let created = create_member(&repo, "my-page").await;

        let found = repo
            .find_member_by_page_name("my-page")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);

        assert!(repo.find_member_by_page_name("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let repo = setup_repo().await;
        let created = create_member(&repo, "writer").await;

        let updated = repo
            .update_profile(created.id, Some("New Name".to_string()), None)
            .await
            .unwrap();

        assert_eq!(updated.nickname, "New Name");
        assert!(updated.bio.is_none());

        let updated = repo
            .update_profile(created.id, None, Some("hello".to_string()))
            .await
            .unwrap();

        // Unchanged fields keep their previous value.
        assert_eq!(updated.nickname, "New Name");
        assert_eq!(updated.bio.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_account_review_flow() {
        let repo = setup_repo().await;
        let created = create_member(&repo, "banker").await;

        repo.submit_account(
            created.id,
            BankAccount {
                holder: "Hong Gildong".to_string(),
                number: "110-123-456789".to_string(),
                bank_code: "088".to_string(),
                bankbook_image_url: None,
            },
        )
        .await
        .unwrap();

        let requesting = repo.list_requesting_accounts().await.unwrap();
        assert_eq!(requesting.len(), 1);
        assert_eq!(requesting[0].account_status, AccountStatus::Requesting);

        repo.update_account_status(
            created.id,
            AccountStatus::Rejected,
            Some("blurry bankbook image".to_string()),
        )
        .await
        .unwrap();

        let member = repo.find_member(created.id).await.unwrap().unwrap();
        assert_eq!(member.account_status, AccountStatus::Rejected);
        assert_eq!(
            member.account_reject_reason.as_deref(),
            Some("blurry bankbook image")
        );
        assert!(repo.list_requesting_accounts().await.unwrap().is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Donations & aggregation
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_totals_zero_when_no_donations() {
        let repo = setup_repo().await;
        let creator = create_member(&repo, "empty-page").await;

        assert_eq!(repo.waiting_total_point(creator.id).await.unwrap(), 0);
        assert_eq!(repo.exchanged_total_point(creator.id).await.unwrap(), 0);
        assert_eq!(
            repo.exchange_amount_from_donations(creator.id, month("2024-01"))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_add_donation_message() {
        let repo = setup_repo().await;
        let creator = create_member(&repo, "artist").await;
        let donation = donate_at(&repo, creator.id, 500, "2024-03-10T09:00:00Z").await;

        repo.add_donation_message(
            donation.id,
            Message::new("fan".to_string(), "keep it up!".to_string(), true),
        )
        .await
        .unwrap();

        let fetched = repo.find_donation(donation.id).await.unwrap().unwrap();
        let msg = fetched.message.unwrap();
        assert_eq!(msg.name, "fan");
        assert!(msg.secret);

        let missing = repo
            .add_donation_message(
                DonationId::new(),
                Message::new("x".to_string(), "y".to_string(), false),
            )
            .await;
        assert!(matches!(missing, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_request_cutoff_excludes_next_month() {
        let repo = setup_repo().await;
        let creator = create_member(&repo, "streamer").await;

        donate_at(&repo, creator.id, 1000, "2024-01-15T12:00:00Z").await;
        donate_at(&repo, creator.id, 2000, "2024-01-31T23:59:59Z").await;
        // Exactly at the cutoff instant: excluded.
        donate_at(&repo, creator.id, 4000, "2024-02-01T00:00:00Z").await;

        let eligible = repo
            .find_donations_to_exchange(creator.id, month("2024-01"))
            .await
            .unwrap();
        assert_eq!(eligible.len(), 2);

        let amount = repo
            .exchange_amount_from_donations(creator.id, month("2024-01"))
            .await
            .unwrap();
        assert_eq!(amount, 3000);

        // February's window picks up everything.
        let amount = repo
            .exchange_amount_from_donations(creator.id, month("2024-02"))
            .await
            .unwrap();
        assert_eq!(amount, 7000);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Exchanges
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_approve_exchange_settles_and_flips_donations() {
        let repo = setup_repo().await;
        let creator = create_member(&repo, "painter").await;

        donate_at(&repo, creator.id, 1000, "2024-01-10T08:00:00Z").await;
        donate_at(&repo, creator.id, 2000, "2024-01-20T08:00:00Z").await;

        let exchange = repo
            .create_exchange(Exchange::new(creator.id, 3000, month("2024-01")))
            .await
            .unwrap();

        let settlements = repo
            .pending_settlement_amounts(month("2024-02"))
            .await
            .unwrap();
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].exchange_id, exchange.id);
        assert_eq!(settlements[0].amount, 3000);

        let approved = repo
            .approve_exchange(exchange.id, month("2024-02"))
            .await
            .unwrap();
        assert_eq!(approved.amount, 3000);
        assert!(approved.processed_at.is_some());

        assert_eq!(repo.waiting_total_point(creator.id).await.unwrap(), 0);
        assert_eq!(repo.exchanged_total_point(creator.id).await.unwrap(), 3000);
        assert!(repo.find_waiting_exchange(creator.id).await.unwrap().is_none());

        // A processed exchange cannot be approved again.
        let again = repo.approve_exchange(exchange.id, month("2024-02")).await;
        assert!(matches!(
            again,
            Err(RepoError::Domain(DomainError::ExchangeAlreadyProcessed(_)))
        ));
    }

    #[tokio::test]
    async fn test_approval_cutoff_is_start_of_approval_month() {
        let repo = setup_repo().await;
        let creator = create_member(&repo, "vtuber").await;

        donate_at(&repo, creator.id, 1000, "2024-01-15T10:00:00Z").await;
        // Arrives after the approval month begins; stays out of this payout.
        donate_at(&repo, creator.id, 500, "2024-02-03T10:00:00Z").await;

        let exchange = repo
            .create_exchange(Exchange::new(creator.id, 1000, month("2024-01")))
            .await
            .unwrap();

        let approved = repo
            .approve_exchange(exchange.id, month("2024-02"))
            .await
            .unwrap();

        assert_eq!(approved.amount, 1000);
        assert_eq!(repo.waiting_total_point(creator.id).await.unwrap(), 500);
        assert_eq!(repo.exchanged_total_point(creator.id).await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn test_reject_exchange_leaves_donations_waiting() {
        let repo = setup_repo().await;
        let creator = create_member(&repo, "singer").await;

        donate_at(&repo, creator.id, 2500, "2024-01-05T10:00:00Z").await;

        let exchange = repo
            .create_exchange(Exchange::new(creator.id, 2500, month("2024-01")))
            .await
            .unwrap();

        let rejected = repo
            .reject_exchange(exchange.id, "account under review".to_string())
            .await
            .unwrap();

        assert_eq!(
            rejected.reject_reason.as_deref(),
            Some("account under review")
        );
        assert_eq!(repo.waiting_total_point(creator.id).await.unwrap(), 2500);
        assert!(repo.find_waiting_exchange(creator.id).await.unwrap().is_none());

        let again = repo
            .reject_exchange(exchange.id, "twice".to_string())
            .await;
        assert!(matches!(
            again,
            Err(RepoError::Domain(DomainError::ExchangeAlreadyProcessed(_)))
        ));
    }

    #[tokio::test]
    async fn test_settlement_amount_zero_for_empty_window() {
        let repo = setup_repo().await;
        let creator = create_member(&repo, "newbie").await;

        // Donation arrives only after the approval cutoff.
        donate_at(&repo, creator.id, 700, "2024-02-10T10:00:00Z").await;

        let exchange = repo
            .create_exchange(Exchange::new(creator.id, 0, month("2024-01")))
            .await
            .unwrap();

        let settlements = repo
            .pending_settlement_amounts(month("2024-02"))
            .await
            .unwrap();
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].exchange_id, exchange.id);
        assert_eq!(settlements[0].amount, 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_payment_status_roundtrip() {
        let repo = setup_repo().await;

        let payment = Payment::new(10_000, "10000 points".to_string()).unwrap();
        let created = repo.create_payment(payment).await.unwrap();

        let updated = repo
            .update_payment_status(
                created.merchant_uid,
                PaymentStatus::Paid,
                Some("imp_123456".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(updated.status, PaymentStatus::Paid);
        assert_eq!(updated.imp_uid.as_deref(), Some("imp_123456"));

        // imp_uid survives a later status change without a new value.
        let cancelled = repo
            .update_payment_status(created.merchant_uid, PaymentStatus::Cancelled, None)
            .await
            .unwrap();
        assert_eq!(cancelled.status, PaymentStatus::Cancelled);
        assert_eq!(cancelled.imp_uid.as_deref(), Some("imp_123456"));

        let missing = repo
            .update_payment_status(uuid::Uuid::new_v4(), PaymentStatus::Paid, None)
            .await;
        assert!(matches!(missing, Err(RepoError::NotFound)));
    }
}
