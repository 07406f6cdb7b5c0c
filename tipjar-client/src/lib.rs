//! # Tipjar Client SDK
//!
//! A typed Rust client for the tipjar API.

use reqwest::Client;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use tipjar_types::{
    AccountRegisterRequest, AccountRejectRequest, AdminExchangeResponse, DonationId,
    DonationMessageRequest, DonationRequest, DonationResponse, ErrorResponse,
    ExchangeApproveRequest, ExchangeRejectRequest, ExchangeRequest, ExchangeResponse,
    MemberDetailResponse, MemberId, MemberResponse, PaymentRequest, PaymentResponse,
    PaymentVerifyRequest, PointResponse, RefundRequest, RequestingAccountResponse, SignupRequest,
    SignupResponse, UpdateProfileRequest, YearMonth,
};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} [{error_code}] {message}")]
    Api {
        status: u16,
        /// Stable code from the error body, e.g. `member-002`.
        error_code: String,
        message: String,
        /// Link token carried by `auth-004` responses.
        token: Option<String>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tipjar API client.
pub struct TipjarClient {
    base_url: String,
    access_token: Option<String>,
    http: Client,
}

impl TipjarClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
            http: Client::new(),
        }
    }

    /// Sets the bearer token (member access token or admin token).
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Members
    // ─────────────────────────────────────────────────────────────────────────

    /// Signs up a new member. The returned access token is shown only once.
    pub async fn signup(
        &self,
        email: &str,
        nickname: &str,
        page_name: &str,
    ) -> Result<SignupResponse, ClientError> {
        let req = SignupRequest {
            email: email.to_string(),
            nickname: nickname.to_string(),
            page_name: page_name.to_string(),
        };
        self.post("/api/members", &req).await
    }

    /// Public view of a creator's page.
    pub async fn member_page(&self, page_name: &str) -> Result<MemberResponse, ClientError> {
        self.get(&format!("/api/members/{}", page_name)).await
    }

    /// Private view of the authenticated member.
    pub async fn me(&self) -> Result<MemberDetailResponse, ClientError> {
        self.get("/api/members/me").await
    }

    /// Updates the authenticated member's nickname and/or bio.
    pub async fn update_profile(
        &self,
        nickname: Option<String>,
        bio: Option<String>,
    ) -> Result<MemberDetailResponse, ClientError> {
        let req = UpdateProfileRequest { nickname, bio };
        self.put("/api/members/me/profile", &req).await
    }

    /// Current exchangeable point balance.
    pub async fn my_point(&self) -> Result<PointResponse, ClientError> {
        self.get("/api/members/me/point").await
    }

    /// Submits a payout bank account for admin review.
    pub async fn register_account(
        &self,
        holder: &str,
        number: &str,
        bank_code: &str,
        bankbook_image_url: Option<String>,
    ) -> Result<(), ClientError> {
        let req = AccountRegisterRequest {
            holder: holder.to_string(),
            number: number.to_string(),
            bank_code: bank_code.to_string(),
            bankbook_image_url,
        };
        self.post_no_content("/api/members/me/account", &req).await
    }

    /// Requests a payout of the accumulated points.
    pub async fn request_exchange(
        &self,
        month: Option<YearMonth>,
    ) -> Result<ExchangeResponse, ClientError> {
        let req = ExchangeRequest { month };
        self.post("/api/members/me/exchange", &req).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Donations
    // ─────────────────────────────────────────────────────────────────────────

    /// Donates points to a creator's page.
    pub async fn donate(
        &self,
        page_name: &str,
        point: i64,
        message: Option<DonationMessageRequest>,
    ) -> Result<DonationResponse, ClientError> {
        let req = DonationRequest {
            page_name: page_name.to_string(),
            point,
            message,
        };
        self.post("/api/donations", &req).await
    }

    /// Attaches a message to an existing donation.
    pub async fn add_donation_message(
        &self,
        donation_id: DonationId,
        name: &str,
        text: &str,
        secret: bool,
    ) -> Result<(), ClientError> {
        let req = DonationMessageRequest {
            name: name.to_string(),
            text: text.to_string(),
            secret,
        };
        self.post_no_content(&format!("/api/donations/{}/messages", donation_id), &req)
            .await
    }

    /// Donations shown on a creator's page.
    pub async fn page_donations(
        &self,
        page_name: &str,
    ) -> Result<Vec<DonationResponse>, ClientError> {
        self.get(&format!("/api/members/{}/donations", page_name))
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts a point top-up payment.
    pub async fn create_payment(
        &self,
        item_price: i64,
        item_name: &str,
    ) -> Result<PaymentResponse, ClientError> {
        let req = PaymentRequest {
            item_price,
            item_name: item_name.to_string(),
        };
        self.post("/api/payments", &req).await
    }

    /// Verifies a payment after client-side checkout.
    pub async fn verify_payment(&self, merchant_uid: Uuid) -> Result<PaymentResponse, ClientError> {
        let req = PaymentVerifyRequest { merchant_uid };
        self.post("/api/payments/verify", &req).await
    }

    /// Refunds a payment within the guarantee window.
    pub async fn refund_payment(&self, merchant_uid: Uuid) -> Result<PaymentResponse, ClientError> {
        let req = RefundRequest { merchant_uid };
        self.post("/api/payments/refund", &req).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────

    /// Bank-account registrations waiting for review.
    pub async fn admin_list_accounts(
        &self,
    ) -> Result<Vec<RequestingAccountResponse>, ClientError> {
        self.get("/api/admin/list/account").await
    }

    /// Waiting payout requests with their settlement amounts.
    pub async fn admin_list_exchanges(&self) -> Result<Vec<AdminExchangeResponse>, ClientError> {
        self.get("/api/admin/list/exchange").await
    }

    /// Approves a pending bank-account registration.
    pub async fn admin_approve_account(&self, member_id: MemberId) -> Result<(), ClientError> {
        self.post_no_content(
            &format!("/api/admin/account/approve/{}", member_id),
            &serde_json::json!({}),
        )
        .await
    }

    /// Rejects a pending bank-account registration.
    pub async fn admin_reject_account(
        &self,
        member_id: MemberId,
        reason: &str,
    ) -> Result<(), ClientError> {
        let req = AccountRejectRequest {
            reason: reason.to_string(),
        };
        self.post_no_content(&format!("/api/admin/account/reject/{}", member_id), &req)
            .await
    }

    /// Approves a creator's waiting exchange.
    pub async fn admin_approve_exchange(
        &self,
        page_name: &str,
        month: Option<YearMonth>,
    ) -> Result<ExchangeResponse, ClientError> {
        let req = ExchangeApproveRequest { month };
        self.post(&format!("/api/admin/exchange/approve/{}", page_name), &req)
            .await
    }

    /// Rejects a creator's waiting exchange.
    pub async fn admin_reject_exchange(
        &self,
        page_name: &str,
        reason: &str,
    ) -> Result<ExchangeResponse, ClientError> {
        let req = ExchangeRejectRequest {
            page_name: page_name.to_string(),
            reason: reason.to_string(),
        };
        self.post("/api/admin/exchange/reject", &req).await
    }

    // ─────────────────────────────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let mut req = self.http.get(format!("{}{}", self.base_url, path));
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let resp = self.send_json(reqwest::Method::POST, path, body).await?;
        self.handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let resp = self.send_json(reqwest::Method::PUT, path, body).await?;
        self.handle_response(resp).await
    }

    /// POST for endpoints that answer 204 with an empty body.
    async fn post_no_content<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        let resp = self.send_json(reqwest::Method::POST, path, body).await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.api_error(status, resp).await)
        }
    }

    async fn send_json<B: serde::Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ClientError> {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(self.api_error(status, resp).await)
        }
    }

    async fn api_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> ClientError {
        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => ClientError::Api {
                status: status.as_u16(),
                error_code: err.error_code,
                message: err.message,
                token: err.token,
            },
            Err(_) => ClientError::Api {
                status: status.as_u16(),
                error_code: "error-001".to_string(),
                message: body,
                token: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = TipjarClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = TipjarClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_access_token() {
        let client = TipjarClient::new("http://localhost:3000").with_access_token("tk_test");
        assert_eq!(client.access_token, Some("tk_test".to_string()));
    }

    #[test]
    fn test_error_body_parsing() {
        let body = r#"{"errorCode":"auth-004","message":"Already registered","token":"abc"}"#;
        let err: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(err.error_code, "auth-004");
        assert_eq!(err.token.as_deref(), Some("abc"));
    }
}
