//! # Tipjar IamPort Adapter
//!
//! HTTP adapter implementing the `PaymentGateway` port against the IamPort
//! REST API. Every call authenticates first via `/users/getToken`; IamPort
//! access tokens are short-lived, so no caching is attempted.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use tipjar_types::{AccountInfo, GatewayError, PaymentGateway, PaymentInfo, PaymentStatus};

const DEFAULT_BASE_URL: &str = "https://api.iamport.kr";

/// IamPort gateway client.
pub struct IamPortGateway {
    base_url: String,
    api_key: String,
    api_secret: String,
    http: Client,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// Every IamPort response wraps its payload in this envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    message: Option<String>,
    response: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    merchant_uid: String,
    status: String,
    amount: i64,
    name: Option<String>,
    imp_uid: String,
}

#[derive(Debug, Deserialize)]
struct HolderResponse {
    bank_holder: String,
}

fn parse_status(s: &str) -> Result<PaymentStatus, GatewayError> {
    match s {
        "ready" => Ok(PaymentStatus::Ready),
        "paid" => Ok(PaymentStatus::Paid),
        "cancelled" => Ok(PaymentStatus::Cancelled),
        "failed" => Ok(PaymentStatus::Failed),
        other => Err(GatewayError::Malformed(format!(
            "unknown payment status: {}",
            other
        ))),
    }
}

impl PaymentResponse {
    fn into_info(self) -> Result<PaymentInfo, GatewayError> {
        let status = parse_status(&self.status)?;
        let merchant_uid = Uuid::parse_str(&self.merchant_uid)
            .map_err(|e| GatewayError::Malformed(format!("merchant_uid: {}", e)))?;

        Ok(PaymentInfo {
            merchant_uid,
            status,
            amount: self.amount,
            item_name: self.name.unwrap_or_default(),
            imp_uid: self.imp_uid,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

impl IamPortGateway {
    /// Creates a gateway client against the production IamPort API.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, api_secret)
    }

    /// Creates a gateway client against a custom base URL (for tests).
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            http: Client::new(),
        }
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        let body = serde_json::json!({
            "imp_key": self.api_key,
            "imp_secret": self.api_secret,
        });

        let resp = self
            .http
            .post(format!("{}/users/getToken", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let auth: AuthResponse = Self::unwrap_envelope(resp).await?;
        Ok(auth.access_token)
    }

    /// Checks the HTTP status, then peels the IamPort envelope.
    async fn unwrap_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
            });
        }

        let envelope: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        if envelope.code != 0 {
            return Err(GatewayError::Malformed(format!(
                "gateway code {}: {}",
                envelope.code,
                envelope.message.unwrap_or_default()
            )));
        }

        envelope
            .response
            .ok_or_else(|| GatewayError::Malformed("missing response body".to_string()))
    }
}

#[async_trait]
impl PaymentGateway for IamPortGateway {
    async fn request_payment_info(&self, merchant_uid: Uuid) -> Result<PaymentInfo, GatewayError> {
        let token = self.access_token().await?;

        tracing::debug!(%merchant_uid, "Fetching payment info from gateway");

        let resp = self
            .http
            .get(format!(
                "{}/payments/find/{}",
                self.base_url, merchant_uid
            ))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let payment: PaymentResponse = Self::unwrap_envelope(resp).await?;
        payment.into_info()
    }

    async fn request_payment_refund(
        &self,
        merchant_uid: Uuid,
    ) -> Result<PaymentInfo, GatewayError> {
        let token = self.access_token().await?;

        tracing::info!(%merchant_uid, "Requesting payment refund at gateway");

        let body = serde_json::json!({
            "merchant_uid": merchant_uid.to_string(),
        });

        let resp = self
            .http
            .post(format!("{}/payments/cancel", self.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let payment: PaymentResponse = Self::unwrap_envelope(resp).await?;
        payment.into_info()
    }

    async fn request_holder_name(
        &self,
        bank_code: &str,
        bank_num: &str,
    ) -> Result<AccountInfo, GatewayError> {
        let token = self.access_token().await?;

        let resp = self
            .http
            .get(format!("{}/vbanks/holder", self.base_url))
            .query(&[("bank_code", bank_code), ("bank_num", bank_num)])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        // 404 here means the account itself does not exist.
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::InvalidAccount);
        }

        let holder: HolderResponse = Self::unwrap_envelope(resp).await?;
        Ok(AccountInfo {
            bank_holder: holder.bank_holder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let gateway = IamPortGateway::with_base_url("http://localhost:9000/", "key", "secret");
        assert_eq!(gateway.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_envelope_deserializes() {
        let json = r#"{
            "code": 0,
            "message": null,
            "response": {
                "merchant_uid": "b9bd9717-59d5-4b3c-9e06-0a2b4a7309e1",
                "status": "paid",
                "amount": 10000,
                "name": "10000 points",
                "imp_uid": "imp_448280090638"
            }
        }"#;

        let envelope: Envelope<PaymentResponse> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.code, 0);

        let info = envelope.response.unwrap().into_info().unwrap();
        assert_eq!(info.status, PaymentStatus::Paid);
        assert_eq!(info.amount, 10000);
        assert_eq!(info.item_name, "10000 points");
    }

    #[test]
    fn test_unknown_status_is_malformed() {
        let payment = PaymentResponse {
            merchant_uid: Uuid::new_v4().to_string(),
            status: "pending".to_string(),
            amount: 100,
            name: None,
            imp_uid: "imp_1".to_string(),
        };

        assert!(matches!(
            payment.into_info(),
            Err(GatewayError::Malformed(_))
        ));
    }

    #[test]
    fn test_bad_merchant_uid_is_malformed() {
        let payment = PaymentResponse {
            merchant_uid: "not-a-uuid".to_string(),
            status: "paid".to_string(),
            amount: 100,
            name: None,
            imp_uid: "imp_1".to_string(),
        };

        assert!(matches!(
            payment.into_info(),
            Err(GatewayError::Malformed(_))
        ));
    }
}
