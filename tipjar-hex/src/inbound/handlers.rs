//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use tipjar_types::{
    AccountRegisterRequest, AccountRejectRequest, AppError, DomainError, DonationId,
    DonationMessageRequest, DonationRequest, ErrorResponse, ExchangeApproveRequest,
    ExchangeRejectRequest, ExchangeRequest, Member, MemberId, PaymentGateway, PaymentRequest,
    PaymentVerifyRequest, PlatformRepository, RefundRequest, SignupRequest, UpdateProfileRequest,
};

use crate::TipService;

/// Application state shared across handlers.
pub struct AppState<R: PlatformRepository, G: PaymentGateway> {
    pub service: TipService<R, G>,
    /// SHA-256 hash of the admin bearer token.
    pub admin_token_hash: String,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(AppError::Domain(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            // Every business rule violation is a 400 with a stable code.
            AppError::Domain(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "Request failed");
        }

        let token = match &self.0 {
            AppError::Domain(DomainError::AlreadyRegistered { link_token }) => {
                Some(link_token.clone())
            }
            _ => None,
        };

        let body = ErrorResponse {
            error_code: self.0.error_code().to_string(),
            message: self.0.to_string(),
            token,
        };

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Members
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(page_name = %req.page_name))]
pub async fn signup<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.signup(req).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// Public view of a creator's page.
#[tracing::instrument(skip(state))]
pub async fn member_page<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(page_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.member_page(&page_name).await?;
    Ok(Json(resp))
}

/// Private view of the authenticated member.
pub async fn me<R: PlatformRepository, G: PaymentGateway>(
    Extension(member): Extension<Member>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(tipjar_types::MemberDetailResponse::from(&member)))
}

#[tracing::instrument(skip(state, req), fields(member_id = %member.id))]
pub async fn update_profile<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Extension(member): Extension<Member>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.update_profile(member.id, req).await?;
    Ok(Json(resp))
}

#[tracing::instrument(skip(state), fields(member_id = %member.id))]
pub async fn my_point<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Extension(member): Extension<Member>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.my_point(member.id).await?;
    Ok(Json(resp))
}

#[tracing::instrument(skip(state, req), fields(member_id = %member.id))]
pub async fn register_account<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Extension(member): Extension<Member>,
    Json(req): Json<AccountRegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.register_account(member.id, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, req), fields(member_id = %member.id))]
pub async fn request_exchange<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Extension(member): Extension<Member>,
    Json(req): Json<ExchangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.request_exchange(&member, req).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Donations
// ─────────────────────────────────────────────────────────────────────────────

/// Donations shown on a creator's page. An authenticated creator sees their
/// own secret messages; everyone else gets them masked.
#[tracing::instrument(skip(state, viewer))]
pub async fn page_donations<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    viewer: Option<Extension<Member>>,
    Path(page_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer_id = viewer.map(|Extension(m)| m.id);
    let resp = state.service.page_donations(&page_name, viewer_id).await?;
    Ok(Json(resp))
}

#[tracing::instrument(skip(state, req, donator), fields(page_name = %req.page_name, point = req.point))]
pub async fn donate<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    donator: Option<Extension<Member>>,
    Json(req): Json<DonationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let donator_id = donator.map(|Extension(m)| m.id);
    let resp = state.service.donate(req, donator_id).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[tracing::instrument(skip(state, req), fields(donation_id = %id))]
pub async fn add_donation_message<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
    Json(req): Json<DonationMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let donation_id: DonationId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid donation ID".into()))?;

    state.service.add_donation_message(donation_id, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(item_price = req.item_price))]
pub async fn create_payment<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<PaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.create_payment(req).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[tracing::instrument(skip(state, req), fields(merchant_uid = %req.merchant_uid))]
pub async fn verify_payment<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<PaymentVerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.verify_payment(req).await?;
    Ok(Json(resp))
}

#[tracing::instrument(skip(state, req), fields(merchant_uid = %req.merchant_uid))]
pub async fn refund_payment<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<RefundRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.refund_payment(req).await?;
    Ok(Json(resp))
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state))]
pub async fn admin_list_accounts<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.requesting_accounts().await?;
    Ok(Json(resp))
}

#[tracing::instrument(skip(state))]
pub async fn admin_list_exchanges<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.waiting_exchanges().await?;
    Ok(Json(resp))
}

#[tracing::instrument(skip(state), fields(member_id = %id))]
pub async fn admin_approve_account<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id: MemberId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid member ID".into()))?;

    state.service.approve_account(member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, req), fields(member_id = %id))]
pub async fn admin_reject_account<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
    Json(req): Json<AccountRejectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id: MemberId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid member ID".into()))?;

    state.service.reject_account(member_id, req.reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, req))]
pub async fn admin_approve_exchange<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(page_name): Path<String>,
    Json(req): Json<ExchangeApproveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.approve_exchange(&page_name, req).await?;
    Ok(Json(resp))
}

#[tracing::instrument(skip(state, req), fields(page_name = %req.page_name))]
pub async fn admin_reject_exchange<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<ExchangeRejectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.reject_exchange(req).await?;
    Ok(Json(resp))
}
