//! Authentication middleware for access-token validation.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use tipjar_types::{ErrorResponse, PaymentGateway, PlatformRepository};

use super::handlers::AppState;

/// Extracts the bearer token from the Authorization header.
/// Expected format: "Bearer <token>" or just "<token>"
fn extract_token(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;
    match header.strip_prefix("Bearer ") {
        Some(token) => Some(token),
        None => Some(header),
    }
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    let header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());
    extract_token(header).filter(|t| !t.is_empty())
}

/// Member authentication middleware.
///
/// Hashes the bearer token with SHA-256, resolves it against the stored
/// token hashes and inserts the owning `Member` as a request extension.
/// Returns 401 when the token is missing or unknown.
pub async fn auth_middleware<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let token_hash = tipjar_repo::security::hash_access_token(token);

    match state.service.repo().verify_access_token_hash(&token_hash).await {
        Ok(Some(member)) => {
            request.extensions_mut().insert(member);
            next.run(request).await
        }
        Ok(None) => unauthorized_response("Invalid access token"),
        Err(e) => {
            tracing::error!("Access token verification failed: {}", e);
            internal_error_response()
        }
    }
}

/// Optional authentication for public endpoints.
///
/// Resolves the bearer token when one is present so handlers can see the
/// viewer's identity, but never rejects the request. Unknown tokens are
/// treated as anonymous.
pub async fn optional_auth_middleware<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&request) {
        let token_hash = tipjar_repo::security::hash_access_token(token);
        match state.service.repo().verify_access_token_hash(&token_hash).await {
            Ok(Some(member)) => {
                request.extensions_mut().insert(member);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Access token verification failed: {}", e);
                return internal_error_response();
            }
        }
    }

    next.run(request).await
}

/// Admin authentication middleware.
///
/// Compares the bearer token against the configured admin token in constant
/// time (both sides hashed first).
pub async fn admin_middleware<R: PlatformRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    if !tipjar_repo::security::verify_access_token(token, &state.admin_token_hash) {
        return unauthorized_response("Invalid admin token");
    }

    next.run(request).await
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error_code: "auth-001".to_string(),
            message: message.to_string(),
            token: None,
        }),
    )
        .into_response()
}

fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error_code: "error-001".to_string(),
            message: "Internal server error".to_string(),
            token: None,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_bearer() {
        assert_eq!(
            extract_token(Some("Bearer tk_test_123")),
            Some("tk_test_123")
        );
    }

    #[test]
    fn test_extract_token_raw() {
        assert_eq!(extract_token(Some("tk_test_123")), Some("tk_test_123"));
    }

    #[test]
    fn test_extract_token_none() {
        assert_eq!(extract_token(None), None);
    }
}
