//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use tipjar_types::{PaymentGateway, PlatformRepository};

use super::auth::{admin_middleware, auth_middleware, optional_auth_middleware};
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::TipService;

/// HTTP Server for the tipjar API.
pub struct HttpServer<R: PlatformRepository, G: PaymentGateway> {
    state: Arc<AppState<R, G>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: PlatformRepository, G: PaymentGateway> HttpServer<R, G> {
    /// Creates a new HTTP server with the given service.
    ///
    /// `admin_token` is the raw admin bearer token; only its hash is kept.
    pub fn new(service: TipService<R, G>, admin_token: &str) -> Self {
        Self {
            state: Arc::new(AppState {
                service,
                admin_token_hash: tipjar_repo::security::hash_access_token(admin_token),
            }),
            rate_limiter: Arc::new(RateLimiterState::default()), // 100 req/min default
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(
        service: TipService<R, G>,
        admin_token: &str,
        requests_per_minute: u32,
    ) -> Self {
        use std::time::Duration;
        Self {
            state: Arc::new(AppState {
                service,
                admin_token_hash: tipjar_repo::security::hash_access_token(admin_token),
            }),
            rate_limiter: Arc::new(RateLimiterState::new(
                requests_per_minute,
                Duration::from_secs(60),
            )),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Public surface; a bearer token is honored when present so viewers
        // and donators can be identified, but never required.
        let public = Router::new()
            .route("/api/members", post(handlers::signup::<R, G>))
            .route(
                "/api/members/{page_name}",
                get(handlers::member_page::<R, G>),
            )
            .route(
                "/api/members/{page_name}/donations",
                get(handlers::page_donations::<R, G>),
            )
            .route("/api/donations", post(handlers::donate::<R, G>))
            .route(
                "/api/donations/{id}/messages",
                post(handlers::add_donation_message::<R, G>),
            )
            .route("/api/payments", post(handlers::create_payment::<R, G>))
            .route(
                "/api/payments/verify",
                post(handlers::verify_payment::<R, G>),
            )
            .route(
                "/api/payments/refund",
                post(handlers::refund_payment::<R, G>),
            )
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                optional_auth_middleware::<R, G>,
            ));

        // Endpoints of the authenticated member.
        let member = Router::new()
            .route("/api/members/me", get(handlers::me::<R, G>))
            .route(
                "/api/members/me/profile",
                put(handlers::update_profile::<R, G>),
            )
            .route("/api/members/me/point", get(handlers::my_point::<R, G>))
            .route(
                "/api/members/me/account",
                post(handlers::register_account::<R, G>),
            )
            .route(
                "/api/members/me/exchange",
                post(handlers::request_exchange::<R, G>),
            )
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<R, G>,
            ));

        // Back-office surface behind the admin token.
        let admin = Router::new()
            .route(
                "/api/admin/list/account",
                get(handlers::admin_list_accounts::<R, G>),
            )
            .route(
                "/api/admin/list/exchange",
                get(handlers::admin_list_exchanges::<R, G>),
            )
            .route(
                "/api/admin/account/approve/{member_id}",
                post(handlers::admin_approve_account::<R, G>),
            )
            .route(
                "/api/admin/account/reject/{member_id}",
                post(handlers::admin_reject_account::<R, G>),
            )
            .route(
                "/api/admin/exchange/approve/{page_name}",
                post(handlers::admin_approve_exchange::<R, G>),
            )
            .route(
                "/api/admin/exchange/reject",
                post(handlers::admin_reject_exchange::<R, G>),
            )
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                admin_middleware::<R, G>,
            ));

        Router::new()
            .route("/health", get(handlers::health))
            .merge(public)
            .merge(member)
            .merge(admin)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
