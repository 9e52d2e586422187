//! Warden Auth API
//!
//! Authentication service over form-encoded HTTP.
//!
//! ## Endpoints
//!
//! - `GET /` - Welcome message
//! - `POST /users` - Register (email, password)
//! - `POST /sessions` - Log in and set the session cookie
//! - `DELETE /sessions` - Log out, redirect to `/`
//! - `GET /profile` - Current principal
//! - `POST /reset_password` - Issue a reset token (email)
//! - `PUT /reset_password` - Set a new password (email, reset_token, new_password)
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness
//! - `GET /ready` - Readiness (credential store reachable)
//!
//! ## Errors
//!
//! Every error body uses one envelope:
//!
//! ```json
//! {"error": {"code": "DUPLICATE_IDENTITY", "message": "email already registered"}}
//! ```
//!
//! Clients written against the Flask service read a top-level `message`
//! (`{"message": "email already registered"}`). That text now sits at
//! `error.message`, next to a stable `code` to match on.

pub mod config;
pub mod cookie;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use crate::config::{Config, ConfigError, StoreBackend};
pub use crate::state::AppState;

/// Build the HTTP router with its middleware stack
pub fn build_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout();

    let auth_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/users", post(handlers::register_user))
        .route(
            "/sessions",
            post(handlers::login).delete(handlers::logout),
        )
        .route("/profile", get(handlers::profile))
        .route(
            "/reset_password",
            post(handlers::reset_password_token).put(handlers::update_password),
        );

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready));

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        // Request ID propagation (outermost)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Tracing with request details
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .merge(auth_routes)
        .layer(middleware)
        .merge(health_routes)
        .with_state(state)
}
