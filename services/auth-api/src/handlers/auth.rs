//! Authentication handlers (register, login, logout, profile, password reset)

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Redirect};
use axum::{Form, Json};
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use warden_auth_core::AuthError;

use crate::error::{ApiError, ApiResult};
use crate::extractors::CurrentPrincipal;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct CredentialsForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestForm {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct PasswordUpdateForm {
    pub email: Option<String>,
    pub reset_token: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EmailMessageResponse {
    pub email: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ResetTokenResponse {
    pub email: String,
    pub reset_token: String,
}

/// Form field that must be present and non-empty
fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{field} missing")))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
pub async fn index() -> Json<MessageResponse> {
    Json(MessageResponse { message: "Welcome" })
}

/// POST /users
///
/// Register a new principal
pub async fn register_user(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> ApiResult<Json<EmailMessageResponse>> {
    let email = required(form.email, "email")?;
    let password = required(form.password, "password")?;

    match state.auth.register(&email, Secret::new(password)).await {
        Ok(_) => Ok(Json(EmailMessageResponse {
            email,
            message: "user created",
        })),
        Err(AuthError::DuplicateIdentity) => Err(ApiError::EmailTaken),
        Err(e) => Err(e.into()),
    }
}

/// POST /sessions
///
/// Check credentials and set the session cookie
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> ApiResult<impl IntoResponse> {
    let email = required(form.email, "email")?;
    let password = required(form.password, "password")?;

    if !state.auth.login(&email, Secret::new(password)).await? {
        return Err(ApiError::InvalidCredentials);
    }

    // The principal can only vanish here if the store was reset underneath us
    let token = state
        .auth
        .create_session(&email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let cookie = state.config.session_cookie.set(token.as_str());
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(EmailMessageResponse {
            email,
            message: "logged in",
        }),
    ))
}

/// DELETE /sessions
///
/// End the current session and redirect home
pub async fn logout(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> ApiResult<impl IntoResponse> {
    state.auth.destroy_session(&principal.identity).await?;
    tracing::info!(principal_id = %principal.id, "Logged out");

    let cookie = state.config.session_cookie.clear();
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")))
}

/// GET /profile
pub async fn profile(CurrentPrincipal(principal): CurrentPrincipal) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        email: principal.identity,
    })
}

/// POST /reset_password
///
/// Issue a password reset token
pub async fn reset_password_token(
    State(state): State<AppState>,
    Form(form): Form<ResetRequestForm>,
) -> ApiResult<Json<ResetTokenResponse>> {
    let email = required(form.email, "email")?;

    let token = state.auth.request_reset_token(&email).await?;
    Ok(Json(ResetTokenResponse {
        email,
        reset_token: token.into_inner(),
    }))
}

/// PUT /reset_password
///
/// Consume a reset token and set the new password
pub async fn update_password(
    State(state): State<AppState>,
    Form(form): Form<PasswordUpdateForm>,
) -> ApiResult<Json<EmailMessageResponse>> {
    let email = required(form.email, "email")?;
    let reset_token = required(form.reset_token, "reset_token")?;
    let new_password = required(form.new_password, "new_password")?;

    state
        .auth
        .update_password(&reset_token, Secret::new(new_password))
        .await?;

    Ok(Json(EmailMessageResponse {
        email,
        message: "Password updated",
    }))
}
