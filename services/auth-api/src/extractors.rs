//! Axum extractors for authentication

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use warden_types::Principal;

use crate::error::ApiError;
use crate::state::AppState;

/// Principal owning the request's session cookie
///
/// Rejects with 403 when the cookie is absent or does not resolve.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let Some(token) = app_state.config.session_cookie.read(&parts.headers) else {
            tracing::debug!("Request without session cookie");
            return Err(ApiError::Forbidden);
        };

        match app_state.auth.resolve_session(&token).await? {
            Some(principal) => Ok(Self(principal)),
            None => {
                tracing::debug!("Session cookie did not resolve");
                Err(ApiError::Forbidden)
            }
        }
    }
}
