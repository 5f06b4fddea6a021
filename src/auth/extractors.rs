use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::{jwks::TokenError, services::resolve_user};
use crate::{
    domain::{Subject, UserId},
    error::AppError,
    state::AppState,
};

/// Verifies the bearer token and yields the caller's local user id.
pub struct CurrentUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("invalid auth scheme".into()))?;

        let claims = match state.verifier.verify(token).await {
            Ok(c) => c,
            Err(TokenError::Invalid(reason)) => {
                warn!(%reason, "token rejected");
                return Err(AppError::Unauthorized("invalid or expired token".into()));
            }
            Err(e @ TokenError::KeysUnavailable(_)) => {
                warn!(error = %e, "cannot validate token");
                return Err(AppError::Unauthorized("unable to validate token".into()));
            }
        };

        let subject = Subject::parse(claims.sub)
            .map_err(|_| AppError::Unauthorized("token subject is blank".into()))?;

        let user = resolve_user(state.users.as_ref(), subject)
            .await
            .map_err(AppError::Repository)?;

        Ok(CurrentUser(user.id))
    }
}
