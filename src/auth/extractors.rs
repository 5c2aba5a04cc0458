use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{repo_types::User, services};
use crate::{error::AppError, state::AppState};

/// Extracts the bearer token and resolves it to the calling user.
pub struct CurrentUser(pub User);

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
            .ok_or(AppError::NotAuthenticated)?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::NotAuthenticated)?;

        let user = services::resolve(&state.db, &state.jwt, token).await?;
        Ok(CurrentUser(user))
    }
}
