use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::errors::AppError;
use crate::services::AuthUser;
use crate::types::AppState;

/// Auth gate: any handler taking an `AuthUser` rejects the request with 401
/// before its body runs.
#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = state.services.auth.authenticate(&parts.headers)?;
        tracing::Span::current().record("user_id", user.id.as_str());
        Ok(user)
    }
}
