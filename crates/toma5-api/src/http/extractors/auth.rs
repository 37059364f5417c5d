//! Session authentication extractor.
//!
//! Reads the session token from:
//! - `Authorization: Bearer <token>` header
//! - `access_token=<token>` query parameter (browsers cannot set headers on
//!   a WebSocket upgrade)
//!
//! The token is resolved to an [`Actor`] by the identity directory; the
//! engine never sees raw tokens.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use toma5_core::repository::directory::ActorResolver;
use toma5_types::actor::Actor;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated caller of a request.
pub struct CurrentActor(pub Actor);

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let actor = state.directory.resolve_actor(&token).await?;
        tracing::debug!(user_id = %actor.user_id, role = %actor.role, "request authenticated");
        Ok(CurrentActor(actor))
    }
}

/// Extract the session token from request headers or the query string.
fn extract_token(parts: &Parts) -> Result<String, AppError> {
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    if let Some(query) = parts.uri.query() {
        let token = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "access_token")
            .map(|(_, value)| value.trim().to_string());
        if let Some(token) = token {
            return Ok(token);
        }
    }

    Err(AppError::Unauthorized(
        "Missing session token. Provide via 'Authorization: Bearer <token>'.".to_string(),
    ))
}
