use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{v1::ApiError, AppState};

/// The caller's resolved user id. Every handler takes this as an argument;
/// identity is never read from ambient state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity(pub Uuid);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

        match state.sessions.get(token) {
            Some(user) => Ok(Identity(*user)),
            None => Err(ApiError::Unauthorized),
        }
    }
}
