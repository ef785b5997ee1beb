//! Authentication extraction point (`spec.md` §1 Non-goals: token
//! verification against the external auth provider is out of scope). The
//! bearer token's subject IS the owner id; this layer only extracts it, it
//! never validates signatures or calls out to the provider.
//!
//! Grounded on the teacher's `auth_middleware`
//! (`crates/api/src/middleware/auth.rs`): extract from the request, insert
//! into extensions, 401 on absence.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use uuid::Uuid;

/// The authenticated caller, threaded through request extensions by
/// `AuthenticatedUser::from_request_parts`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = header.strip_prefix("Bearer ").ok_or(StatusCode::UNAUTHORIZED)?;
        let owner_id = Uuid::parse_str(token).map_err(|_| StatusCode::UNAUTHORIZED)?;
        Ok(AuthenticatedUser(owner_id))
    }
}

/// The WebSocket handshake carries the token as a query parameter rather
/// than a header (`spec.md` §6.2), since browsers cannot set custom headers
/// on a WebSocket upgrade request.
pub fn parse_ws_owner(token: &str) -> Result<Uuid, StatusCode> {
    Uuid::parse_str(token).map_err(|_| StatusCode::UNAUTHORIZED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ws_owner_accepts_a_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_ws_owner(&id.to_string()), Ok(id));
    }

    #[test]
    fn parse_ws_owner_rejects_garbage() {
        assert_eq!(parse_ws_owner("not-a-uuid"), Err(StatusCode::UNAUTHORIZED));
    }
}
