//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! identity as the `x-identity` header, a base64-encoded JSON document.
//! This module only extracts the user id from it.

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

use orca_common::types::UserId;

use crate::api::error_response;

pub const IDENTITY_HEADER: &str = "x-identity";

#[derive(Debug, Deserialize)]
struct Token {
    identity: TokenIdentity,
}

#[derive(Debug, Deserialize)]
struct TokenIdentity {
    user_id: String,
}

/// Authenticated caller, extracted from the request token. Endpoints that
/// need a user add this extractor; its absence rejects with 401.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(IDENTITY_HEADER)
            .ok_or_else(|| unauthenticated("missing auth token"))?;
        let raw = header
            .to_str()
            .map_err(|_| unauthenticated("malformed auth token"))?;
        let decoded = BASE64
            .decode(raw)
            .map_err(|_| unauthenticated("malformed auth token"))?;
        let token: Token = serde_json::from_slice(&decoded)
            .map_err(|_| unauthenticated("malformed auth token"))?;
        if token.identity.user_id.is_empty() {
            return Err(unauthenticated("malformed auth token"));
        }
        Ok(Identity {
            user_id: UserId(token.identity.user_id),
        })
    }
}

fn unauthenticated(reason: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, reason)
}

/// Encodes an identity header value; used by tests and local tooling.
pub fn encode_identity(user_id: &str) -> String {
    BASE64.encode(
        serde_json::json!({ "identity": { "user_id": user_id } })
            .to_string()
            .as_bytes(),
    )
}
