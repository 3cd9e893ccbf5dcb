//! HTTP handlers and the JSON response envelope.
//!
//! Every successful body is a JSON object carrying `"status": "ok"` plus
//! endpoint-specific fields; failures carry the reason in `"status"`.

pub mod feedback;
pub mod orgs;
pub mod report;
pub mod toggle;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::str::FromStr;

use orca_common::types::{ClusterName, OrgId};
use orca_storage::StorageError;

use crate::state::AppState;

/// `{"status": "ok"}` with one extra payload field.
pub fn ok_with<T: Serialize>(key: &str, value: T) -> Response {
    let mut body = json!({ "status": "ok" });
    body[key] = serde_json::to_value(value).unwrap_or(Value::Null);
    (StatusCode::OK, Json(body)).into_response()
}

/// Plain `{"status": "ok"}`.
pub fn ok() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

pub fn error_response(status: StatusCode, reason: &str) -> Response {
    (status, Json(json!({ "status": reason }))).into_response()
}

/// Maps storage error kinds onto HTTP statuses: missing rows are 404,
/// everything else is a 500 whose detail stays in the log, not the body.
pub fn storage_error_response(err: &StorageError) -> Response {
    match err {
        StorageError::NotFound { .. } => error_response(StatusCode::NOT_FOUND, &err.to_string()),
        StorageError::Closed | StorageError::UnsupportedDriver(_) | StorageError::Database(_) => {
            tracing::error!(error = %err, "storage failure while serving request");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

pub(crate) fn parse_org_id(raw: &str) -> Result<OrgId, Response> {
    OrgId::from_str(raw).map_err(|err| error_response(StatusCode::BAD_REQUEST, &err.to_string()))
}

pub(crate) fn parse_cluster_name(raw: &str) -> Result<ClusterName, Response> {
    ClusterName::from_str(raw)
        .map_err(|err| error_response(StatusCode::BAD_REQUEST, &err.to_string()))
}

/// Parses the comma-separated list form the debug delete endpoints accept.
pub(crate) fn parse_list<T, F>(raw: &str, parse: F) -> Result<Vec<T>, Response>
where
    F: Fn(&str) -> Result<T, Response>,
{
    raw.split(',').map(|item| parse(item.trim())).collect()
}

/// Organization ownership gate for `{org_id}/{cluster}` routes. A cluster
/// owned by a different org answers 404, exactly like an unknown cluster,
/// so existence does not leak across tenants.
pub(crate) async fn check_org_owns_cluster(
    state: &AppState,
    org_id: OrgId,
    cluster: ClusterName,
) -> Result<(), Response> {
    match state.storage.get_org_id_by_cluster_id(cluster).await {
        Ok(owner) if owner == org_id => Ok(()),
        Ok(_) => Err(error_response(
            StatusCode::NOT_FOUND,
            &StorageError::not_found(format!("{org_id}/{cluster}")).to_string(),
        )),
        Err(err) => Err(storage_error_response(&err)),
    }
}

pub async fn health() -> Response {
    ok()
}

/// Anything outside the routing table gets an empty JSON object.
pub async fn unknown_route() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({}))).into_response()
}
