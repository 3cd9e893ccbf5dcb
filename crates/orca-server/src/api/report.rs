use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use orca_common::types::RuleId;
use orca_content::{decorate, ContentError};

use crate::api::{
    check_org_owns_cluster, error_response, ok_with, parse_cluster_name, parse_org_id,
    storage_error_response,
};
use crate::state::AppState;

/// The externally visible report: the stored blob joined with the rule
/// catalog at request time.
async fn report_for_cluster(
    State(state): State<AppState>,
    Path((org_id, cluster)): Path<(String, String)>,
) -> Response {
    let org_id = match parse_org_id(&org_id) {
        Ok(org) => org,
        Err(resp) => return resp,
    };
    let cluster = match parse_cluster_name(&cluster) {
        Ok(cluster) => cluster,
        Err(resp) => return resp,
    };
    if let Err(resp) = check_org_owns_cluster(&state, org_id, cluster).await {
        return resp;
    }

    let (report, last_checked_at) = match state.storage.read_report_for_cluster(org_id, cluster).await
    {
        Ok(found) => found,
        Err(err) => return storage_error_response(&err),
    };

    let catalog = state.content.snapshot();
    ok_with("report", decorate(&catalog, &report.0, last_checked_at))
}

/// Rule content straight from the catalog.
async fn rule_by_id(State(state): State<AppState>, Path(rule_id): Path<String>) -> Response {
    match state.content.get_rule(&RuleId(rule_id)) {
        Ok(rule) => ok_with("rule", rule),
        Err(err @ ContentError::RuleNotFound { .. }) => {
            error_response(StatusCode::NOT_FOUND, &err.to_string())
        }
        Err(err) => {
            tracing::error!(error = %err, "cannot resolve rule content");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/report/{org_id}/{cluster}", get(report_for_cluster))
        .route("/rules/{rule_id}", get(rule_by_id))
}
