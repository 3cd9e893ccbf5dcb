use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{delete, get};
use axum::Router;

use crate::api::{
    ok, ok_with, parse_cluster_name, parse_list, parse_org_id, storage_error_response,
};
use crate::state::AppState;

async fn list_organizations(State(state): State<AppState>) -> Response {
    match state.storage.list_of_orgs().await {
        Ok(orgs) => ok_with("organizations", orgs),
        Err(err) => storage_error_response(&err),
    }
}

async fn list_clusters(State(state): State<AppState>, Path(org_id): Path<String>) -> Response {
    let org_id = match parse_org_id(&org_id) {
        Ok(org) => org,
        Err(resp) => return resp,
    };
    match state.storage.list_of_clusters_for_org(org_id).await {
        Ok(clusters) => ok_with("clusters", clusters),
        Err(err) => storage_error_response(&err),
    }
}

async fn delete_organizations(
    State(state): State<AppState>,
    Path(org_ids): Path<String>,
) -> Response {
    let org_ids = match parse_list(&org_ids, parse_org_id) {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };
    for org_id in org_ids {
        if let Err(err) = state.storage.delete_reports_for_org(org_id).await {
            return storage_error_response(&err);
        }
        tracing::info!(org = %org_id, "deleted all reports for organization");
    }
    ok()
}

async fn delete_clusters(
    State(state): State<AppState>,
    Path(cluster_ids): Path<String>,
) -> Response {
    let clusters = match parse_list(&cluster_ids, parse_cluster_name) {
        Ok(clusters) => clusters,
        Err(resp) => return resp,
    };
    for cluster in clusters {
        if let Err(err) = state.storage.delete_reports_for_cluster(cluster).await {
            return storage_error_response(&err);
        }
        tracing::info!(cluster = %cluster, "deleted all reports for cluster");
    }
    ok()
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/organizations", get(list_organizations))
        .route("/organizations/{org_id}/clusters", get(list_clusters))
}

/// Destructive endpoints, registered only when the server runs in debug
/// mode.
pub fn debug_routes() -> Router<AppState> {
    Router::new()
        .route("/organizations/{org_ids}", delete(delete_organizations))
        .route("/clusters/{cluster_ids}", delete(delete_clusters))
}
