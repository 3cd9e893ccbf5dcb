use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{delete, get, put};
use axum::Router;
use serde_json::json;

use orca_common::types::{RuleId, RuleToggle};

use crate::api::{ok, ok_with, parse_cluster_name, storage_error_response};
use crate::auth::Identity;
use crate::state::AppState;

async fn toggle(
    state: AppState,
    identity: Identity,
    cluster: String,
    rule_id: String,
    toggle: RuleToggle,
) -> Response {
    let cluster = match parse_cluster_name(&cluster) {
        Ok(cluster) => cluster,
        Err(resp) => return resp,
    };
    match state
        .storage
        .toggle_rule_for_cluster(cluster, &RuleId(rule_id), &identity.user_id, toggle)
        .await
    {
        Ok(()) => ok(),
        Err(err) => storage_error_response(&err),
    }
}

async fn disable_rule(
    State(state): State<AppState>,
    identity: Identity,
    Path((cluster, rule_id)): Path<(String, String)>,
) -> Response {
    toggle(state, identity, cluster, rule_id, RuleToggle::Disable).await
}

async fn enable_rule(
    State(state): State<AppState>,
    identity: Identity,
    Path((cluster, rule_id)): Path<(String, String)>,
) -> Response {
    toggle(state, identity, cluster, rule_id, RuleToggle::Enable).await
}

async fn list_disabled(State(state): State<AppState>, Path(cluster): Path<String>) -> Response {
    let cluster = match parse_cluster_name(&cluster) {
        Ok(cluster) => cluster,
        Err(resp) => return resp,
    };
    match state.storage.list_disabled_rules_for_cluster(cluster).await {
        Ok(toggles) => {
            let rules: Vec<_> = toggles
                .into_iter()
                .map(|t| {
                    json!({
                        "rule_id": t.rule_id,
                        "user_id": t.user_id,
                        "disabled_at": t.disabled_at,
                        "updated_at": t.updated_at,
                    })
                })
                .collect();
            ok_with("rules", rules)
        }
        Err(err) => storage_error_response(&err),
    }
}

async fn delete_toggle(
    State(state): State<AppState>,
    identity: Identity,
    Path((cluster, rule_id)): Path<(String, String)>,
) -> Response {
    let cluster = match parse_cluster_name(&cluster) {
        Ok(cluster) => cluster,
        Err(resp) => return resp,
    };
    match state
        .storage
        .delete_from_rule_cluster_toggle(cluster, &RuleId(rule_id), &identity.user_id)
        .await
    {
        Ok(()) => ok(),
        Err(err) => storage_error_response(&err),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clusters/{cluster}/rules/{rule_id}/disable", put(disable_rule))
        .route("/clusters/{cluster}/rules/{rule_id}/enable", put(enable_rule))
        .route("/clusters/{cluster}/rules/disabled", get(list_disabled))
}

pub fn debug_routes() -> Router<AppState> {
    Router::new().route(
        "/clusters/{cluster}/rules/{rule_id}/toggle",
        delete(delete_toggle),
    )
}
