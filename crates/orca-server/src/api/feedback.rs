use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use orca_common::types::{RuleId, UserVote};

use crate::api::{ok, ok_with, parse_cluster_name, storage_error_response};
use crate::auth::Identity;
use crate::state::AppState;

async fn vote(
    state: AppState,
    identity: Identity,
    cluster: String,
    rule_id: String,
    vote: UserVote,
) -> Response {
    let cluster = match parse_cluster_name(&cluster) {
        Ok(cluster) => cluster,
        Err(resp) => return resp,
    };
    match state
        .storage
        .vote_on_rule(cluster, &RuleId(rule_id), &identity.user_id, vote)
        .await
    {
        Ok(()) => ok(),
        Err(err) => storage_error_response(&err),
    }
}

async fn like_rule(
    State(state): State<AppState>,
    identity: Identity,
    Path((cluster, rule_id)): Path<(String, String)>,
) -> Response {
    vote(state, identity, cluster, rule_id, UserVote::Like).await
}

async fn dislike_rule(
    State(state): State<AppState>,
    identity: Identity,
    Path((cluster, rule_id)): Path<(String, String)>,
) -> Response {
    vote(state, identity, cluster, rule_id, UserVote::Dislike).await
}

async fn reset_vote(
    State(state): State<AppState>,
    identity: Identity,
    Path((cluster, rule_id)): Path<(String, String)>,
) -> Response {
    vote(state, identity, cluster, rule_id, UserVote::None).await
}

#[derive(Debug, Deserialize)]
struct FeedbackBody {
    message: String,
}

async fn update_feedback(
    State(state): State<AppState>,
    identity: Identity,
    Path((cluster, rule_id)): Path<(String, String)>,
    Json(body): Json<FeedbackBody>,
) -> Response {
    let cluster = match parse_cluster_name(&cluster) {
        Ok(cluster) => cluster,
        Err(resp) => return resp,
    };
    match state
        .storage
        .add_or_update_feedback_on_rule(cluster, &RuleId(rule_id), &identity.user_id, &body.message)
        .await
    {
        Ok(()) => ok(),
        Err(err) => storage_error_response(&err),
    }
}

async fn get_feedback(
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
        .get_user_feedback_on_rule(cluster, &RuleId(rule_id), &identity.user_id)
        .await
    {
        Ok(feedback) => ok_with(
            "feedback",
            json!({
                "cluster": feedback.cluster_id,
                "rule_id": feedback.rule_id,
                "user_id": feedback.user_id,
                "user_vote": feedback.user_vote.as_i16(),
                "message": feedback.message,
                "added_at": feedback.added_at,
                "updated_at": feedback.updated_at,
            }),
        ),
        Err(err) => storage_error_response(&err),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clusters/{cluster}/rules/{rule_id}/like", put(like_rule))
        .route(
            "/clusters/{cluster}/rules/{rule_id}/dislike",
            put(dislike_rule),
        )
        .route(
            "/clusters/{cluster}/rules/{rule_id}/reset_vote",
            put(reset_vote),
        )
        .route(
            "/clusters/{cluster}/rules/{rule_id}/feedback",
            get(get_feedback).put(update_feedback),
        )
}
