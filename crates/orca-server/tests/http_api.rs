mod common;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;

use common::{build_test_context, request, TEST_CLUSTER, TEST_ERROR_KEY, TEST_RULE};
use orca_common::types::{ClusterName, ClusterReport, OrgId};
use orca_consumer::{parse_incoming, process_message};

async fn write_empty_report(ctx: &common::TestContext, org: u64, cluster: &str) {
    ctx.storage
        .write_report_for_cluster(
            OrgId(org),
            ClusterName::from_str(cluster).unwrap(),
            &ClusterReport("{}".to_string()),
            Utc::now(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn consume_then_report_round_trip() {
    let ctx = build_test_context().await;

    // The exact envelope the upstream engine publishes.
    let message = format!(
        r#"{{"OrgID": 1, "ClusterName": "{TEST_CLUSTER}", "Report": {{}}, "LastChecked": "2020-01-02T00:00:00Z"}}"#
    );
    let parsed = parse_incoming(message.as_bytes(), 1 << 20).unwrap();
    process_message(&ctx.storage, &parsed, 0, Duration::from_millis(1))
        .await
        .unwrap();

    let (status, body) = request(
        &ctx.app,
        "GET",
        &format!("/api/v1/report/1/{TEST_CLUSTER}"),
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["report"]["meta"]["count"], 0);
    assert_eq!(body["report"]["data"], json!([]));
    assert_eq!(
        body["report"]["meta"]["last_checked_at"],
        "2020-01-02T00:00:00Z"
    );
}

#[tokio::test]
async fn older_message_does_not_roll_back_the_report() {
    let ctx = build_test_context().await;
    let newer = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    let older = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let cluster = ClusterName::from_str(TEST_CLUSTER).unwrap();

    for checked in [newer, older] {
        ctx.storage
            .write_report_for_cluster(
                OrgId(1),
                cluster,
                &ClusterReport("{}".to_string()),
                checked,
            )
            .await
            .unwrap();
    }

    let (_, last_checked) = ctx
        .storage
        .read_report_for_cluster(OrgId(1), cluster)
        .await
        .unwrap();
    assert_eq!(last_checked, newer);
}

#[tokio::test]
async fn fired_rule_is_decorated_in_the_report() {
    let ctx = build_test_context().await;
    let report = json!({
        "reports": [{ "component": TEST_RULE, "key": TEST_ERROR_KEY }]
    });
    ctx.storage
        .write_report_for_cluster(
            OrgId(1),
            ClusterName::from_str(TEST_CLUSTER).unwrap(),
            &ClusterReport(report.to_string()),
            Utc::now(),
        )
        .await
        .unwrap();

    let (status, body) = request(
        &ctx.app,
        "GET",
        &format!("/api/v1/report/1/{TEST_CLUSTER}"),
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["meta"]["count"], 1);
    let rule = &body["report"]["data"][0];
    assert_eq!(rule["rule_id"], TEST_RULE);
    assert_eq!(rule["description"], "Node kubelet version mismatch");
    assert_eq!(rule["total_risk"], 3);
    assert_eq!(rule["risk_of_change"], 1);
}

#[tokio::test]
async fn like_then_dislike_leaves_a_dislike_and_no_message() {
    let ctx = build_test_context().await;
    let base = format!("/api/v1/clusters/{TEST_CLUSTER}/rules/{TEST_RULE}");

    let (status, _) = request(&ctx.app, "PUT", &format!("{base}/like"), Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request(&ctx.app, "PUT", &format!("{base}/dislike"), Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        request(&ctx.app, "GET", &format!("{base}/feedback"), Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feedback"]["user_vote"], -1);
    assert_eq!(body["feedback"]["message"], "");
}

#[tokio::test]
async fn message_survives_votes_and_reset() {
    let ctx = build_test_context().await;
    let base = format!("/api/v1/clusters/{TEST_CLUSTER}/rules/{TEST_RULE}");

    let (status, _) = request(
        &ctx.app,
        "PUT",
        &format!("{base}/feedback"),
        Some("u1"),
        Some(json!({ "message": "not relevant for us" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    request(&ctx.app, "PUT", &format!("{base}/like"), Some("u1"), None).await;
    request(&ctx.app, "PUT", &format!("{base}/reset_vote"), Some("u1"), None).await;

    let (_, body) = request(&ctx.app, "GET", &format!("{base}/feedback"), Some("u1"), None).await;
    assert_eq!(body["feedback"]["user_vote"], 0);
    assert_eq!(body["feedback"]["message"], "not relevant for us");
}

#[tokio::test]
async fn feedback_is_scoped_per_user() {
    let ctx = build_test_context().await;
    let base = format!("/api/v1/clusters/{TEST_CLUSTER}/rules/{TEST_RULE}");

    request(&ctx.app, "PUT", &format!("{base}/like"), Some("u1"), None).await;

    let (status, _) = request(&ctx.app, "GET", &format!("{base}/feedback"), Some("u2"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn organizations_listing_is_ascending() {
    let ctx = build_test_context().await;
    write_empty_report(&ctx, 3, "a1bf5b15-5229-4042-9825-c69dc36b57f5").await;
    write_empty_report(&ctx, 1, "1deb586c-fb85-4db4-ae5b-139cdbdf77ae").await;

    let (status, body) = request(&ctx.app, "GET", "/api/v1/organizations", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "organizations": [1, 3], "status": "ok" }));
}

#[tokio::test]
async fn clusters_listing_is_scoped_to_the_org() {
    let ctx = build_test_context().await;
    write_empty_report(&ctx, 1, TEST_CLUSTER).await;
    write_empty_report(&ctx, 2, "4016d01b-62a1-4b49-a36e-c1c5a3d02750").await;

    let (status, body) = request(&ctx.app, "GET", "/api/v1/organizations/1/clusters", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "clusters": [TEST_CLUSTER], "status": "ok" }));
}

#[tokio::test]
async fn report_for_foreign_org_is_not_found() {
    let ctx = build_test_context().await;
    write_empty_report(&ctx, 1, TEST_CLUSTER).await;

    let (status, _) = request(
        &ctx.app,
        "GET",
        &format!("/api/v1/report/2/{TEST_CLUSTER}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn debug_delete_organizations_empties_the_listing() {
    let ctx = build_test_context().await;
    write_empty_report(&ctx, 1, TEST_CLUSTER).await;
    write_empty_report(&ctx, 3, "a1bf5b15-5229-4042-9825-c69dc36b57f5").await;

    let (status, body) = request(&ctx.app, "DELETE", "/api/v1/organizations/1,3", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (_, body) = request(&ctx.app, "GET", "/api/v1/organizations", None, None).await;
    assert_eq!(body, json!({ "organizations": [], "status": "ok" }));
}

#[tokio::test]
async fn debug_delete_clusters_accepts_a_list() {
    let ctx = build_test_context().await;
    write_empty_report(&ctx, 1, TEST_CLUSTER).await;

    let (status, _) = request(
        &ctx.app,
        "DELETE",
        &format!("/api/v1/clusters/{TEST_CLUSTER}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &ctx.app,
        "GET",
        &format!("/api/v1/report/1/{TEST_CLUSTER}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_uuid_cluster_is_a_bad_request() {
    let ctx = build_test_context().await;
    let (status, _) = request(&ctx.app, "GET", "/api/v1/report/1/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &ctx.app,
        "PUT",
        &format!("/api/v1/clusters/not-a-uuid/rules/{TEST_RULE}/like"),
        Some("u1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_integer_org_is_a_bad_request() {
    let ctx = build_test_context().await;
    let (status, _) = request(&ctx.app, "GET", "/api/v1/organizations/x/clusters", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vote_without_identity_is_unauthorized() {
    let ctx = build_test_context().await;
    let (status, _) = request(
        &ctx.app,
        "PUT",
        &format!("/api/v1/clusters/{TEST_CLUSTER}/rules/{TEST_RULE}/like"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_route_answers_empty_json() {
    let ctx = build_test_context().await;
    let (status, body) = request(&ctx.app, "GET", "/api/v1/no/such/route", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn rule_content_endpoint_resolves_against_the_catalog() {
    let ctx = build_test_context().await;

    let (status, body) = request(
        &ctx.app,
        "GET",
        &format!("/api/v1/rules/{TEST_RULE}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rule"]["plugin"]["product_code"], "ocp");

    let (status, _) = request(&ctx.app, "GET", "/api/v1/rules/no.such.rule", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disable_enable_cycle_shows_up_in_the_disabled_listing() {
    let ctx = build_test_context().await;
    let base = format!("/api/v1/clusters/{TEST_CLUSTER}/rules/{TEST_RULE}");
    let listing = format!("/api/v1/clusters/{TEST_CLUSTER}/rules/disabled");

    let (status, _) = request(&ctx.app, "PUT", &format!("{base}/disable"), Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(&ctx.app, "GET", &listing, None, None).await;
    assert_eq!(body["rules"][0]["rule_id"], TEST_RULE);

    let (status, _) = request(&ctx.app, "PUT", &format!("{base}/enable"), Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(&ctx.app, "GET", &listing, None, None).await;
    assert_eq!(body["rules"], json!([]));
}

#[tokio::test]
async fn health_endpoint_answers_ok() {
    let ctx = build_test_context().await;
    let (status, body) = request(&ctx.app, "GET", "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
