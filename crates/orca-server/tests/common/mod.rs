#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

use orca_content::{parse_rule_content_dir, ContentCache};
use orca_server::app::build_app;
use orca_server::auth::{encode_identity, IDENTITY_HEADER};
use orca_server::state::AppState;
use orca_storage::{Storage, StorageConfig};

pub const TEST_CLUSTER: &str = "84f7eedc-0dd8-49cd-9d4d-f6646df3a5bc";
pub const TEST_RULE: &str = "ccx_rules_ocp.external.rules.nodes_kubelet_version_check";
pub const TEST_ERROR_KEY: &str = "NODE_KUBELET_VERSION";

pub struct TestContext {
    pub storage: Arc<Storage>,
    pub content: Arc<ContentCache>,
    pub app: Router,
    _content_dir: TempDir,
}

/// One-rule content tree matching `TEST_RULE`/`TEST_ERROR_KEY`.
fn write_content_dir() -> TempDir {
    let root = TempDir::new().unwrap();
    let rule_dir = root.path().join(TEST_RULE);
    let key_dir = rule_dir.join(TEST_ERROR_KEY);
    fs::create_dir_all(&key_dir).unwrap();

    fs::write(rule_dir.join("summary.md"), "kubelet version skew\n").unwrap();
    fs::write(rule_dir.join("reason.md"), "node lags behind the control plane\n").unwrap();
    fs::write(rule_dir.join("resolution.md"), "upgrade the node\n").unwrap();
    fs::write(rule_dir.join("more_info.md"), "see the upgrade guide\n").unwrap();
    fs::write(
        rule_dir.join("plugin.yaml"),
        concat!(
            "name: nodes_kubelet_version_check\n",
            "node_id: \"1234\"\n",
            "product_code: ocp\n",
            "python_module: ccx_rules_ocp.external.rules.nodes_kubelet_version_check\n",
        ),
    )
    .unwrap();
    fs::write(key_dir.join("generic.md"), "kubelet is older than the api server\n").unwrap();
    fs::write(
        key_dir.join("metadata.yaml"),
        concat!(
            "condition: kubelet minor version behind\n",
            "description: Node kubelet version mismatch\n",
            "impact: 2\n",
            "likelihood: 4\n",
            "publish_date: 2020-03-06 16:00:00\n",
            "status: active\n",
        ),
    )
    .unwrap();
    root
}

/// In-memory storage, parsed test catalog, and the app router with debug
/// endpoints enabled.
pub async fn build_test_context() -> TestContext {
    let storage = Storage::new(&StorageConfig::in_memory()).await.unwrap();
    storage.init().await.unwrap();
    let storage = Arc::new(storage);

    let content_dir = write_content_dir();
    let catalog = parse_rule_content_dir(content_dir.path()).unwrap();
    let content = Arc::new(ContentCache::new(catalog));

    let state = AppState {
        storage: storage.clone(),
        content: content.clone(),
    };
    let app = build_app(state, "/api/v1", true);

    TestContext {
        storage,
        content,
        app,
        _content_dir: content_dir,
    }
}

pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(IDENTITY_HEADER, encode_identity(user));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
