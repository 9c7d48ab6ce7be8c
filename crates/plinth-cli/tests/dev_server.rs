//! Dev server behavior, exercised through the router without binding the
//! real listener (except the proxy tests, which need a live upstream).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use indexmap::IndexMap;
use plinth_cli::dev::{router, BuildStatus, DevState, ServeSnapshot, ServerContext};
use plinth_config::ProxyRule;
use tower::ServiceExt;

fn snapshot_state() -> Arc<DevState> {
    let state = Arc::new(DevState::new());
    let mut files = IndexMap::new();
    files.insert(
        "app.abc123.js".to_string(),
        b"__plinth.require(\"entry.js\");".to_vec(),
    );
    files.insert("style.def456.css".to_string(), b".a{color:red}".to_vec());
    state.install_snapshot(ServeSnapshot {
        pass: 1,
        files,
        shell: "<html><body><div id=\"main\"></div></body></html>".to_string(),
    });
    state
}

fn context(state: Arc<DevState>, proxy: IndexMap<String, ProxyRule>) -> ServerContext {
    ServerContext {
        state,
        proxy,
        client: reqwest::Client::new(),
    }
}

async fn get_response(app: Router, path: &str) -> (StatusCode, String, axum::http::HeaderMap) {
    let response = app
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned(), headers)
}

#[tokio::test]
async fn serves_artifacts_from_the_snapshot() {
    let app = router(context(snapshot_state(), IndexMap::new()));
    let (status, body, headers) = get_response(app, "/app.abc123.js").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("__plinth.require"));
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "application/javascript"
    );
}

#[tokio::test]
async fn shell_is_served_with_reload_client_injected() {
    let app = router(context(snapshot_state(), IndexMap::new()));
    let (status, body, _) = get_response(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("id=\"main\""));
    assert!(body.contains("/__plinth_reload__.js"));
}

#[tokio::test]
async fn extensionless_paths_fall_back_to_the_shell() {
    let app = router(context(snapshot_state(), IndexMap::new()));
    let (status, body, _) = get_response(app, "/simulation/step/2").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("id=\"main\""));
}

#[tokio::test]
async fn missing_artifacts_are_404() {
    let app = router(context(snapshot_state(), IndexMap::new()));
    let (status, _, _) = get_response(app, "/app.stale00.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn overlay_is_served_until_the_first_pass_succeeds() {
    let state = Arc::new(DevState::new());
    state.set_status(BuildStatus::Failed {
        pass: 1,
        error: "compile error in src/Main.purs:4:9: Unknown value".to_string(),
    });
    let app = router(context(state, IndexMap::new()));
    let (status, body, _) = get_response(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Build failed"));
    assert!(body.contains("Unknown value"));
}

#[tokio::test]
async fn failed_rebuild_keeps_the_last_good_snapshot() {
    let state = snapshot_state();
    state.set_status(BuildStatus::Failed {
        pass: 2,
        error: "boom".to_string(),
    });
    let app = router(context(state, IndexMap::new()));
    let (status, body, _) = get_response(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("id=\"main\""), "shell must stay live: {body}");
    assert!(!body.contains("Build failed"));
}

#[tokio::test]
async fn reload_script_is_served() {
    let app = router(context(snapshot_state(), IndexMap::new()));
    let (status, body, headers) = get_response(app, "/__plinth_reload__.js").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("EventSource"));
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "application/javascript"
    );
}

#[tokio::test]
async fn proxy_forwards_to_a_live_upstream() {
    let upstream = Router::new().route(
        "/api/ping",
        get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{\"pong\":true}") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let mut proxy = IndexMap::new();
    proxy.insert(
        "/api".to_string(),
        ProxyRule {
            target: format!("http://{addr}"),
        },
    );

    let app = router(context(snapshot_state(), proxy));
    let (status, body, _) = get_response(app, "/api/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("pong"));
}

#[tokio::test]
async fn unreachable_upstream_is_a_502_not_a_crash() {
    let mut proxy = IndexMap::new();
    proxy.insert(
        "/api".to_string(),
        ProxyRule {
            // Reserved port nothing listens on.
            target: "http://127.0.0.1:9".to_string(),
        },
    );

    let app = router(context(snapshot_state(), proxy));
    let (status, body, _) = get_response(app.clone(), "/api/ping").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("unreachable"));

    // The server keeps serving artifacts afterwards.
    let (status, _, _) = get_response(app, "/app.abc123.js").await;
    assert_eq!(status, StatusCode::OK);
}
