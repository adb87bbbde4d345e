use axum::body::Body;
use axum::http::Request;
use grc_core::GrcConfig;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use workspace_shell::{build, config};

fn cfg() -> GrcConfig {
    let mut cfg = config::defaults();
    cfg.set("auth.jwt.secret", "0123456789abcdef0123456789abcdef");
    cfg
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_ok() {
    let shell = build(&cfg()).unwrap();

    let res = shell.router().oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await["status"], "ok");
}

#[tokio::test]
async fn missing_secret_fails_to_build() {
    let err = build(&config::defaults()).err().unwrap();
    assert!(err.to_string().contains("invalid auth configuration"));
}

#[tokio::test]
async fn defaults_listen_on_localhost() {
    let shell = build(&cfg()).unwrap();
    assert_eq!(shell.state.settings.addr(), "127.0.0.1:3030");
    assert!(shell.state.connector.is_none());
}

#[tokio::test]
async fn rpc_base_url_enables_backend() {
    let mut cfg = cfg();
    cfg.set("rpc.base_url", "http://api.local/");
    let shell = build(&cfg).unwrap();
    assert!(shell.state.connector.is_some());
}

#[tokio::test]
async fn selection_survives_restart_with_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = cfg();
    cfg.set("storage.path", dir.path().join("workspace.json").display().to_string());

    let shell = build(&cfg).unwrap();
    let res = shell
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/workspace/select")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"clientId":12}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let restarted = build(&cfg).unwrap();
    let res = restarted.router().oneshot(get("/nav/resolve?path=/risks")).await.unwrap();
    let body = json_body(res).await;
    assert_eq!(body["resolved"], "/clients/12/risks");
    assert_eq!(body["clientId"], 12);
}

#[tokio::test]
async fn anonymous_page_request_goes_to_login() {
    let shell = build(&cfg()).unwrap();
    let res = shell.router().oneshot(get("/app/dashboard")).await.unwrap();
    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(res.headers()["location"], "/app/login");
}
