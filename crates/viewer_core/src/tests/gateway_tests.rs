use super::*;
use axum::{
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::json;
use shared::protocol::SeriesDocument;
use std::{
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;

async fn echo_cache_headers(headers: HeaderMap) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "cache_control": header("cache-control"),
        "pragma": header("pragma"),
    }))
}

async fn series() -> Json<Value> {
    Json(json!({
        "series": [{ "k": -1, "estimate": 0.0 }, { "k": 0, "estimate": 0.4 }],
        "time_unit": "months"
    }))
}

async fn not_published() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn broken() -> &'static str {
    "{ not json"
}

async fn spawn_static_server() -> anyhow::Result<Url> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/headers.json", get(echo_cache_headers))
        .route("/series.json", get(series))
        .route("/missing.json", get(not_published))
        .route("/broken.json", get(broken));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(Url::parse(&format!("http://{addr}/"))?)
}

#[tokio::test]
async fn requests_bypass_caches() {
    let base = spawn_static_server().await.expect("spawn server");
    let gateway = HttpGateway::new();

    let value = gateway
        .fetch_json(&base.join("headers.json").expect("url"))
        .await
        .expect("fetch");

    assert_eq!(value["cache_control"], "no-cache");
    assert_eq!(value["pragma"], "no-cache");
}

#[tokio::test]
async fn typed_fetch_decodes_series_document() {
    let base = spawn_static_server().await.expect("spawn server");
    let gateway = HttpGateway::new();

    let doc: SeriesDocument = fetch_document(&gateway, &base.join("series.json").expect("url"))
        .await
        .expect("series");

    assert_eq!(doc.series.len(), 2);
    assert_eq!(doc.series[1].estimate, Some(0.4));
}

#[tokio::test]
async fn unsuccessful_status_is_reported_without_retry() {
    let base = spawn_static_server().await.expect("spawn server");
    let gateway = HttpGateway::new();

    let err = gateway
        .fetch_json(&base.join("missing.json").expect("url"))
        .await
        .expect_err("should fail");

    assert!(err.is_not_found());
    assert!(err.location().ends_with("/missing.json"));
}

#[tokio::test]
async fn unparseable_body_is_a_parse_error() {
    let base = spawn_static_server().await.expect("spawn server");
    let gateway = HttpGateway::new();

    let err = gateway
        .fetch_json(&base.join("broken.json").expect("url"))
        .await
        .expect_err("should fail");

    assert!(matches!(err, FetchError::Parse { .. }));
}

#[tokio::test]
async fn wrong_document_shape_is_a_parse_error() {
    let base = spawn_static_server().await.expect("spawn server");
    let gateway = HttpGateway::new();

    let err = fetch_document::<SeriesDocument, _>(&gateway, &base.join("headers.json").expect("url"))
        .await
        .expect_err("should fail");

    assert!(matches!(err, FetchError::Parse { .. }));
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = HttpGateway::new()
        .fetch_json(&Url::parse(&format!("http://{addr}/index.json")).expect("url"))
        .await
        .expect_err("should fail");

    assert!(matches!(err, FetchError::Transport { .. }));
}

#[tokio::test]
async fn file_locations_are_read_from_disk() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("viewer_gateway_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    fs::write(temp_root.join("index.json"), r#"{"studies":[]}"#).expect("write");

    let gateway = HttpGateway::new();
    let present = Url::from_file_path(temp_root.join("index.json")).expect("url");
    let absent = Url::from_file_path(temp_root.join("nope.json")).expect("url");

    let value = gateway.fetch_json(&present).await.expect("fetch");
    assert_eq!(value, json!({ "studies": [] }));

    let err = gateway.fetch_json(&absent).await.expect_err("should fail");
    assert!(err.is_not_found());

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn unsupported_scheme_is_rejected() {
    let err = HttpGateway::new()
        .fetch_json(&Url::parse("ftp://example.org/index.json").expect("url"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, FetchError::UnsupportedScheme { .. }));
}
