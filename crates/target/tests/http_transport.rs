use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{Form, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use url::Url;

use wikiedit_common::protocol::params::ApiParams;
use wikiedit_target::transport::{ApiTransport, HttpTransport, TransportError};

async fn api_post(
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let agent = headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    (
        [("x-cache", "cp1066 hit/3"), ("x-parsoid-performance", "duration=42")],
        Json(json!({ "visualeditor": { "echo": params, "agent": agent } })),
    )
}

async fn api_get(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    Json(json!({ "query": { "echo": params } }))
}

async fn index_post(headers: HeaderMap, body: String) -> impl IntoResponse {
    let content_type = headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if content_type.starts_with("multipart/form-data")
        && body.contains("name=\"wpTextbox1\"")
        && body.contains("Some '''wikitext'''")
    {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/w/api.php", post(api_post).get(api_get))
        .route("/w/index.php", post(index_post))
        .route("/empty/api.php", post(|| async { "" }))
        .route("/broken/api.php", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/garbage/api.php", post(|| async { "<html>not json</html>" }))
        .route(
            "/slow/api.php",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{}"
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn transport(addr: SocketAddr, path: &str, timeout: Duration) -> HttpTransport {
    let url = Url::parse(&format!("http://{addr}{path}")).unwrap();
    HttpTransport::new(url, timeout, "wikiedit-test/1.0").unwrap()
}

#[tokio::test]
async fn post_sends_form_and_records_headers() {
    let addr = spawn_server().await;
    let http = transport(addr, "/w/api.php", Duration::from_secs(5));

    let params = ApiParams::parsoid("parse").with("page", "Main Page");
    let reply = http.post(&params).await.unwrap();
    let body = reply.body.unwrap();
    assert_eq!(body["visualeditor"]["echo"]["paction"], "parse");
    assert_eq!(body["visualeditor"]["echo"]["page"], "Main Page");
    assert_eq!(body["visualeditor"]["echo"]["format"], "json");
    assert_eq!(body["visualeditor"]["agent"], "wikiedit-test/1.0");
    assert!(reply.cache_hit);
    assert_eq!(reply.parsoid.as_deref(), Some("duration=42"));
    assert!(reply.bytes > 0);
}

#[tokio::test]
async fn get_sends_query_string() {
    let addr = spawn_server().await;
    let http = transport(addr, "/w/api.php", Duration::from_secs(5));

    let params = ApiParams::action("query").with("meta", "userinfo").with("indexpageids", "");
    let reply = http.get(&params).await.unwrap();
    let body = reply.body.unwrap();
    assert_eq!(body["query"]["echo"]["meta"], "userinfo");
    assert_eq!(body["query"]["echo"]["indexpageids"], "");
    assert!(!reply.cache_hit);
}

#[tokio::test]
async fn empty_body_decodes_to_none() {
    let addr = spawn_server().await;
    let reply = transport(addr, "/empty/api.php", Duration::from_secs(5))
        .post(&ApiParams::action("visualeditoredit"))
        .await
        .unwrap();
    assert!(reply.body.is_none());
    assert_eq!(reply.bytes, 0);
}

#[tokio::test]
async fn error_status_and_bad_json_are_transport_errors() {
    let addr = spawn_server().await;
    let error = transport(addr, "/broken/api.php", Duration::from_secs(5))
        .post(&ApiParams::action("visualeditor"))
        .await
        .unwrap_err();
    assert!(matches!(error, TransportError::Status { status: 500 }));

    let error = transport(addr, "/garbage/api.php", Duration::from_secs(5))
        .post(&ApiParams::action("visualeditor"))
        .await
        .unwrap_err();
    assert!(matches!(error, TransportError::Decode(_)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let addr = spawn_server().await;
    let error = transport(addr, "/slow/api.php", Duration::from_millis(100))
        .post(&ApiParams::action("visualeditor"))
        .await
        .unwrap_err();
    assert!(matches!(error, TransportError::Timeout(_)), "got {error:?}");
}

#[tokio::test]
async fn form_submission_is_multipart() {
    let addr = spawn_server().await;
    let http = transport(addr, "/w/api.php", Duration::from_secs(5));
    let index =
        Url::parse(&format!("http://{addr}/w/index.php?title=Sandbox&action=submit")).unwrap();

    let fields = ApiParams::new().with("wpTextbox1", "Some '''wikitext'''").with("wpSave", "1");
    let reply = http.submit_form(&index, &fields).await.unwrap();
    assert_eq!(reply.status, 200);
    assert!(reply.final_url.ends_with("/w/index.php?title=Sandbox&action=submit"));
}
