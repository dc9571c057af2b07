#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` status handling and request decoration.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{basic_auth, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cloak_api::{API_VERSION_HEADER, ApiClient, CallOptions, Credential, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApiClient::with_client(&base_url, reqwest::Client::new()).unwrap();
    (server, client)
}

async fn get_status(status: u16) -> Result<reqwest::Response, Error> {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/server/status/"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;

    client.get("status/", &CallOptions::new()).await
}

// ── Status range ────────────────────────────────────────────────────

#[tokio::test]
async fn test_success_range_lower_bound() {
    let resp = get_status(200).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn test_399_is_success() {
    let resp = get_status(399).await.unwrap();
    assert_eq!(resp.status().as_u16(), 399);
}

#[tokio::test]
async fn test_304_passes_transport_check() {
    let resp = get_status(304).await.unwrap();
    assert_eq!(resp.status().as_u16(), 304);
}

#[tokio::test]
async fn test_400_is_an_api_error() {
    let err = get_status(400).await.unwrap_err();
    assert_eq!(err.api_error().unwrap().status().as_u16(), 400);
}

#[tokio::test]
async fn test_500_carries_full_response() {
    let (server, client) = setup().await;

    let body = json!({"errors": {"field": [{"message": "bad"}]}});

    Mock::given(method("POST"))
        .and(path("/api/server/servers/"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(&body)
                .insert_header("X-Request-Id", "req-42"),
        )
        .mount(&server)
        .await;

    let err = client
        .post("servers/", Some(&[("a", "b")]), &CallOptions::new())
        .await
        .unwrap_err();

    let api = err.api_error().expect("expected Api error");
    assert_eq!(api.status().as_u16(), 500);
    assert_eq!(api.reason(), "Internal Server Error");
    assert_eq!(api.json().unwrap(), body);
    assert_eq!(api.field_messages().unwrap(), vec!["bad"]);
    assert_eq!(api.headers().get("x-request-id").unwrap(), "req-42");
}

#[tokio::test]
async fn test_unreadable_error_body_still_yields_api_error() {
    let (server, client) = setup().await;

    // Claims gzip but isn't, so decoding the body fails.
    Mock::given(method("GET"))
        .and(path("/api/server/server/"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("Content-Encoding", "gzip")
                .set_body_bytes(b"definitely not gzip".to_vec()),
        )
        .mount(&server)
        .await;

    let err = client.get("server/", &CallOptions::new()).await.unwrap_err();

    let api = err.api_error().expect("expected Api error");
    assert_eq!(api.status().as_u16(), 503);
    assert_eq!(api.body(), "");
    assert_eq!(api.message(), "Service Unavailable");
}

// ── Request decoration ──────────────────────────────────────────────

#[tokio::test]
async fn test_api_version_header_sent_when_given() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/server/versioned/"))
        .and(header(API_VERSION_HEADER, "2017-01-01"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .get("versioned/", &CallOptions::new().api_version("2017-01-01"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_credential_sent_as_basic_auth() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/server/server/"))
        .and(basic_auth("srv_1", "tok_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let credential = Credential::new("srv_1", "tok_1".to_string());
    client
        .get("server/", &CallOptions::new().auth(&credential))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_post_body_is_form_encoded() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/server/form/"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("email=a%40example.com&target=t1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client
        .post(
            "form/",
            Some(&[("email", "a@example.com"), ("target", "t1")]),
            &CallOptions::new(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_absolute_path_replaces_api_root() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/elsewhere/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.get("/elsewhere/", &CallOptions::new()).await.unwrap();
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let base_url = Url::parse("http://127.0.0.1:9/").unwrap();
    let client = ApiClient::with_client(&base_url, reqwest::Client::new()).unwrap();

    let err = client.get("server/", &CallOptions::new()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {err:?}");
}
